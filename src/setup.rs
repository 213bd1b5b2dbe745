use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Select};
use y2b::{AppConfig, CredentialManager, SummarizerConfig};

const WHOAMI_URL: &str = "https://huggingface.co/api/whoami-v2";

pub struct SetupWizard;

impl SetupWizard {
    pub async fn run() -> Result<AppConfig> {
        println!("\n{}", style("Welcome to y2b Setup!").bold().cyan());
        println!("{}", style("Let's configure y2b for your needs.\n").dim());

        let existing = AppConfig::load().unwrap_or_default();

        let languages = Self::prompt_languages()?;
        let summarizer = Self::prompt_model(&existing.summarizer)?;
        let output_dir = Self::prompt_output_directory()?;
        Self::prompt_token().await?;

        let config = AppConfig {
            languages,
            output_dir,
            summarizer,
        };

        let path = config.save()?;

        println!("\n{}", style("✓ Setup complete!").bold().green());
        println!("Configuration saved to: {}", path.display());
        println!("\n{}", style("Next steps:").bold());
        println!("  1. Test your setup: {}", style("y2b doctor").cyan());
        println!(
            "  2. Summarize a video: {}",
            style("y2b <YOUTUBE_URL>").cyan()
        );

        Ok(config)
    }

    fn prompt_languages() -> Result<Vec<String>> {
        println!("{}", style("Transcript Language").bold());
        println!("Which caption language should be used?");

        let languages = vec![
            "English (en)",
            "Spanish (es)",
            "French (fr)",
            "German (de)",
            "Portuguese (pt)",
            "Japanese (ja)",
            "Other",
        ];

        let selection = Select::new()
            .with_prompt("Select language")
            .items(&languages)
            .default(0)
            .interact()?;

        let lang_code = match selection {
            0 => "en",
            1 => "es",
            2 => "fr",
            3 => "de",
            4 => "pt",
            5 => "ja",
            _ => {
                let custom: String = Input::new()
                    .with_prompt("Enter language code (e.g., 'ar' for Arabic)")
                    .interact_text()?;
                println!();
                return Ok(vec![custom.trim().to_string()]);
            }
        };

        println!();
        Ok(vec![lang_code.to_string()])
    }

    fn prompt_model(current: &SummarizerConfig) -> Result<SummarizerConfig> {
        println!("{}", style("Summarization Model").bold());

        let models = vec![
            "facebook/bart-large-cnn - Default, news-style summaries",
            "sshleifer/distilbart-cnn-12-6 - Faster, slightly lower quality",
            "philschmid/bart-large-cnn-samsum - Tuned for conversations",
            "Other",
        ];

        let selection = Select::new()
            .with_prompt("Select model")
            .items(&models)
            .default(0)
            .interact()?;

        let model = match selection {
            0 => "facebook/bart-large-cnn".to_string(),
            1 => "sshleifer/distilbart-cnn-12-6".to_string(),
            2 => "philschmid/bart-large-cnn-samsum".to_string(),
            _ => Input::new()
                .with_prompt("Model id (owner/name)")
                .default(current.model.clone())
                .interact_text()?,
        };

        println!();
        Ok(SummarizerConfig {
            model,
            ..current.clone()
        })
    }

    fn prompt_output_directory() -> Result<Option<String>> {
        println!("{}", style("Output Directory (Optional)").bold());

        let save = Confirm::new()
            .with_prompt("Save summaries as markdown files when using --save?")
            .default(false)
            .interact()?;

        if !save {
            println!();
            return Ok(None);
        }

        let default_dir = dirs::document_dir()
            .and_then(|d| d.join("y2b-summaries").to_str().map(String::from))
            .unwrap_or_else(|| "./summaries".to_string());

        let output_dir: String = Input::new()
            .with_prompt("Output directory")
            .default(default_dir)
            .interact_text()?;

        let expanded = shellexpand::tilde(&output_dir).to_string();

        if !std::path::Path::new(&expanded).exists()
            && Confirm::new()
                .with_prompt(format!("Directory '{}' doesn't exist. Create it?", expanded))
                .default(true)
                .interact()?
        {
            std::fs::create_dir_all(&expanded)?;
            println!("  {} Created directory", style("✓").green());
        }

        println!();
        Ok(Some(output_dir))
    }

    async fn prompt_token() -> Result<()> {
        println!("{}", style("Hugging Face Token").bold());
        println!("Create a read token at: https://huggingface.co/settings/tokens");
        println!();

        let cred_manager = CredentialManager::new();
        if cred_manager.has_token()
            && !Confirm::new()
                .with_prompt("A token is already configured. Replace it?")
                .default(false)
                .interact()?
        {
            println!();
            return Ok(());
        }

        let token = rpassword::prompt_password("Hugging Face token: ")?;
        let token = token.trim();

        if token.is_empty() {
            return Err(anyhow::anyhow!("Token cannot be empty"));
        }

        println!("\n  Testing token...");
        verify_token(token).await?;

        cred_manager.set_token(token)?;
        println!("  {} Token stored in system keyring", style("✓").green());
        println!();

        Ok(())
    }
}

/// Check a token against the Hub's whoami endpoint.
pub async fn verify_token(token: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(WHOAMI_URL)
        .header("Authorization", format!("Bearer {}", token))
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => {
            println!("  {} Token is valid", style("✓").green());
            Ok(())
        }
        Ok(resp) => {
            println!(
                "  {} Invalid token or API error: {}",
                style("✗").red(),
                resp.status()
            );
            Err(anyhow::anyhow!("Invalid token"))
        }
        Err(e) => {
            println!(
                "  {} Could not connect to Hugging Face: {}",
                style("✗").red(),
                e
            );
            Err(anyhow::anyhow!("Connection error"))
        }
    }
}
