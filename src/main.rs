mod setup;

use clap::{Args, Parser, Subcommand};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use y2b::diagnostics::{print_diagnostic_report, run_diagnostics};
use y2b::{
    save_markdown, AppConfig, CredentialManager, Phase, PipelineCallbacks,
    Settings, Summary, Y2bError,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// YouTube URL to summarize (prompts interactively when omitted)
    url: Option<String>,

    /// Caption language, in order of preference (repeatable)
    #[arg(long = "lang")]
    languages: Vec<String>,

    /// Summarization model id
    #[arg(long)]
    model: Option<String>,

    /// Inference API base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Maximum summary length in tokens
    #[arg(long)]
    max_length: Option<u32>,

    /// Minimum summary length in tokens
    #[arg(long)]
    min_length: Option<u32>,

    /// Hugging Face token (falls back to the system keyring)
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Write the markdown summary to this file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Save the markdown summary into the configured output directory
    #[arg(long, default_value_t = false)]
    save: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive first-time setup
    Init,
    /// Check dependencies, credentials and configuration
    Doctor,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the stored Hugging Face token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file
    Reset,
}

#[derive(Subcommand, Debug)]
enum TokenAction {
    /// Store a token in the system keyring
    Set,
    /// Remove the stored token
    Delete,
    /// Report whether a token is available
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Some(Commands::Init) => {
            setup::SetupWizard::run().await?;
        }
        Some(Commands::Doctor) => {
            let report = run_diagnostics();
            print_diagnostic_report(&report);
            if report.has_errors() {
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action }) => config_command(action)?,
        Some(Commands::Token { action }) => token_command(action).await?,
        None => summarize_command(cli.run).await?,
    }

    Ok(())
}

fn config_command(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", AppConfig::config_path()?.display());
        }
        ConfigAction::Reset => {
            let path = AppConfig::default().save()?;
            println!("Default configuration written to: {}", path.display());
        }
    }
    Ok(())
}

async fn token_command(action: TokenAction) -> anyhow::Result<()> {
    let cred_manager = CredentialManager::new();

    match action {
        TokenAction::Set => {
            let token = rpassword::prompt_password("Hugging Face token: ")?;
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("Token cannot be empty");
            }
            setup::verify_token(token).await?;
            cred_manager.set_token(token)?;
            println!("{} Token stored in system keyring", style("✓").green());
        }
        TokenAction::Delete => {
            cred_manager.delete_token()?;
            println!("{} Token removed from system keyring", style("✓").green());
        }
        TokenAction::Status => {
            if cred_manager.has_token() {
                println!("{} Hugging Face token configured", style("✓").green());
            } else {
                println!("{} Hugging Face token not set", style("✗").red());
            }
        }
    }
    Ok(())
}

fn resolve_settings(args: &RunArgs) -> Result<Settings, Y2bError> {
    let mut config = AppConfig::load()?;

    if !args.languages.is_empty() {
        config.languages = args.languages.clone();
    }
    if let Some(model) = &args.model {
        config.summarizer.model = model.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.summarizer.endpoint = endpoint.clone();
    }
    if let Some(max_length) = args.max_length {
        config.summarizer.max_length = max_length;
    }
    if let Some(min_length) = args.min_length {
        config.summarizer.min_length = min_length;
    }

    let token = match args.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => Some(token.to_string()),
        _ => CredentialManager::new().get_token().unwrap_or_else(|e| {
            warn!("Could not read token from keyring: {}", e);
            None
        }),
    };

    Ok(Settings::new(config, token))
}

async fn summarize_command(args: RunArgs) -> anyhow::Result<()> {
    let settings = match resolve_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", style(e.user_message()).red());
            std::process::exit(1);
        }
    };

    match &args.url {
        Some(url) => {
            if !summarize_once(url, &args, &settings).await {
                std::process::exit(1);
            }
        }
        None => {
            println!("{}", style("YouTube → 3-Bullet Summary").bold().cyan());
            println!("Paste a YouTube URL, or 'q' to quit.\n");

            loop {
                let url: String = Input::new()
                    .with_prompt("YouTube URL")
                    .allow_empty(true)
                    .interact_text()?;

                if matches!(url.trim(), "q" | "quit" | "exit") {
                    break;
                }

                summarize_once(&url, &args, &settings).await;
                println!();
            }
        }
    }

    Ok(())
}

/// One independent run. Failures are printed, never propagated.
async fn summarize_once(url: &str, args: &RunArgs, settings: &Settings) -> bool {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );

    let progress = spinner.clone();
    let callbacks = PipelineCallbacks {
        on_phase: Some(Box::new(move |phase: Phase| {
            progress.enable_steady_tick(Duration::from_millis(100));
            progress.set_message(match phase {
                Phase::FetchingTranscript => "Fetching transcript...",
                Phase::Summarizing => "Summarizing...",
            });
        })),
    };

    let result = settings.pipeline().run(url, &callbacks).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            print_summary(&summary);
            if let Err(e) = write_outputs(&summary, args, settings) {
                eprintln!("{}", style(format!("Failed to save summary: {}", e)).red());
                return false;
            }
            true
        }
        Err(e) => {
            eprintln!("{}", style(e.user_message()).red());
            false
        }
    }
}

fn print_summary(summary: &Summary) {
    if let Some(title) = &summary.title {
        println!("{}", style(title).bold());
    }
    println!("{}", style("Summary:").green().bold());
    for bullet in &summary.bullets {
        println!("- {}", bullet);
    }
}

fn write_outputs(summary: &Summary, args: &RunArgs, settings: &Settings) -> anyhow::Result<()> {
    let save_dir = args
        .save
        .then(|| settings.output_dir.as_deref().unwrap_or("."));

    for path in save_markdown(summary, args.out.as_deref(), save_dir)? {
        println!("Summary saved to: {}", path.display());
    }

    Ok(())
}
