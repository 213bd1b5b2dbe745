use crate::{AppConfig, CredentialManager};
use console::{style, Emoji, StyledObject};
use std::path::Path;
use std::process::Command;

static CHECKMARK: Emoji = Emoji("✓", "+");
static CROSS: Emoji = Emoji("✗", "x");
static WARNING: Emoji = Emoji("⚠", "!");
static INFO: Emoji = Emoji("ℹ", "i");

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticStatus {
    Success,
    Warning,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub name: String,
    pub status: DiagnosticStatus,
    pub message: String,
    pub fix_command: Option<String>,
}

impl Diagnostic {
    pub fn new(
        name: String,
        status: DiagnosticStatus,
        message: String,
        fix_command: Option<String>,
    ) -> Self {
        Self {
            name,
            status,
            message,
            fix_command,
        }
    }

    pub fn success(name: String, message: String) -> Self {
        Self::new(name, DiagnosticStatus::Success, message, None)
    }

    pub fn warning(name: String, message: String, fix: Option<String>) -> Self {
        Self::new(name, DiagnosticStatus::Warning, message, fix)
    }

    pub fn error(name: String, message: String, fix: Option<String>) -> Self {
        Self::new(name, DiagnosticStatus::Error, message, fix)
    }

    pub fn info(name: String, message: String) -> Self {
        Self::new(name, DiagnosticStatus::Info, message, None)
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticReport {
    pub dependencies: Vec<Diagnostic>,
    pub credentials: Vec<Diagnostic>,
    pub configuration: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn all(&self) -> impl Iterator<Item = &Diagnostic> {
        self.dependencies
            .iter()
            .chain(self.credentials.iter())
            .chain(self.configuration.iter())
    }

    pub fn has_errors(&self) -> bool {
        self.all()
            .any(|d| matches!(d.status, DiagnosticStatus::Error))
    }

    pub fn has_warnings(&self) -> bool {
        self.all()
            .any(|d| matches!(d.status, DiagnosticStatus::Warning))
    }
}

pub fn run_diagnostics() -> DiagnosticReport {
    let mut report = DiagnosticReport::new();

    report.dependencies = vec![check_ytdlp("yt-dlp")];
    report.credentials = vec![check_token(&CredentialManager::new())];
    report.configuration = check_configuration();

    report
}

fn check_ytdlp(binary: &str) -> Diagnostic {
    match Command::new(binary).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Diagnostic::success("yt-dlp".to_string(), format!("v{} (installed)", version))
        }
        _ => Diagnostic::error(
            "yt-dlp".to_string(),
            "not found".to_string(),
            Some(get_installation_help()),
        ),
    }
}

fn check_token(cred_manager: &CredentialManager) -> Diagnostic {
    match cred_manager.get_token() {
        Ok(Some(_)) => Diagnostic::success("HF token".to_string(), "configured".to_string()),
        Ok(None) => Diagnostic::error(
            "HF token".to_string(),
            "not set".to_string(),
            Some("Set HF_TOKEN or run: y2b token set".to_string()),
        ),
        Err(e) => Diagnostic::warning(
            "HF token".to_string(),
            format!("keyring unavailable: {}", e),
            Some("Set HF_TOKEN in your environment instead".to_string()),
        ),
    }
}

fn check_configuration() -> Vec<Diagnostic> {
    match AppConfig::config_path() {
        Ok(path) => check_config_file(&path),
        Err(e) => vec![Diagnostic::error(
            "Config file".to_string(),
            format!("could not determine config path: {}", e),
            None,
        )],
    }
}

fn check_config_file(path: &Path) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if !path.exists() {
        diagnostics.push(Diagnostic::info(
            "Config file".to_string(),
            "not found (using defaults)".to_string(),
        ));
        return diagnostics;
    }

    let config = match AppConfig::load_from(path) {
        Ok(config) => config,
        Err(e) => {
            diagnostics.push(Diagnostic::error(
                "Config file".to_string(),
                format!("{} (invalid: {})", path.display(), e),
                Some("Fix the file or re-create it: y2b init".to_string()),
            ));
            return diagnostics;
        }
    };

    diagnostics.push(Diagnostic::success(
        "Config file".to_string(),
        format!("{} (valid)", path.display()),
    ));

    if config.languages.is_empty() {
        diagnostics.push(Diagnostic::warning(
            "Languages".to_string(),
            "none configured, no transcript can match".to_string(),
            Some(format!("Add languages = [\"en\"] to {}", path.display())),
        ));
    } else {
        diagnostics.push(Diagnostic::success(
            "Languages".to_string(),
            config.languages.join(", "),
        ));
    }

    if config.summarizer.min_length > config.summarizer.max_length {
        diagnostics.push(Diagnostic::warning(
            "Summary length".to_string(),
            format!(
                "min_length {} exceeds max_length {}",
                config.summarizer.min_length, config.summarizer.max_length
            ),
            None,
        ));
    }

    if let Some(output_dir) = &config.output_dir {
        let expanded = shellexpand::tilde(output_dir).to_string();
        if Path::new(&expanded).is_dir() {
            diagnostics.push(Diagnostic::success(
                "Output dir".to_string(),
                format!("{} (exists)", output_dir),
            ));
        } else {
            diagnostics.push(Diagnostic::warning(
                "Output dir".to_string(),
                format!("{} (does not exist)", output_dir),
                Some(format!("Create it: mkdir -p {}", expanded)),
            ));
        }
    }

    diagnostics
}

fn get_installation_help() -> String {
    match std::env::consts::OS {
        "linux" => "Ubuntu/Debian:  sudo apt install yt-dlp
Fedora:         sudo dnf install yt-dlp
Arch:           sudo pacman -S yt-dlp
pip:            python3 -m pip install yt-dlp

After installation: y2b doctor"
            .to_string(),
        "macos" => "Homebrew:       brew install yt-dlp
pip:            python3 -m pip install yt-dlp

After installation: y2b doctor"
            .to_string(),
        _ => "pip:            python3 -m pip install yt-dlp
More info:      https://github.com/yt-dlp/yt-dlp

After installation: y2b doctor"
            .to_string(),
    }
}

impl DiagnosticStatus {
    fn symbol(&self) -> &'static Emoji<'static, 'static> {
        match self {
            DiagnosticStatus::Success => &CHECKMARK,
            DiagnosticStatus::Warning => &WARNING,
            DiagnosticStatus::Error => &CROSS,
            DiagnosticStatus::Info => &INFO,
        }
    }

    fn paint(&self, text: String) -> StyledObject<String> {
        let styled = style(text);
        match self {
            DiagnosticStatus::Success => styled.green(),
            DiagnosticStatus::Warning => styled.yellow(),
            DiagnosticStatus::Error => styled.red(),
            DiagnosticStatus::Info => styled.cyan(),
        }
    }
}

impl DiagnosticReport {
    fn sections(&self) -> [(&'static str, &[Diagnostic]); 3] {
        [
            ("yt-dlp", self.dependencies.as_slice()),
            ("Hugging Face", self.credentials.as_slice()),
            ("Configuration", self.configuration.as_slice()),
        ]
    }

    /// Fix commands from every failing check, in report order.
    pub fn suggestions(&self) -> Vec<&str> {
        self.all()
            .filter_map(|d| d.fix_command.as_deref())
            .collect()
    }

    fn verdict(&self) -> (DiagnosticStatus, &'static str) {
        if self.has_errors() {
            (DiagnosticStatus::Error, "y2b cannot summarize videos yet")
        } else if self.has_warnings() {
            (DiagnosticStatus::Warning, "y2b is usable, see warnings above")
        } else {
            (DiagnosticStatus::Success, "y2b is ready")
        }
    }
}

fn format_line(diagnostic: &Diagnostic) -> String {
    format!(
        "  {} {:<16} {}",
        diagnostic.status.symbol(),
        diagnostic.name,
        diagnostic.message
    )
}

pub fn print_diagnostic_report(report: &DiagnosticReport) {
    println!("\n{}\n", style("y2b doctor").bold());

    for (title, diagnostics) in report.sections() {
        if diagnostics.is_empty() {
            continue;
        }
        println!("{}", style(title).bold().underlined());
        for diagnostic in diagnostics {
            println!("{}", diagnostic.status.paint(format_line(diagnostic)));
        }
        println!();
    }

    let (status, verdict) = report.verdict();
    println!(
        "{}",
        status.paint(format!("{} {}", status.symbol(), verdict)).bold()
    );

    let suggestions = report.suggestions();
    if !suggestions.is_empty() {
        println!("\n{}", style("To fix:").bold());
        for suggestion in suggestions {
            for (i, line) in suggestion.lines().enumerate() {
                let bullet = if i == 0 { "-" } else { " " };
                println!("  {} {}", bullet, line);
            }
        }
    }
    println!();
}
