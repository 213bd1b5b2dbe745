use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub mod diagnostics;
pub mod pipeline;
pub mod summarizer;
pub mod transcript;

pub use pipeline::{Phase, Pipeline, PipelineCallbacks, Settings};
pub use summarizer::{build_prompt, HfSummarizer, Summarizer};
pub use transcript::{
    Transcript, TranscriptError, TranscriptSegment, TranscriptSource, YtDlpTranscriptSource,
};

#[derive(Error, Debug)]
pub enum Y2bError {
    #[error("No URL provided")]
    EmptyUrl,
    #[error("Failed to extract video ID from: {0}")]
    VideoIdExtraction(String),
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
    #[error("Hugging Face token not configured")]
    MissingToken,
    #[error("Summarization error: {0}")]
    Summarization(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Y2bError {
    /// Short message shown to the user when a run is aborted.
    pub fn user_message(&self) -> String {
        match self {
            Y2bError::EmptyUrl => "Please paste a YouTube URL.".to_string(),
            Y2bError::VideoIdExtraction(_) => "Unable to extract video ID. Check the URL.".to_string(),
            Y2bError::Transcript(TranscriptError::Disabled) => {
                "Transcript disabled for this video.".to_string()
            }
            Y2bError::Transcript(TranscriptError::NotFound { .. }) => {
                "No transcript available.".to_string()
            }
            Y2bError::Transcript(TranscriptError::Fetch(detail)) => format!("Error: {}", detail),
            Y2bError::MissingToken => {
                "Missing Hugging Face token. Set HF_TOKEN or run: y2b token set".to_string()
            }
            Y2bError::Summarization(detail) => format!("Summarization failed: {}", detail),
            Y2bError::Network(e) => format!("Error: {}", e),
            Y2bError::Io(e) => format!("Error: {}", e),
            Y2bError::Config(msg) => format!("Configuration error: {}", msg),
        }
    }
}

pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MODEL: &str = "facebook/bart-large-cnn";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummarizerConfig {
    pub endpoint: String,
    pub model: String,
    pub max_length: u32,
    pub min_length: u32,
    pub wait_for_model: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        SummarizerConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_length: 120,
            min_length: 20,
            wait_for_model: true,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    pub summarizer: SummarizerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            languages: vec!["en".to_string()],
            output_dir: None,
            summarizer: SummarizerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, Y2bError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, Y2bError> {
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(AppConfig::default());
        }

        let config_content = std::fs::read_to_string(config_path)
            .map_err(|e| Y2bError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str::<AppConfig>(&config_content).map_err(|e| {
            Y2bError::Config(format!(
                "Failed to parse config: {}\n\nPlease check your config file at: {}",
                e,
                config_path.display()
            ))
        })
    }

    pub fn save(&self) -> Result<PathBuf, Y2bError> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), Y2bError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Y2bError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let header = r#"# =============================================================================
# y2b Configuration
# Edit this file directly or re-run: y2b init
# =============================================================================

"#;

        let config_toml = toml::to_string_pretty(self)
            .map_err(|e| Y2bError::Config(format!("Failed to serialize configuration: {}", e)))?;

        std::fs::write(config_path, format!("{}{}", header, config_toml))
            .map_err(|e| Y2bError::Config(format!("Failed to write configuration file: {}", e)))?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, Y2bError> {
        let config_dir = directories::ProjectDirs::from("com", "y2b", "y2b")
            .ok_or_else(|| Y2bError::Config("Could not determine config directory".to_string()))?;

        Ok(config_dir.config_dir().join("config.toml"))
    }
}

/// Environment variables checked for the token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["HF_TOKEN", "Y2B_HF_TOKEN"];

const KEYRING_USER: &str = "huggingface";

pub struct CredentialManager {
    service_name: String,
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialManager {
    pub fn new() -> Self {
        Self {
            service_name: "y2b".to_string(),
        }
    }

    pub fn get_token(&self) -> Result<Option<String>, Y2bError> {
        for var in TOKEN_ENV_VARS {
            if let Ok(token) = std::env::var(var) {
                if !token.trim().is_empty() {
                    debug!("Using Hugging Face token from {}", var);
                    return Ok(Some(token.trim().to_string()));
                }
            }
        }

        let entry = keyring::Entry::new(&self.service_name, KEYRING_USER)
            .map_err(|e| Y2bError::Config(format!("Failed to access keyring: {}", e)))?;

        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Y2bError::Config(format!(
                "Failed to retrieve token from keyring: {}",
                e
            ))),
        }
    }

    pub fn set_token(&self, token: &str) -> Result<(), Y2bError> {
        let entry = keyring::Entry::new(&self.service_name, KEYRING_USER)
            .map_err(|e| Y2bError::Config(format!("Failed to access keyring: {}", e)))?;

        entry
            .set_password(token)
            .map_err(|e| Y2bError::Config(format!("Failed to store token in keyring: {}", e)))?;

        Ok(())
    }

    pub fn delete_token(&self) -> Result<(), Y2bError> {
        let entry = keyring::Entry::new(&self.service_name, KEYRING_USER)
            .map_err(|e| Y2bError::Config(format!("Failed to access keyring: {}", e)))?;

        match entry.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Y2bError::Config(format!(
                "Failed to delete token from keyring: {}",
                e
            ))),
        }
    }

    pub fn has_token(&self) -> bool {
        self.get_token().ok().flatten().is_some()
    }
}

/// An 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tried in order; the first capture wins.
static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:v=|/)([0-9A-Za-z_-]{11})(?:&|$)",
        r"youtu\.be/([0-9A-Za-z_-]{11})",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Extract the video ID from a YouTube URL.
///
/// Returns `None` for anything that does not look like a video link,
/// including input that is not a URL at all.
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    let url = url.trim();

    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|id| VideoId(id.as_str().to_string()))
}

pub const BULLET_COUNT: usize = 3;

/// Filler for bullet slots the summary could not fill.
pub const PLACEHOLDER: &str = "—";

/// Exactly three non-empty summary points, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletList([String; BULLET_COUNT]);

impl BulletList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Number of bullets carrying real content rather than the placeholder.
    pub fn filled(&self) -> usize {
        self.0.iter().filter(|b| b.as_str() != PLACEHOLDER).count()
    }
}

impl<'a> IntoIterator for &'a BulletList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Turn free-form summarizer output into exactly three bullets.
///
/// Splits on newlines, `•` and `-`, drops blank pieces, keeps the first three
/// and pads with [`PLACEHOLDER`].
///
/// Known limitation: hyphenated words ("state-of-the-art") and numeric
/// ranges ("10-20") are split into separate points.
pub fn normalize_bullets(summary: &str) -> BulletList {
    let mut points = summary
        .split(|c: char| matches!(c, '\n' | '•' | '-'))
        .map(str::trim)
        .filter(|point| !point.is_empty());

    BulletList(std::array::from_fn(|_| {
        points.next().unwrap_or(PLACEHOLDER).to_string()
    }))
}

/// Result of one summarize run.
#[derive(Debug, Clone)]
pub struct Summary {
    pub video_id: VideoId,
    pub title: Option<String>,
    pub raw_text: String,
    pub bullets: BulletList,
}

/// Markdown rendition: optional title heading, banner, then the bullets.
pub fn render_markdown(summary: &Summary) -> String {
    let mut markdown = String::new();

    if let Some(title) = &summary.title {
        markdown.push_str(&format!("## {}\n\n", title));
        markdown.push_str(&format!("<{}>\n\n", summary.video_id.watch_url()));
    }

    markdown.push_str("Summary:\n\n");
    for bullet in &summary.bullets {
        markdown.push_str(&format!("- {}\n", bullet));
    }

    markdown
}

/// File name used when saving a summary into the output directory.
pub fn markdown_filename(summary: &Summary) -> String {
    let sanitized_title = summary
        .title
        .as_deref()
        .unwrap_or("summary")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    format!(
        "{}_{}_{}.md",
        chrono::Utc::now().format("%Y-%m-%d"),
        summary.video_id,
        sanitized_title
    )
}

/// Write the markdown rendition to `out` and/or into `save_dir` under
/// [`markdown_filename`]. `save_dir` is tilde-expanded and created if
/// missing. Returns the paths written, in that order.
pub fn save_markdown(
    summary: &Summary,
    out: Option<&Path>,
    save_dir: Option<&str>,
) -> Result<Vec<PathBuf>, Y2bError> {
    let markdown = render_markdown(summary);
    let mut written = Vec::new();

    if let Some(path) = out {
        std::fs::write(path, &markdown)?;
        written.push(path.to_path_buf());
    }

    if let Some(dir) = save_dir {
        let dir = PathBuf::from(shellexpand::tilde(dir).to_string());
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(markdown_filename(summary));
        std::fs::write(&path, &markdown)?;
        debug!("Saved summary to {}", path.display());
        written.push(path);
    }

    Ok(written)
}
