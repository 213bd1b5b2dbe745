//! Transcript retrieval through yt-dlp caption listings.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::VideoId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranscriptError {
    #[error("Transcripts are disabled for this video")]
    Disabled,
    #[error("No transcript found for languages: {}", .languages.join(", "))]
    NotFound { languages: Vec<String> },
    #[error("Failed to fetch transcript: {0}")]
    Fetch(String),
}

/// A timed unit of spoken text.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    /// Offset from the start of the video, in seconds.
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone)]
pub struct Transcript {
    pub language: String,
    pub is_generated: bool,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Non-blank segment texts joined by single spaces.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter(|segment| !segment.text.trim().is_empty())
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript, TranscriptError>;
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: Option<String>,
    uploader: Option<String>,
    subtitles: Option<HashMap<String, Vec<CaptionFormat>>>,
    automatic_captions: Option<HashMap<String, Vec<CaptionFormat>>>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptionFormat {
    ext: String,
    url: Option<String>,
}

#[derive(Debug)]
struct SelectedTrack<'a> {
    language: &'a str,
    is_generated: bool,
    formats: &'a [CaptionFormat],
}

// Live chat replays show up as a subtitle track but carry no speech.
const IGNORED_TRACKS: [&str; 1] = ["live_chat"];

fn caption_tracks(
    tracks: &Option<HashMap<String, Vec<CaptionFormat>>>,
) -> impl Iterator<Item = (&String, &Vec<CaptionFormat>)> {
    tracks
        .iter()
        .flat_map(|tracks| tracks.iter())
        .filter(|(lang, formats)| !IGNORED_TRACKS.contains(&lang.as_str()) && !formats.is_empty())
}

/// Pick a caption track: for each preferred language in turn, a manually
/// created track beats an auto-generated one.
fn select_track<'a>(
    info: &'a VideoInfo,
    languages: &[String],
) -> Result<SelectedTrack<'a>, TranscriptError> {
    let manual: HashMap<&String, &Vec<CaptionFormat>> = caption_tracks(&info.subtitles).collect();
    let generated: HashMap<&String, &Vec<CaptionFormat>> =
        caption_tracks(&info.automatic_captions).collect();

    if manual.is_empty() && generated.is_empty() {
        return Err(TranscriptError::Disabled);
    }

    for language in languages {
        if let Some((&lang, &formats)) = manual.get_key_value(language) {
            return Ok(SelectedTrack {
                language: lang.as_str(),
                is_generated: false,
                formats: formats.as_slice(),
            });
        }
        if let Some((&lang, &formats)) = generated.get_key_value(language) {
            return Ok(SelectedTrack {
                language: lang.as_str(),
                is_generated: true,
                formats: formats.as_slice(),
            });
        }
    }

    Err(TranscriptError::NotFound {
        languages: languages.to_vec(),
    })
}

#[derive(Debug, Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse YouTube's `json3` caption format into segments.
fn parse_json3(body: &str) -> Result<Vec<TranscriptSegment>, TranscriptError> {
    let captions: Json3Captions = serde_json::from_str(body)
        .map_err(|e| TranscriptError::Fetch(format!("Failed to parse captions: {}", e)))?;

    let segments = captions
        .events
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            Some(TranscriptSegment {
                text: segs.into_iter().map(|seg| seg.utf8).collect(),
                start: event.t_start_ms as f64 / 1000.0,
                duration: event.d_duration_ms as f64 / 1000.0,
            })
        })
        .collect();

    Ok(segments)
}

/// Fetches captions by asking yt-dlp for the video's track listing and
/// downloading the chosen track's json3 rendition.
pub struct YtDlpTranscriptSource {
    languages: Vec<String>,
    binary: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl YtDlpTranscriptSource {
    pub fn new(languages: Vec<String>) -> Self {
        Self {
            languages,
            binary: "yt-dlp".to_string(),
            timeout: None,
            client: reqwest::Client::new(),
        }
    }

    /// Use a different yt-dlp executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn video_info(&self, video_id: &VideoId) -> Result<VideoInfo, TranscriptError> {
        let url = video_id.watch_url();
        debug!("Running {} --dump-json for {}", self.binary, url);

        let output = tokio::process::Command::new(&self.binary)
            .args(["--dump-json", "--skip-download", "--no-warnings", &url])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscriptError::Fetch(
                        "yt-dlp not found. Please install yt-dlp: https://github.com/yt-dlp/yt-dlp"
                            .to_string(),
                    )
                } else {
                    TranscriptError::Fetch(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptError::Fetch(format!(
                "yt-dlp failed: {}",
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| TranscriptError::Fetch(format!("Failed to parse metadata JSON: {}", e)))
    }

    async fn download_captions(&self, url: &str) -> Result<String, TranscriptError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TranscriptError::Fetch(format!("Failed to download captions: {}", e)))?;

        if !response.status().is_success() {
            return Err(TranscriptError::Fetch(format!(
                "Caption download returned error: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| TranscriptError::Fetch(format!("Failed to read captions: {}", e)))
    }
}

#[async_trait]
impl TranscriptSource for YtDlpTranscriptSource {
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript, TranscriptError> {
        let info = self.video_info(video_id).await?;
        let track = select_track(&info, &self.languages)?;

        info!(
            "Using {} captions in '{}'",
            if track.is_generated { "auto-generated" } else { "manual" },
            track.language
        );

        let caption_url = track
            .formats
            .iter()
            .find(|format| format.ext == "json3")
            .and_then(|format| format.url.as_deref())
            .ok_or_else(|| {
                TranscriptError::Fetch(format!(
                    "No json3 captions offered for language '{}'",
                    track.language
                ))
            })?;

        let body = self.download_captions(caption_url).await?;
        let segments = parse_json3(&body)?;
        debug!("Parsed {} caption segments", segments.len());

        Ok(Transcript {
            language: track.language.to_string(),
            is_generated: track.is_generated,
            title: info.title.clone(),
            channel: info.uploader.clone(),
            segments,
        })
    }
}
