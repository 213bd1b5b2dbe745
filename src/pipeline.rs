//! One summarize run: URL → transcript → summary → three bullets.

use std::time::Duration;
use tracing::info;

use crate::summarizer::{build_prompt, HfSummarizer, Summarizer};
use crate::transcript::{TranscriptSource, YtDlpTranscriptSource};
use crate::{extract_video_id, normalize_bullets, AppConfig, Summary, SummarizerConfig, Y2bError};

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub languages: Vec<String>,
    pub summarizer: SummarizerConfig,
    pub token: Option<String>,
    pub output_dir: Option<String>,
}

impl Settings {
    pub fn new(config: AppConfig, token: Option<String>) -> Self {
        Settings {
            languages: config.languages,
            summarizer: config.summarizer,
            token: token.filter(|t| !t.trim().is_empty()),
            output_dir: config.output_dir,
        }
    }

    /// Build the production pipeline from these settings.
    pub fn pipeline(&self) -> Pipeline<YtDlpTranscriptSource, HfSummarizer> {
        let transcripts = YtDlpTranscriptSource::new(self.languages.clone())
            .with_timeout(self.summarizer.timeout_secs.map(Duration::from_secs));
        let summarizer = self
            .token
            .as_ref()
            .map(|token| HfSummarizer::new(token.clone(), self.summarizer.clone()));

        Pipeline::new(transcripts, summarizer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchingTranscript,
    Summarizing,
}

/// Progress hooks for the interactive shell.
#[derive(Default)]
pub struct PipelineCallbacks {
    pub on_phase: Option<Box<dyn Fn(Phase) + Send + Sync>>,
}

impl PipelineCallbacks {
    fn phase(&self, phase: Phase) {
        if let Some(cb) = &self.on_phase {
            cb(phase);
        }
    }
}

pub struct Pipeline<T, S>
where
    T: TranscriptSource,
    S: Summarizer,
{
    transcripts: T,
    summarizer: Option<S>,
}

impl<T, S> Pipeline<T, S>
where
    T: TranscriptSource,
    S: Summarizer,
{
    /// `summarizer` is `None` when no token is configured; runs then fail
    /// with [`Y2bError::MissingToken`] once a transcript has been fetched.
    pub fn new(transcripts: T, summarizer: Option<S>) -> Self {
        Self {
            transcripts,
            summarizer,
        }
    }

    pub async fn run(&self, url: &str, callbacks: &PipelineCallbacks) -> Result<Summary, Y2bError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Y2bError::EmptyUrl);
        }

        let video_id =
            extract_video_id(url).ok_or_else(|| Y2bError::VideoIdExtraction(url.to_string()))?;
        info!("Summarizing video {}", video_id);

        callbacks.phase(Phase::FetchingTranscript);
        let transcript = self.transcripts.fetch(&video_id).await?;

        let summarizer = self.summarizer.as_ref().ok_or(Y2bError::MissingToken)?;

        callbacks.phase(Phase::Summarizing);
        let raw_text = summarizer.summarize(&build_prompt(&transcript.text())).await?;
        let bullets = normalize_bullets(&raw_text);
        info!("Summary produced {} of 3 bullets", bullets.filled());

        Ok(Summary {
            video_id,
            title: transcript.title,
            raw_text,
            bullets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Transcript, TranscriptError, TranscriptSegment};
    use crate::VideoId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct MockSource {
        result: Result<Transcript, TranscriptError>,
        calls: Arc<AtomicUsize>,
    }

    impl MockSource {
        fn ok(text: &str) -> Self {
            Self {
                result: Ok(Transcript {
                    language: "en".to_string(),
                    is_generated: false,
                    title: Some("Test video".to_string()),
                    channel: None,
                    segments: vec![TranscriptSegment {
                        text: text.to_string(),
                        start: 0.0,
                        duration: 1.0,
                    }],
                }),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn err(error: TranscriptError) -> Self {
            Self {
                result: Err(error),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl TranscriptSource for MockSource {
        async fn fetch(&self, _video_id: &VideoId) -> Result<Transcript, TranscriptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct MockSummarizer {
        reply: String,
        inputs: Arc<Mutex<Vec<String>>>,
    }

    impl MockSummarizer {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                inputs: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Summarizer for MockSummarizer {
        async fn summarize(&self, text: &str) -> Result<String, Y2bError> {
            self.inputs.lock().unwrap().push(text.to_string());
            Ok(self.reply.clone())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _text: &str) -> Result<String, Y2bError> {
            Err(Y2bError::Summarization("Inference API returned error 503".to_string()))
        }
    }

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[tokio::test]
    async fn test_run_returns_three_bullets() {
        let summarizer = MockSummarizer::new("• one\n• two\n• three\n• four");
        let inputs = Arc::clone(&summarizer.inputs);
        let pipeline = Pipeline::new(MockSource::ok("hello world"), Some(summarizer));

        let summary = pipeline.run(URL, &PipelineCallbacks::default()).await.unwrap();

        assert_eq!(summary.video_id.as_str(), "dQw4w9WgXcQ");
        assert_eq!(summary.title.as_deref(), Some("Test video"));
        assert_eq!(summary.bullets.as_slice(), ["one", "two", "three"]);
        assert_eq!(
            inputs.lock().unwrap().as_slice(),
            [build_prompt("hello world")]
        );
    }

    #[tokio::test]
    async fn test_run_pads_short_summary() {
        let pipeline = Pipeline::new(
            MockSource::ok("hello"),
            Some(MockSummarizer::new("Only one point")),
        );

        let summary = pipeline.run(URL, &PipelineCallbacks::default()).await.unwrap();
        assert_eq!(summary.bullets.as_slice(), ["Only one point", "—", "—"]);
        assert_eq!(summary.raw_text, "Only one point");
    }

    #[tokio::test]
    async fn test_run_rejects_empty_url_before_fetching() {
        let source = MockSource::ok("hello");
        let calls = Arc::clone(&source.calls);
        let pipeline = Pipeline::new(source, Some(MockSummarizer::new("x")));

        let err = pipeline.run("   ", &PipelineCallbacks::default()).await.unwrap_err();
        assert!(matches!(err, Y2bError::EmptyUrl));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_rejects_unparseable_url() {
        let source = MockSource::ok("hello");
        let calls = Arc::clone(&source.calls);
        let pipeline = Pipeline::new(source, Some(MockSummarizer::new("x")));

        let err = pipeline
            .run("not a url", &PipelineCallbacks::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Y2bError::VideoIdExtraction(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_surfaces_transcript_errors() {
        for error in [
            TranscriptError::Disabled,
            TranscriptError::NotFound {
                languages: vec!["en".to_string()],
            },
            TranscriptError::Fetch("network down".to_string()),
        ] {
            let summarizer = MockSummarizer::new("x");
            let inputs = Arc::clone(&summarizer.inputs);
            let pipeline = Pipeline::new(MockSource::err(error.clone()), Some(summarizer));

            match pipeline.run(URL, &PipelineCallbacks::default()).await {
                Err(Y2bError::Transcript(got)) => assert_eq!(got, error),
                other => panic!("expected transcript error, got {:?}", other),
            }
            assert!(inputs.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_run_without_token_fails_after_transcript_fetch() {
        let source = MockSource::ok("hello");
        let calls = Arc::clone(&source.calls);
        let pipeline: Pipeline<MockSource, MockSummarizer> = Pipeline::new(source, None);

        let err = pipeline.run(URL, &PipelineCallbacks::default()).await.unwrap_err();
        assert!(matches!(err, Y2bError::MissingToken));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_surfaces_summarizer_errors() {
        let pipeline = Pipeline::new(MockSource::ok("hello"), Some(FailingSummarizer));

        let err = pipeline.run(URL, &PipelineCallbacks::default()).await.unwrap_err();
        assert!(err.user_message().starts_with("Summarization failed"));
    }

    #[tokio::test]
    async fn test_run_reports_phases_in_order() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&phases);
        let callbacks = PipelineCallbacks {
            on_phase: Some(Box::new(move |phase: Phase| recorded.lock().unwrap().push(phase))),
        };

        let pipeline = Pipeline::new(MockSource::ok("hello"), Some(MockSummarizer::new("a")));
        pipeline.run(URL, &callbacks).await.unwrap();

        assert_eq!(
            phases.lock().unwrap().as_slice(),
            [Phase::FetchingTranscript, Phase::Summarizing]
        );
    }

    #[test]
    fn test_settings_drop_blank_token() {
        let settings = Settings::new(AppConfig::default(), Some("  ".to_string()));
        assert_eq!(settings.token, None);

        let settings = Settings::new(AppConfig::default(), Some("hf_abc".to_string()));
        assert_eq!(settings.token.as_deref(), Some("hf_abc"));
        assert_eq!(settings.languages, vec!["en"]);
    }
}
