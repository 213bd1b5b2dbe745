//! Hugging Face Inference API summarizer.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{SummarizerConfig, Y2bError};

/// Instruction prepended to the transcript before summarization.
pub const SUMMARY_INSTRUCTION: &str =
    "Summarize the following text into exactly 3 short bullet points:";

pub fn build_prompt(transcript: &str) -> String {
    format!("{}\n\n{}", SUMMARY_INSTRUCTION, transcript)
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text`, returning the model's raw output.
    async fn summarize(&self, text: &str) -> Result<String, Y2bError>;
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_length: u32,
    min_length: u32,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

/// Pull `summary_text` out of the first array element; any other body is
/// handed back verbatim as serialized JSON.
fn interpret_response(body: &serde_json::Value) -> String {
    match body
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("summary_text"))
    {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => {
            warn!("Unexpected summarization response shape");
            body.to_string()
        }
    }
}

pub struct HfSummarizer {
    token: String,
    config: SummarizerConfig,
    client: reqwest::Client,
}

impl HfSummarizer {
    pub fn new(token: impl Into<String>, config: SummarizerConfig) -> Self {
        Self {
            token: token.into(),
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request<'a>(&self, text: &'a str) -> InferenceRequest<'a> {
        InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                max_length: self.config.max_length,
                min_length: self.config.min_length,
            },
            options: InferenceOptions {
                wait_for_model: self.config.wait_for_model,
            },
        }
    }
}

#[async_trait]
impl Summarizer for HfSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, Y2bError> {
        debug!(
            "Requesting summary from {} ({} chars of input)",
            self.config.model,
            text.len()
        );

        let mut request = self
            .client
            .post(self.api_url())
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&self.build_request(text));

        if let Some(secs) = self.config.timeout_secs {
            request = request.timeout(Duration::from_secs(secs));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Y2bError::Summarization(format!(
                "Inference API returned error {}: {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response.json().await.map_err(|e| {
            Y2bError::Summarization(format!("Failed to parse inference response: {}", e))
        })?;

        Ok(interpret_response(&response_json))
    }
}
