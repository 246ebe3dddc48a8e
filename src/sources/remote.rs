use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::{validate_questions, GenerationRequest, QuestionSet, QuestionSource};
use crate::error::GenerationError;
use crate::model::Question;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequestBody<'a> {
    content: &'a str,
    question_count: usize,
}

/// Configuration for the HTTP question endpoint
#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    pub url: String,
    pub timeout: Option<Duration>,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Generates questions by posting the syllabus to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    config: RemoteConfig,
    client: Client,
}

impl RemoteSource {
    pub fn new(config: RemoteConfig) -> Result<Self, GenerationError> {
        if config.url.trim().is_empty() {
            return Err(GenerationError::Unconfigured("question endpoint URL is empty".to_string()));
        }
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        info!(url = %config.url, timeout = ?config.timeout, "Creating remote question source");
        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl QuestionSource for RemoteSource {
    #[instrument(skip(self, request), fields(ticket = request.ticket, count = request.question_count.get(), url = %self.config.url))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GenerationError> {
        let body = GenerateRequestBody {
            content: &request.syllabus,
            question_count: request.question_count.get(),
        };

        debug!(syllabus_len = request.syllabus.len(), "Sending request to question endpoint");
        let response = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                GenerationError::from(e)
            })?;

        let status = response.status();
        debug!(status = %status, "Received response from question endpoint");

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Question endpoint rate limit exceeded");
            return Err(GenerationError::RateLimited);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!("Question endpoint rejected credentials");
            return Err(GenerationError::Unauthorized);
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %body, "Question endpoint error");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read question endpoint response");
            GenerationError::from(e)
        })?;
        let set: QuestionSet = serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "Failed to parse question endpoint response JSON");
            GenerationError::Decode(e.to_string())
        })?;

        debug!(questions = set.questions.len(), "Parsed question endpoint response");
        let result = validate_questions(set.questions, request.question_count);
        match &result {
            Ok(questions) => info!(questions = questions.len(), "Received questions from endpoint"),
            Err(e) => error!(error = %e, "Question endpoint returned malformed questions"),
        }
        result
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
