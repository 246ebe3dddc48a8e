use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::{validate_questions, GenerationRequest, QuestionSet, QuestionSource};
use crate::config::KeyFromEnv;
use crate::error::GenerationError;
use crate::model::Question;

const DEEPSEEK_URL: &str = "https://api.deepseek.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You write exam practice questions and reply with JSON only.";

/// Chat completion request body; borrows the prompt rather than copying it.
#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: [ChatTurn<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionText,
}

#[derive(Debug, Deserialize)]
struct CompletionText {
    #[serde(default)]
    content: String,
}

/// Configuration for the DeepSeek question source
#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub url: String,
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_key: DeepSeekSource::find_key().unwrap_or_default(),
            model: "deepseek-chat".to_string(),
            max_tokens: 8192,
            temperature: 0.3,
            url: DEEPSEEK_URL.to_string(),
        }
    }
}

/// Generates questions by prompting a DeepSeek-compatible chat completion API.
#[derive(Debug, Clone)]
pub struct DeepSeekSource {
    config: DeepSeekConfig,
    client: Client,
}

impl KeyFromEnv for DeepSeekSource {
    const KEY_NAME: &'static str = "DEEPSEEK_API_KEY";
}

impl DeepSeekSource {
    pub fn new(config: DeepSeekConfig) -> Result<Self, GenerationError> {
        if config.api_key.is_empty() {
            return Err(GenerationError::Unconfigured(format!("{} is not set", Self::KEY_NAME)));
        }
        info!(model = %config.model, "Creating DeepSeek question source");
        Ok(Self {
            config,
            client: Client::new(),
        })
    }

    /// Create a source from `DEEPSEEK_API_KEY` in the environment or `.env`.
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::new(DeepSeekConfig::default())
    }
}

/// Prompt asking for `request.question_count` questions, with the JSON schema of
/// the expected answer appended.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let schema = schema_for!(QuestionSet);
    let schema_json = serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|_| "Schema serialization failed".to_string());

    format!(
        "You are writing a multiple-choice practice quiz for a student.\n\
         Using only the syllabus below, write exactly {count} questions. Each question must have \
         exactly 4 options and exactly one correct option, given as a zero-based index.\n\n\
         ## Syllabus\n{syllabus}\n\n\
         ## Response Format\nRespond with valid JSON matching this schema:\n```json\n{schema}\n```",
        count = request.question_count.get(),
        syllabus = request.syllabus,
        schema = schema_json,
    )
}

/// The balanced JSON object starting at the `{` that opens `text`, if any.
///
/// Braces inside strings are skipped.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;
    for (i, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Every balanced `{...}` span in `text`, in order of its opening brace.
///
/// Models wrap JSON in prose or code fences, and the prose may contain braces
/// of its own, so callers try each candidate in turn.
pub fn json_object_candidates(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(move |(start, _)| balanced_object(&text[start..]))
}

/// Pull a `QuestionSet` out of a model reply.
///
/// The first candidate object that decodes as a question set wins; if none
/// does, the decode error of the first candidate is reported.
pub fn parse_reply(reply: &str) -> Result<QuestionSet, GenerationError> {
    let mut first_error = None;
    for candidate in json_object_candidates(reply) {
        match serde_json::from_str::<QuestionSet>(candidate) {
            Ok(set) => return Ok(set),
            Err(e) => {
                debug!(error = %e, len = candidate.len(), "Skipping JSON candidate");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    Err(GenerationError::Decode(match first_error {
        Some(e) => e.to_string(),
        None => "no JSON object in model reply".to_string(),
    }))
}

#[async_trait]
impl QuestionSource for DeepSeekSource {
    #[instrument(skip(self, request), fields(ticket = request.ticket, count = request.question_count.get(), model = %self.config.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GenerationError> {
        let prompt = build_prompt(request);
        debug!(prompt_len = prompt.len(), "Preparing DeepSeek API request");

        let body = CompletionBody {
            model: &self.config.model,
            messages: [
                ChatTurn {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatTurn {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                GenerationError::from(e)
            })?;

        let status = response.status();
        debug!(status = %status, "Received response from DeepSeek API");

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("DeepSeek API rate limit exceeded");
            return Err(GenerationError::RateLimited);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!(status = %status, "DeepSeek API authentication failed");
            return Err(GenerationError::Unauthorized);
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %body, "DeepSeek API error");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Completion = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse DeepSeek response JSON");
            GenerationError::Decode(e.to_string())
        })?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                error!("No reply content in DeepSeek response");
                GenerationError::Decode("no reply content in response".to_string())
            })?;

        debug!(reply_len = reply.len(), "Extracting questions from model reply");
        let set = parse_reply(&reply)?;
        let result = validate_questions(set.questions, request.question_count);
        match &result {
            Ok(questions) => info!(questions = questions.len(), "Generated questions with DeepSeek"),
            Err(e) => error!(error = %e, "DeepSeek returned malformed questions"),
        }
        result
    }

    fn name(&self) -> &'static str {
        "deepseek"
    }
}
