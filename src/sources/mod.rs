//! Question sources: everything that can turn syllabus text into questions.
//!
//! Every source hands its raw output to [`validate_questions`], so the session
//! only ever sees question lists that satisfy the structural invariants.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;

use crate::error::GenerationError;
use crate::model::{OptionIndex, Question, QuestionCount, OPTION_COUNT};

pub mod demo;
#[cfg(feature = "deepseek")]
pub mod deepseek;
pub mod kind;
pub mod remote;
pub mod scripted;

pub use demo::DemoSource;
#[cfg(feature = "deepseek")]
pub use deepseek::{DeepSeekConfig, DeepSeekSource};
pub use kind::SourceKind;
pub use remote::{RemoteConfig, RemoteSource};
pub use scripted::{ScriptedHandle, ScriptedResponse, ScriptedSource};

/// A single outstanding request for questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Identifies the request within its session.
    pub ticket: u64,
    pub syllabus: String,
    pub question_count: QuestionCount,
}

/// Anything that can generate questions for a syllabus.
///
/// Implementations return exactly `request.question_count` validated questions
/// or a single `GenerationError`; partial results are never returned.
#[async_trait]
pub trait QuestionSource: Send + Sync + Debug {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GenerationError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl QuestionSource for Box<dyn QuestionSource> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GenerationError> {
        self.as_ref().generate(request).await
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
}

/// A question as a generator emits it, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[schemars(description = "A multiple-choice question about the syllabus")]
pub struct RawQuestion {
    /// Unique identifier; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The question text
    pub question: String,
    /// Exactly four answer options
    pub options: Vec<String>,
    /// Zero-based index of the correct option (0-3)
    pub correct_answer: i64,
}

/// Response body of a question generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Question Set", description = "Generated quiz questions")]
pub struct QuestionSet {
    pub questions: Vec<RawQuestion>,
}

/// Check raw generator output against the question contract.
///
/// Rejects a wrong number of questions, option counts other than four, correct
/// indices outside `0..=3`, empty prompts and duplicate ids. Missing ids become
/// `q-{n}` with `n` the 1-based position.
pub fn validate_questions(
    raw: Vec<RawQuestion>,
    expected: QuestionCount,
) -> Result<Vec<Question>, GenerationError> {
    if raw.len() != expected.get() {
        return Err(GenerationError::Malformed(format!(
            "expected {} questions, got {}",
            expected.get(),
            raw.len()
        )));
    }

    let mut seen = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .enumerate()
        .map(|(i, q)| {
            let position = i + 1;
            if q.question.trim().is_empty() {
                return Err(GenerationError::Malformed(format!(
                    "question {} has an empty prompt",
                    position
                )));
            }
            let options: [String; OPTION_COUNT] = q.options.try_into().map_err(|opts: Vec<String>| {
                GenerationError::Malformed(format!(
                    "question {} has {} options, expected {}",
                    position,
                    opts.len(),
                    OPTION_COUNT
                ))
            })?;
            let correct = OptionIndex::try_from(q.correct_answer)
                .map_err(|e| GenerationError::Malformed(format!("question {}: {}", position, e)))?;
            let id = q.id.unwrap_or_else(|| format!("q-{}", position));
            if !seen.insert(id.clone()) {
                return Err(GenerationError::Malformed(format!("duplicate question id '{}'", id)));
            }
            Ok(Question::new(id, q.question, options, correct))
        })
        .collect()
}
