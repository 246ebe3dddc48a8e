use thiserror::Error;

use crate::session::Phase;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("Cannot {event} while {phase}")]
    WrongPhase { event: &'static str, phase: Phase },
    #[error("Question generation already in progress")]
    Busy,
    #[error("Generation ticket {0} is not the outstanding request")]
    StaleGeneration(u64),
    #[error("Question {index} out of range (quiz has {len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl QuizError {
    /// Short user-facing notice for the failure.
    pub fn notice(&self) -> &'static str {
        match self {
            QuizError::Extraction(_) => "Error reading file. Please try again with a valid text file.",
            QuizError::Generation(_) => "Error generating questions. Please check your question source configuration and try again.",
            QuizError::Busy => "Questions are still being generated.",
            _ => "That action is not available right now.",
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),
    #[error("Document is not valid UTF-8 text: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("Document contains no text")]
    Empty,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Question source returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Authentication failed")]
    Unauthorized,
    #[error("Could not decode response: {0}")]
    Decode(String),
    #[error("Malformed questions: {0}")]
    Malformed(String),
    #[error("Question source is not configured: {0}")]
    Unconfigured(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else if e.is_decode() {
            GenerationError::Decode(e.to_string())
        } else {
            GenerationError::Http(e.to_string())
        }
    }
}
