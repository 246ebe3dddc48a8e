pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod scoring;
pub mod session;
pub mod sources;

// Convenient re-exports
pub use error::{ExtractionError, GenerationError, QuizError};
pub use model::{OptionIndex, Question, QuestionCount, QuizSettings, Syllabus};
pub use scoring::{Grade, QuizResult};
pub use session::{Phase, QuizSession};
pub use sources::{GenerationRequest, QuestionSource};
