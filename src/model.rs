//! Quiz data types: questions, settings, and the uploaded syllabus.
//!
//! Structural invariants live in the types themselves. A `Question` always has
//! exactly four options, and every `OptionIndex` is in `0..=3`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QuizError;

/// Number of options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Index of one of the four options of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OptionIndex(u8);

impl OptionIndex {
    pub const A: OptionIndex = OptionIndex(0);
    pub const B: OptionIndex = OptionIndex(1);
    pub const C: OptionIndex = OptionIndex(2);
    pub const D: OptionIndex = OptionIndex(3);

    pub const ALL: [OptionIndex; OPTION_COUNT] = [Self::A, Self::B, Self::C, Self::D];

    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Letter shown next to the option, `A` through `D`.
    #[must_use]
    pub const fn label(self) -> char {
        (b'A' + self.0) as char
    }

    /// Parse a letter (`a`-`d`, case insensitive) or a 1-based digit (`1`-`4`).
    pub fn from_key(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'a' | '1' => Some(Self::A),
            'b' | '2' => Some(Self::B),
            'c' | '3' => Some(Self::C),
            'd' | '4' => Some(Self::D),
            _ => None,
        }
    }
}

impl TryFrom<u8> for OptionIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (value as usize) < OPTION_COUNT {
            Ok(Self(value))
        } else {
            Err(format!("option index {} outside 0..={}", value, OPTION_COUNT - 1))
        }
    }
}

impl TryFrom<usize> for OptionIndex {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| format!("option index {} outside 0..={}", value, OPTION_COUNT - 1))
            .and_then(Self::try_from)
    }
}

impl TryFrom<i64> for OptionIndex {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| format!("option index {} outside 0..={}", value, OPTION_COUNT - 1))
            .and_then(Self::try_from)
    }
}

impl From<OptionIndex> for u8 {
    fn from(value: OptionIndex) -> Self {
        value.0
    }
}

impl fmt::Display for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: [String; OPTION_COUNT],
    #[serde(rename = "correctAnswer")]
    pub correct: OptionIndex,
    #[serde(rename = "userAnswer", default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<OptionIndex>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct: OptionIndex,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            options,
            correct,
            user_answer: None,
        }
    }

    pub fn option(&self, index: OptionIndex) -> &str {
        &self.options[index.get()]
    }

    pub fn is_answered(&self) -> bool {
        self.user_answer.is_some()
    }

    pub fn outcome(&self) -> QuestionOutcome {
        match self.user_answer {
            None => QuestionOutcome::Skipped,
            Some(answer) if answer == self.correct => QuestionOutcome::Correct,
            Some(_) => QuestionOutcome::Wrong,
        }
    }
}

/// How a question ended up once the quiz was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionOutcome {
    Correct,
    Wrong,
    Skipped,
}

/// The three question-count tiers a quiz can be generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum QuestionCount {
    #[default]
    Fifteen,
    Twenty,
    Thirty,
}

impl QuestionCount {
    pub const ALL: [QuestionCount; 3] = [Self::Fifteen, Self::Twenty, Self::Thirty];

    #[must_use]
    pub const fn get(self) -> usize {
        match self {
            Self::Fifteen => 15,
            Self::Twenty => 20,
            Self::Thirty => 30,
        }
    }
}

impl TryFrom<usize> for QuestionCount {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            15 => Ok(Self::Fifteen),
            20 => Ok(Self::Twenty),
            30 => Ok(Self::Thirty),
            other => Err(format!("Unsupported question count: {}. Supported: 15, 20, 30", other)),
        }
    }
}

impl From<QuestionCount> for usize {
    fn from(value: QuestionCount) -> Self {
        value.get()
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Marking scheme and size of the quiz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSettings {
    pub question_count: QuestionCount,
    pub marks_per_question: f64,
    #[serde(rename = "negativeMarking")]
    pub negative_per_wrong: f64,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_count: QuestionCount::Fifteen,
            marks_per_question: 1.0,
            negative_per_wrong: 0.25,
        }
    }
}

impl QuizSettings {
    pub fn new(
        question_count: QuestionCount,
        marks_per_question: f64,
        negative_per_wrong: f64,
    ) -> Result<Self, QuizError> {
        let settings = Self {
            question_count,
            marks_per_question,
            negative_per_wrong,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), QuizError> {
        if !(self.marks_per_question.is_finite() && self.marks_per_question > 0.0) {
            return Err(QuizError::InvalidSettings(format!(
                "marks per question must be positive, got {}",
                self.marks_per_question
            )));
        }
        if !(self.negative_per_wrong.is_finite() && self.negative_per_wrong >= 0.0) {
            return Err(QuizError::InvalidSettings(format!(
                "negative marking must be non-negative, got {}",
                self.negative_per_wrong
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_question_count(mut self, question_count: QuestionCount) -> Self {
        self.question_count = question_count;
        self
    }

    /// Maximum marks obtainable with these settings.
    pub fn total_marks(&self) -> f64 {
        self.question_count.get() as f64 * self.marks_per_question
    }
}

/// Text extracted from an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syllabus {
    pub name: String,
    pub text: String,
}

impl Syllabus {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}
