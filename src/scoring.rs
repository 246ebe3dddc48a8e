//! Scoring of a submitted quiz.
//!
//! `QuizResult::compute` is a pure fold over the frozen question list: the same
//! questions, settings and timestamps always produce the same result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Question, QuestionOutcome, QuizSettings};

/// Correct/wrong/skipped counts over a question list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub correct: usize,
    pub wrong: usize,
    pub skipped: usize,
}

impl Tally {
    pub fn of(questions: &[Question]) -> Self {
        questions.iter().fold(Self::default(), |mut tally, q| {
            match q.outcome() {
                QuestionOutcome::Correct => tally.correct += 1,
                QuestionOutcome::Wrong => tally.wrong += 1,
                QuestionOutcome::Skipped => tally.skipped += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> usize {
        self.correct + self.wrong + self.skipped
    }

    pub fn attempted(&self) -> usize {
        self.correct + self.wrong
    }
}

/// Immutable snapshot produced when a quiz is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub total_questions: usize,
    pub attempted: usize,
    pub correct: usize,
    pub wrong: usize,
    pub skipped: usize,
    pub total_marks: f64,
    pub obtained_marks: f64,
    pub percentage: f64,
    #[serde(rename = "timeTaken")]
    pub time_taken_secs: u64,
    pub questions: Vec<Question>,
}

impl QuizResult {
    pub fn compute(
        questions: Vec<Question>,
        settings: &QuizSettings,
        started_at: DateTime<Utc>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let tally = Tally::of(&questions);
        let total_marks = questions.len() as f64 * settings.marks_per_question;
        let raw = tally.correct as f64 * settings.marks_per_question
            - tally.wrong as f64 * settings.negative_per_wrong;
        let obtained_marks = raw.max(0.0);
        let percentage = if total_marks > 0.0 {
            (obtained_marks / total_marks * 100.0).max(0.0)
        } else {
            0.0
        };

        Self {
            total_questions: questions.len(),
            attempted: tally.attempted(),
            correct: tally.correct,
            wrong: tally.wrong,
            skipped: tally.skipped,
            total_marks,
            obtained_marks,
            percentage,
            time_taken_secs: elapsed_secs(started_at, submitted_at),
            questions,
        }
    }

    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.percentage)
    }
}

/// Whole seconds between two instants, floored and never negative.
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    let millis = (to - from).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis / 1000) as u64
    }
}

/// Renders a duration as `"{minutes}m {seconds}s"`.
pub fn format_duration(secs: u64) -> String {
    format!("{}m {}s", secs / 60, secs % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 90.0 => Self::APlus,
            p if p >= 80.0 => Self::A,
            p if p >= 70.0 => Self::B,
            p if p >= 60.0 => Self::C,
            p if p >= 50.0 => Self::D,
            _ => Self::F,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::APlus => "Outstanding!",
            Self::A => "Excellent!",
            Self::B => "Good Job!",
            Self::C => "Keep Practicing!",
            Self::D => "Needs Improvement",
            Self::F => "Try Again!",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn elapsed_is_floored_and_clamped() {
        let start = Utc::now();
        assert_eq!(elapsed_secs(start, start + Duration::milliseconds(1999)), 1);
        assert_eq!(elapsed_secs(start, start + Duration::seconds(75)), 75);
        assert_eq!(elapsed_secs(start, start - Duration::seconds(5)), 0);
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "0m 0s");
        assert_eq!(format_duration(125), "2m 5s");
    }

    #[test]
    fn grade_bands() {
        assert_eq!(Grade::from_percentage(95.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(90.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(79.17), Grade::B);
        assert_eq!(Grade::from_percentage(61.67), Grade::C);
        assert_eq!(Grade::from_percentage(50.0), Grade::D);
        assert_eq!(Grade::from_percentage(0.0), Grade::F);
        assert_eq!(Grade::APlus.to_string(), "A+");
    }
}
