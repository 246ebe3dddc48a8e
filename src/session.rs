//! The quiz session state machine.
//!
//! A session moves Upload → Configuring → Generating → InProgress → Scored and
//! back to Upload on restart. Each phase carries only the data that exists in
//! it, and every event is a `&mut self` method that checks the phase first. An
//! event that does not apply leaves the session untouched and returns an error.
//!
//! While a generation request is outstanding the session is `Generating` and
//! rejects every other event with [`QuizError::Busy`].

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncRead;
use tracing::{info, instrument, warn};

use crate::error::{GenerationError, QuizError};
use crate::extract;
use crate::model::{OptionIndex, Question, QuestionCount, QuizSettings, Syllabus};
use crate::scoring::QuizResult;
use crate::sources::{GenerationRequest, QuestionSource};

/// Coarse position in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Upload,
    Configuring,
    Generating,
    InProgress,
    Scored,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Upload => "waiting for upload",
            Phase::Configuring => "configuring",
            Phase::Generating => "generating questions",
            Phase::InProgress => "quiz in progress",
            Phase::Scored => "scored",
        };
        write!(f, "{}", s)
    }
}

/// A quiz being answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveQuiz {
    syllabus: Syllabus,
    questions: Vec<Question>,
    current: usize,
    started_at: DateTime<Utc>,
}

impl ActiveQuiz {
    pub fn syllabus(&self) -> &Syllabus {
        &self.syllabus
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_answered()).count()
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.questions.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Waiting for a document. `previous` is the last accepted document, kept
    /// for display after going back from configuration.
    Upload { previous: Option<Syllabus> },
    Configuring { syllabus: Syllabus },
    Generating { syllabus: Syllabus, ticket: u64 },
    InProgress(ActiveQuiz),
    Scored { syllabus: Syllabus, result: QuizResult },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Upload { previous: None }
    }
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Upload { .. } => Phase::Upload,
            SessionState::Configuring { .. } => Phase::Configuring,
            SessionState::Generating { .. } => Phase::Generating,
            SessionState::InProgress(_) => Phase::InProgress,
            SessionState::Scored { .. } => Phase::Scored,
        }
    }
}

/// One user's pass through upload, configuration, answering and scoring.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    settings: QuizSettings,
    state: SessionState,
    last_ticket: u64,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: QuizSettings) -> Result<Self, QuizError> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn is_busy(&self) -> bool {
        self.phase() == Phase::Generating
    }

    /// The current document, if the session holds one.
    pub fn syllabus(&self) -> Option<&Syllabus> {
        match &self.state {
            SessionState::Upload { previous } => previous.as_ref(),
            SessionState::Configuring { syllabus }
            | SessionState::Generating { syllabus, .. }
            | SessionState::Scored { syllabus, .. } => Some(syllabus),
            SessionState::InProgress(quiz) => Some(&quiz.syllabus),
        }
    }

    pub fn active(&self) -> Option<&ActiveQuiz> {
        match &self.state {
            SessionState::InProgress(quiz) => Some(quiz),
            _ => None,
        }
    }

    /// Questions of the running quiz, or the frozen list once scored.
    pub fn questions(&self) -> &[Question] {
        match &self.state {
            SessionState::InProgress(quiz) => &quiz.questions,
            SessionState::Scored { result, .. } => &result.questions,
            _ => &[],
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        self.active().map(ActiveQuiz::current_index)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.active().map(ActiveQuiz::current_question)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.active().map(ActiveQuiz::started_at)
    }

    pub fn result(&self) -> Option<&QuizResult> {
        match &self.state {
            SessionState::Scored { result, .. } => Some(result),
            _ => None,
        }
    }

    fn reject(&self, event: &'static str) -> QuizError {
        let phase = self.phase();
        warn!(event, %phase, "Rejected session event");
        if phase == Phase::Generating {
            QuizError::Busy
        } else {
            QuizError::WrongPhase { event, phase }
        }
    }

    // ---- Upload ---------------------------------------------------------

    /// Accept an already extracted document.
    pub fn accept_syllabus(&mut self, syllabus: Syllabus) -> Result<(), QuizError> {
        if self.phase() != Phase::Upload {
            return Err(self.reject("upload a document"));
        }
        info!(document = %syllabus.name, "Syllabus uploaded");
        self.state = SessionState::Configuring { syllabus };
        Ok(())
    }

    /// Extract text from `reader` and move to configuration.
    ///
    /// On extraction failure the session stays in Upload.
    pub async fn upload_document<R>(&mut self, name: &str, reader: R) -> Result<(), QuizError>
    where
        R: AsyncRead + Unpin,
    {
        if self.phase() != Phase::Upload {
            return Err(self.reject("upload a document"));
        }
        let syllabus = extract::extract_text(name, reader).await?;
        self.accept_syllabus(syllabus)
    }

    pub async fn upload_file(&mut self, path: impl AsRef<Path>) -> Result<(), QuizError> {
        if self.phase() != Phase::Upload {
            return Err(self.reject("upload a document"));
        }
        let syllabus = extract::extract_file(path).await?;
        self.accept_syllabus(syllabus)
    }

    // ---- Configuring ----------------------------------------------------

    pub fn select_question_count(&mut self, count: QuestionCount) -> Result<(), QuizError> {
        if self.phase() != Phase::Configuring {
            return Err(self.reject("change the question count"));
        }
        self.settings.question_count = count;
        info!(count = count.get(), "Question count selected");
        Ok(())
    }

    pub fn update_settings(&mut self, settings: QuizSettings) -> Result<(), QuizError> {
        if self.phase() != Phase::Configuring {
            return Err(self.reject("change settings"));
        }
        settings.validate()?;
        self.settings = settings;
        info!(?settings, "Settings updated");
        Ok(())
    }

    /// Return to Upload, keeping the settings.
    pub fn back(&mut self) -> Result<(), QuizError> {
        match std::mem::take(&mut self.state) {
            SessionState::Configuring { syllabus } => {
                info!("Back to upload");
                self.state = SessionState::Upload {
                    previous: Some(syllabus),
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.reject("go back"))
            }
        }
    }

    /// Enter `Generating` and hand out the request to fulfil.
    pub fn begin_generation(&mut self) -> Result<GenerationRequest, QuizError> {
        match std::mem::take(&mut self.state) {
            SessionState::Configuring { syllabus } => {
                self.last_ticket += 1;
                let request = GenerationRequest {
                    ticket: self.last_ticket,
                    syllabus: syllabus.text.clone(),
                    question_count: self.settings.question_count,
                };
                info!(ticket = request.ticket, count = request.question_count.get(), "Question generation started");
                self.state = SessionState::Generating {
                    syllabus,
                    ticket: request.ticket,
                };
                Ok(request)
            }
            other => {
                self.state = other;
                Err(self.reject("start the quiz"))
            }
        }
    }

    /// Resolve the outstanding request, starting the quiz clock at `now`.
    pub fn complete_generation_at(
        &mut self,
        ticket: u64,
        outcome: Result<Vec<Question>, GenerationError>,
        now: DateTime<Utc>,
    ) -> Result<(), QuizError> {
        let syllabus = match std::mem::take(&mut self.state) {
            SessionState::Generating { syllabus, ticket: pending } if pending == ticket => syllabus,
            other @ SessionState::Generating { .. } => {
                self.state = other;
                warn!(ticket, "Ignoring completion for a stale generation request");
                return Err(QuizError::StaleGeneration(ticket));
            }
            other => {
                self.state = other;
                warn!(ticket, "Ignoring generation completion with nothing outstanding");
                return Err(QuizError::StaleGeneration(ticket));
            }
        };

        let expected = self.settings.question_count.get();
        let outcome = outcome.and_then(|questions| {
            if questions.len() == expected {
                Ok(questions)
            } else {
                Err(GenerationError::Malformed(format!(
                    "expected {} questions, got {}",
                    expected,
                    questions.len()
                )))
            }
        });

        match outcome {
            Ok(mut questions) => {
                for question in &mut questions {
                    question.user_answer = None;
                }
                info!(ticket, questions = questions.len(), "Quiz started");
                self.state = SessionState::InProgress(ActiveQuiz {
                    syllabus,
                    questions,
                    current: 0,
                    started_at: now,
                });
                Ok(())
            }
            Err(e) => {
                warn!(ticket, error = %e, "Question generation failed");
                self.state = SessionState::Configuring { syllabus };
                Err(e.into())
            }
        }
    }

    pub fn complete_generation(
        &mut self,
        ticket: u64,
        outcome: Result<Vec<Question>, GenerationError>,
    ) -> Result<(), QuizError> {
        self.complete_generation_at(ticket, outcome, Utc::now())
    }

    /// Drop the outstanding request and go back to Configuring.
    ///
    /// Any later completion for `ticket` is rejected as stale.
    pub fn abandon_generation(&mut self, ticket: u64) -> Result<(), QuizError> {
        match std::mem::take(&mut self.state) {
            SessionState::Generating { syllabus, ticket: pending } if pending == ticket => {
                info!(ticket, "Question generation abandoned");
                self.state = SessionState::Configuring { syllabus };
                Ok(())
            }
            other => {
                self.state = other;
                Err(QuizError::StaleGeneration(ticket))
            }
        }
    }

    /// Generate questions from `source` and start the quiz.
    ///
    /// On failure the session is back in Configuring with the same settings.
    /// The same holds if the returned future is dropped before it finishes,
    /// e.g. when the caller wraps it in `tokio::time::timeout`.
    #[instrument(skip(self, source), fields(source = source.name()))]
    pub async fn start<S>(&mut self, source: &S) -> Result<(), QuizError>
    where
        S: QuestionSource + ?Sized,
    {
        let request = self.begin_generation()?;
        let pending = PendingGeneration {
            session: self,
            ticket: request.ticket,
            done: false,
        };
        let outcome = source.generate(&request).await;
        pending.complete(outcome)
    }

    // ---- InProgress -----------------------------------------------------

    fn active_mut(&mut self, event: &'static str) -> Result<&mut ActiveQuiz, QuizError> {
        if self.phase() != Phase::InProgress {
            return Err(self.reject(event));
        }
        match &mut self.state {
            SessionState::InProgress(quiz) => Ok(quiz),
            _ => unreachable!("phase checked above"),
        }
    }

    /// Record `option` as the answer to the current question, replacing any
    /// earlier answer.
    pub fn answer(&mut self, option: OptionIndex) -> Result<(), QuizError> {
        let quiz = self.active_mut("answer")?;
        let index = quiz.current;
        quiz.questions[index].user_answer = Some(option);
        Ok(())
    }

    /// Move to the next question; a no-op on the last one.
    pub fn next(&mut self) -> Result<(), QuizError> {
        let quiz = self.active_mut("move to the next question")?;
        if quiz.current + 1 < quiz.questions.len() {
            quiz.current += 1;
        }
        Ok(())
    }

    /// Move to the previous question; a no-op on the first one.
    pub fn previous(&mut self) -> Result<(), QuizError> {
        let quiz = self.active_mut("move to the previous question")?;
        quiz.current = quiz.current.saturating_sub(1);
        Ok(())
    }

    pub fn jump_to(&mut self, index: usize) -> Result<(), QuizError> {
        let quiz = self.active_mut("jump to a question")?;
        let len = quiz.questions.len();
        if index >= len {
            warn!(index, len, "Jump target out of range");
            return Err(QuizError::QuestionOutOfRange { index, len });
        }
        quiz.current = index;
        Ok(())
    }

    /// Score the quiz as of `now`.
    pub fn submit_at(&mut self, now: DateTime<Utc>) -> Result<&QuizResult, QuizError> {
        if self.phase() != Phase::InProgress {
            return Err(self.reject("submit"));
        }
        let SessionState::InProgress(quiz) = std::mem::take(&mut self.state) else {
            unreachable!("phase checked above")
        };

        let result = QuizResult::compute(quiz.questions, &self.settings, quiz.started_at, now);
        info!(
            correct = result.correct,
            wrong = result.wrong,
            skipped = result.skipped,
            obtained = result.obtained_marks,
            percentage = result.percentage,
            "Quiz submitted"
        );
        self.state = SessionState::Scored {
            syllabus: quiz.syllabus,
            result,
        };
        match &self.state {
            SessionState::Scored { result, .. } => Ok(result),
            _ => unreachable!("state set above"),
        }
    }

    pub fn submit(&mut self) -> Result<&QuizResult, QuizError> {
        self.submit_at(Utc::now())
    }

    // ---- Reset ----------------------------------------------------------

    /// Leave the result screen for a fresh upload. Settings are kept.
    pub fn restart(&mut self) -> Result<(), QuizError> {
        if self.phase() != Phase::Scored {
            return Err(self.reject("restart"));
        }
        self.reset();
        Ok(())
    }

    /// Abandon the session from any phase except while generating.
    pub fn start_over(&mut self) -> Result<(), QuizError> {
        if self.phase() == Phase::Generating {
            return Err(self.reject("start over"));
        }
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        info!(from = %self.phase(), "Session reset");
        self.state = SessionState::default();
    }
}

/// Owns the session while `start` awaits its source; abandons the request if
/// dropped before completion.
struct PendingGeneration<'a> {
    session: &'a mut QuizSession,
    ticket: u64,
    done: bool,
}

impl PendingGeneration<'_> {
    fn complete(mut self, outcome: Result<Vec<Question>, GenerationError>) -> Result<(), QuizError> {
        self.done = true;
        self.session.complete_generation(self.ticket, outcome)
    }
}

impl Drop for PendingGeneration<'_> {
    fn drop(&mut self) {
        if !self.done {
            warn!(ticket = self.ticket, "Generation cancelled before completion");
            let _ = self.session.abandon_generation(self.ticket);
        }
    }
}
