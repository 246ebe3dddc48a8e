
use async_trait::async_trait;
use chrono::{Duration, Utc};
use syllabus_quiz::error::{ExtractionError, GenerationError, QuizError};
use syllabus_quiz::model::{OptionIndex, Question, QuestionCount, QuizSettings};
use syllabus_quiz::session::{Phase, QuizSession};
use syllabus_quiz::sources::{
    validate_questions, GenerationRequest, QuestionSource, RawQuestion, ScriptedSource,
};

use crate::test_utils::{
    answer_in_session, approx_eq, configured_session, primed_source, questions, raw_questions,
    started_session, SYLLABUS_TEXT,
};

#[test]
fn new_session_waits_for_upload() {
    let session = QuizSession::new();
    assert_eq!(session.phase(), Phase::Upload);
    assert!(session.syllabus().is_none());
    assert!(session.questions().is_empty());
    assert!(session.result().is_none());
    assert_eq!(session.settings(), &QuizSettings::default());
}

#[tokio::test]
async fn upload_moves_to_configuring() {
    let mut session = QuizSession::new();
    session
        .upload_document("notes.md", SYLLABUS_TEXT.as_bytes())
        .await
        .unwrap();

    assert_eq!(session.phase(), Phase::Configuring);
    let syllabus = session.syllabus().unwrap();
    assert_eq!(syllabus.name, "notes.md");
    assert_eq!(syllabus.text, SYLLABUS_TEXT);
}

#[tokio::test]
async fn failed_extraction_stays_in_upload() {
    let mut session = QuizSession::new();

    let err = session
        .upload_document("notes.txt", &[0xffu8, 0xfe, 0x00][..])
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::Extraction(ExtractionError::NotUtf8(_))));
    assert_eq!(session.phase(), Phase::Upload);

    let err = session
        .upload_document("slides.pptx", SYLLABUS_TEXT.as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::Extraction(ExtractionError::UnsupportedType(_))));

    let err = session.upload_document("blank.txt", "  \n ".as_bytes()).await.unwrap_err();
    assert!(matches!(err, QuizError::Extraction(ExtractionError::Empty)));
    assert_eq!(session.phase(), Phase::Upload);

    // retry with a readable document
    session
        .upload_document("notes.txt", SYLLABUS_TEXT.as_bytes())
        .await
        .unwrap();
    assert_eq!(session.phase(), Phase::Configuring);
}

#[tokio::test]
async fn upload_file_reads_from_disk() {
    let path = std::env::temp_dir().join(format!("syllabus-quiz-{}.txt", std::process::id()));
    tokio::fs::write(&path, SYLLABUS_TEXT).await.unwrap();

    let mut session = QuizSession::new();
    session.upload_file(&path).await.unwrap();
    assert_eq!(session.syllabus().unwrap().text, SYLLABUS_TEXT);

    tokio::fs::remove_file(&path).await.unwrap();

    let mut session = QuizSession::new();
    let err = session.upload_file(&path).await.unwrap_err();
    assert!(matches!(err, QuizError::Extraction(ExtractionError::Io(_))));
}

#[test]
fn settings_change_only_while_configuring() {
    let mut session = QuizSession::new();
    let err = session.select_question_count(QuestionCount::Thirty).unwrap_err();
    assert!(matches!(err, QuizError::WrongPhase { phase: Phase::Upload, .. }));

    let mut session = configured_session(QuestionCount::Fifteen);
    session.select_question_count(QuestionCount::Thirty).unwrap();
    assert_eq!(session.settings().question_count, QuestionCount::Thirty);

    let custom = QuizSettings::new(QuestionCount::Twenty, 2.0, 0.5).unwrap();
    session.update_settings(custom).unwrap();
    assert_eq!(session.settings(), &custom);

    let bad = QuizSettings {
        marks_per_question: 0.0,
        ..custom
    };
    assert!(matches!(session.update_settings(bad), Err(QuizError::InvalidSettings(_))));
    assert_eq!(session.settings(), &custom);
}

#[test]
fn back_returns_to_upload_keeping_settings() {
    let mut session = configured_session(QuestionCount::Twenty);
    session.back().unwrap();

    assert_eq!(session.phase(), Phase::Upload);
    assert_eq!(session.settings().question_count, QuestionCount::Twenty);
    assert_eq!(session.syllabus().unwrap().name, "biology.txt");

    assert!(matches!(session.back(), Err(QuizError::WrongPhase { .. })));
}

#[tokio::test]
async fn start_generates_requested_questions() {
    let mut session = configured_session(QuestionCount::Twenty);
    let (source, handle) = primed_source(QuestionCount::Twenty);

    let before = Utc::now();
    session.start(&source).await.unwrap();

    assert_eq!(session.phase(), Phase::InProgress);
    assert_eq!(session.questions().len(), 20);
    assert!(session.questions().iter().all(|q| q.user_answer.is_none()));
    assert_eq!(session.current_index(), Some(0));
    assert!(session.started_at().unwrap() >= before);

    assert_eq!(handle.calls(), 1);
    let request = handle.last_request().unwrap();
    assert_eq!(request.syllabus, SYLLABUS_TEXT);
    assert_eq!(request.question_count, QuestionCount::Twenty);
}

#[tokio::test]
async fn generation_failure_returns_to_configuring() {
    let mut session = configured_session(QuestionCount::Fifteen);
    let (source, handle) = ScriptedSource::new();
    handle.push_failure(GenerationError::Status {
        status: 500,
        body: "boom".to_string(),
    });
    handle.push_questions(raw_questions(15));

    let err = session.start(&source).await.unwrap_err();
    assert!(matches!(err, QuizError::Generation(GenerationError::Status { status: 500, .. })));
    assert_eq!(session.phase(), Phase::Configuring);
    assert!(session.questions().is_empty());

    // retry by starting again
    session.start(&source).await.unwrap();
    assert_eq!(session.phase(), Phase::InProgress);
    assert_eq!(handle.calls(), 2);
}

#[tokio::test]
async fn malformed_questions_are_a_generation_failure() {
    let mut session = configured_session(QuestionCount::Fifteen);
    let mut raw = raw_questions(15);
    raw[4].options.pop();
    let (source, handle) = ScriptedSource::new();
    handle.push_questions(raw);

    let err = session.start(&source).await.unwrap_err();
    assert!(matches!(err, QuizError::Generation(GenerationError::Malformed(_))));
    assert_eq!(session.phase(), Phase::Configuring);
}

#[test]
fn wrong_question_count_is_rejected_on_completion() {
    let mut session = configured_session(QuestionCount::Fifteen);
    let request = session.begin_generation().unwrap();

    let err = session
        .complete_generation(request.ticket, Ok(questions(20)))
        .unwrap_err();
    assert!(matches!(err, QuizError::Generation(GenerationError::Malformed(_))));
    assert_eq!(session.phase(), Phase::Configuring);
}

#[test]
fn pending_generation_rejects_other_events() {
    let mut session = configured_session(QuestionCount::Fifteen);
    let request = session.begin_generation().unwrap();
    assert!(session.is_busy());
    assert_eq!(session.phase(), Phase::Generating);

    assert!(matches!(session.select_question_count(QuestionCount::Thirty), Err(QuizError::Busy)));
    assert!(matches!(session.update_settings(QuizSettings::default()), Err(QuizError::Busy)));
    assert!(matches!(session.back(), Err(QuizError::Busy)));
    assert!(matches!(session.begin_generation(), Err(QuizError::Busy)));
    assert!(matches!(session.start_over(), Err(QuizError::Busy)));
    assert!(matches!(session.answer(OptionIndex::A), Err(QuizError::Busy)));
    assert_eq!(session.settings().question_count, QuestionCount::Fifteen);

    let stale = request.ticket + 1;
    assert!(matches!(
        session.complete_generation(stale, Ok(questions(15))),
        Err(QuizError::StaleGeneration(t)) if t == stale
    ));
    assert!(session.is_busy());

    session.complete_generation(request.ticket, Ok(questions(15))).unwrap();
    assert_eq!(session.phase(), Phase::InProgress);
}

#[test]
fn completion_without_pending_request_is_stale() {
    let mut session = configured_session(QuestionCount::Fifteen);
    assert!(matches!(
        session.complete_generation(1, Ok(questions(15))),
        Err(QuizError::StaleGeneration(1))
    ));
    assert_eq!(session.phase(), Phase::Configuring);
}

/// A source that never answers within a test's patience.
#[derive(Debug)]
struct StalledSource;

#[async_trait]
impl QuestionSource for StalledSource {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Vec<Question>, GenerationError> {
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        Err(GenerationError::Timeout)
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

#[tokio::test]
async fn caller_timeout_returns_session_to_configuring() {
    let mut session = configured_session(QuestionCount::Twenty);

    let elapsed = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        session.start(&StalledSource),
    )
    .await;
    assert!(elapsed.is_err());

    assert_eq!(session.phase(), Phase::Configuring);
    assert!(!session.is_busy());
    assert_eq!(session.syllabus().unwrap().text, SYLLABUS_TEXT);
    assert_eq!(session.settings().question_count, QuestionCount::Twenty);

    // the session is usable again
    let (source, _handle) = primed_source(QuestionCount::Twenty);
    session.start(&source).await.unwrap();
    assert_eq!(session.phase(), Phase::InProgress);
}

#[test]
fn abandoned_generation_rejects_its_late_completion() {
    let mut session = configured_session(QuestionCount::Fifteen);
    let request = session.begin_generation().unwrap();

    assert!(matches!(
        session.abandon_generation(request.ticket + 1),
        Err(QuizError::StaleGeneration(_))
    ));
    assert!(session.is_busy());

    session.abandon_generation(request.ticket).unwrap();
    assert_eq!(session.phase(), Phase::Configuring);
    session.back().unwrap();
    assert_eq!(session.phase(), Phase::Upload);

    assert!(matches!(
        session.complete_generation(request.ticket, Ok(questions(15))),
        Err(QuizError::StaleGeneration(_))
    ));
    assert_eq!(session.phase(), Phase::Upload);
}

#[test]
fn prefilled_answers_are_cleared_when_quiz_starts() {
    let mut session = configured_session(QuestionCount::Fifteen);
    let request = session.begin_generation().unwrap();
    let mut qs = questions(15);
    qs[3].user_answer = Some(OptionIndex::B);

    session.complete_generation(request.ticket, Ok(qs)).unwrap();
    assert!(session.questions().iter().all(|q| q.user_answer.is_none()));
}

#[tokio::test]
async fn navigation_stays_within_bounds() {
    let mut session = started_session(QuestionCount::Fifteen).await;

    session.previous().unwrap();
    assert_eq!(session.current_index(), Some(0));

    session.next().unwrap();
    session.next().unwrap();
    assert_eq!(session.current_index(), Some(2));

    session.jump_to(14).unwrap();
    assert!(session.active().unwrap().is_last());
    session.next().unwrap();
    assert_eq!(session.current_index(), Some(14));

    let err = session.jump_to(15).unwrap_err();
    assert!(matches!(err, QuizError::QuestionOutOfRange { index: 15, len: 15 }));
    assert_eq!(session.current_index(), Some(14));

    session.previous().unwrap();
    assert_eq!(session.current_index(), Some(13));
}

#[tokio::test]
async fn answers_can_be_overwritten() {
    let mut session = started_session(QuestionCount::Fifteen).await;

    session.answer(OptionIndex::A).unwrap();
    session.answer(OptionIndex::C).unwrap();
    assert_eq!(session.current_question().unwrap().user_answer, Some(OptionIndex::C));
    assert_eq!(session.active().unwrap().answered_count(), 1);

    session.next().unwrap();
    assert_eq!(session.current_question().unwrap().user_answer, None);
    session.previous().unwrap();
    assert_eq!(session.current_question().unwrap().user_answer, Some(OptionIndex::C));
}

#[tokio::test]
async fn submit_scores_and_freezes() {
    let mut session = started_session(QuestionCount::Fifteen).await;
    answer_in_session(&mut session, 10, 3);
    let started = session.started_at().unwrap();

    let result = session.submit_at(started + Duration::seconds(125)).unwrap().clone();
    assert_eq!(session.phase(), Phase::Scored);
    assert_eq!(result.correct, 10);
    assert_eq!(result.wrong, 3);
    assert_eq!(result.skipped, 2);
    assert!(approx_eq(result.obtained_marks, 9.25));
    assert!(approx_eq(result.percentage, 61.67));
    assert_eq!(result.time_taken_secs, 125);
    assert_eq!(session.questions(), result.questions.as_slice());

    assert!(matches!(session.answer(OptionIndex::A), Err(QuizError::WrongPhase { .. })));
    assert!(matches!(session.next(), Err(QuizError::WrongPhase { .. })));
    assert!(matches!(session.submit(), Err(QuizError::WrongPhase { .. })));
    assert_eq!(session.result(), Some(&result));
}

#[test]
fn submitting_before_start_clock_takes_zero_seconds() {
    let mut session = configured_session(QuestionCount::Fifteen);
    let request = session.begin_generation().unwrap();
    let now = Utc::now();
    session
        .complete_generation_at(request.ticket, Ok(questions(15)), now)
        .unwrap();

    let result = session.submit_at(now - Duration::seconds(3)).unwrap();
    assert_eq!(result.time_taken_secs, 0);
}

#[tokio::test]
async fn restart_resets_everything_but_settings() {
    let mut session = started_session(QuestionCount::Twenty).await;
    assert!(matches!(session.restart(), Err(QuizError::WrongPhase { .. })));
    session.submit().unwrap();

    session.restart().unwrap();
    assert_eq!(session.phase(), Phase::Upload);
    assert!(session.syllabus().is_none());
    assert!(session.questions().is_empty());
    assert!(session.current_index().is_none());
    assert!(session.result().is_none());
    assert_eq!(session.settings().question_count, QuestionCount::Twenty);
}

#[tokio::test]
async fn start_over_abandons_a_running_quiz() {
    let mut session = started_session(QuestionCount::Fifteen).await;
    session.answer(OptionIndex::B).unwrap();

    session.start_over().unwrap();
    assert_eq!(session.phase(), Phase::Upload);
    assert!(session.questions().is_empty());
    assert!(session.syllabus().is_none());

    session
        .upload_document("again.txt", SYLLABUS_TEXT.as_bytes())
        .await
        .unwrap();
    assert_eq!(session.phase(), Phase::Configuring);
}

#[test]
fn validated_questions_feed_the_session() {
    let mut session = configured_session(QuestionCount::Fifteen);
    let request = session.begin_generation().unwrap();
    let raw: Vec<RawQuestion> = raw_questions(15);
    let qs = validate_questions(raw, request.question_count).unwrap();

    session.complete_generation(request.ticket, Ok(qs)).unwrap();
    let current = session.current_question().unwrap();
    assert_eq!(current.id, "q-1");
    assert_eq!(current.correct, OptionIndex::A);
}

#[test]
fn failure_notice_is_user_facing() {
    let err = QuizError::from(GenerationError::RateLimited);
    assert!(err.notice().starts_with("Error generating questions"));
    let err = QuizError::from(ExtractionError::Empty);
    assert!(err.notice().starts_with("Error reading file"));
}
