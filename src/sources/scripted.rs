use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{validate_questions, GenerationRequest, QuestionSource, RawQuestion};
use crate::error::GenerationError;
use crate::model::Question;

/// A canned answer for one `generate` call.
#[derive(Debug)]
pub enum ScriptedResponse {
    Questions(Vec<RawQuestion>),
    Failure(GenerationError),
}

/// Shared control over a [`ScriptedSource`].
#[derive(Debug, Default)]
pub struct ScriptedHandle {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl ScriptedHandle {
    pub fn push(&self, response: ScriptedResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
    }

    pub fn push_questions(&self, questions: Vec<RawQuestion>) {
        self.push(ScriptedResponse::Questions(questions));
    }

    pub fn push_failure(&self, error: GenerationError) {
        self.push(ScriptedResponse::Failure(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn next(&self) -> Option<ScriptedResponse> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

/// Source that replays queued responses, for tests and offline runs.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    handle: Arc<ScriptedHandle>,
}

impl ScriptedSource {
    pub fn new() -> (Self, Arc<ScriptedHandle>) {
        let handle = Arc::new(ScriptedHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    pub fn with_responses(responses: Vec<ScriptedResponse>) -> (Self, Arc<ScriptedHandle>) {
        let (source, handle) = Self::new();
        for response in responses {
            handle.push(response);
        }
        (source, handle)
    }
}

#[async_trait]
impl QuestionSource for ScriptedSource {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GenerationError> {
        let call = self.handle.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .handle
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());
        debug!(call, ticket = request.ticket, "Scripted source called");

        match self.handle.next() {
            Some(ScriptedResponse::Questions(raw)) => validate_questions(raw, request.question_count),
            Some(ScriptedResponse::Failure(e)) => Err(e),
            None => Err(GenerationError::Unconfigured("no scripted responses left".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
