use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::info;

use super::{validate_questions, GenerationRequest, QuestionSource, RawQuestion};
use crate::error::GenerationError;
use crate::model::Question;

/// Local synthetic questions, used when no real source is configured.
#[derive(Debug)]
pub struct DemoSource {
    rng: Mutex<StdRng>,
}

impl Default for DemoSource {
    fn default() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl DemoSource {
    /// Demo source with a reproducible choice of correct answers.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl QuestionSource for DemoSource {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GenerationError> {
        let count = request.question_count.get();
        let raw: Vec<RawQuestion> = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            (1..=count)
                .map(|n| RawQuestion {
                    id: Some(format!("q-{}", n)),
                    question: format!(
                        "Sample Question {}: Based on your syllabus content, what is the correct answer?",
                        n
                    ),
                    options: ['A', 'B', 'C', 'D']
                        .iter()
                        .map(|letter| format!("Option {} for question {}", letter, n))
                        .collect(),
                    correct_answer: rng.gen_range(0..4),
                })
                .collect()
        };

        info!(ticket = request.ticket, count, "Generated demo questions");
        validate_questions(raw, request.question_count)
    }

    fn name(&self) -> &'static str {
        "demo"
    }
}
