//! Entry Quiz
//!
//! Crossword-style questions a new member must answer before using the board.

use std::collections::HashMap;

use kernel::error::app_error::AppResult;

use crate::application::privilege::verify_signed_in;
use crate::domain::entity::user::User;

/// A single quiz question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub id: usize,
    /// Number of characters in the answer, shown as a hint
    pub length: usize,
    pub question: String,
    pub answer: String,
}

/// The quiz presented to members who have not passed it yet
#[derive(Debug, Clone, Default)]
pub struct EntryQuiz {
    pub questions: Vec<QuizQuestion>,
}

impl EntryQuiz {
    /// Build the quiz from `(question, answer)` pairs, numbering them in order
    pub fn new<I, Q, A>(questions: I) -> Self
    where
        I: IntoIterator<Item = (Q, A)>,
        Q: Into<String>,
        A: Into<String>,
    {
        let questions = questions
            .into_iter()
            .enumerate()
            .map(|(id, (question, answer))| {
                let answer = answer.into();
                QuizQuestion {
                    id,
                    length: answer.chars().count(),
                    question: question.into(),
                    answer,
                }
            })
            .collect();
        Self { questions }
    }

    /// Check `answers` (question ID to response) against every question
    ///
    /// Comparison ignores case. A missing answer counts as wrong.
    pub fn verify_answers(&self, actor: &User, answers: &HashMap<usize, String>) -> AppResult<bool> {
        verify_signed_in(actor)?;

        let passed = self.questions.iter().all(|q| {
            answers
                .get(&q.id)
                .is_some_and(|answer| answer.to_lowercase() == q.answer.to_lowercase())
        });
        Ok(passed)
    }
}
