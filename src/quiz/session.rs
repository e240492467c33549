use chrono::{DateTime, Utc};
use log::{debug, info};

use super::scoring;
use super::{
    Answers, Feedback, QuizDefinition, QuizError, QuizQuestion, QuizScore, QuizStatus,
    ValidationError,
};

/// One attempt at a quiz: navigation, answers, feedback and completion.
///
/// Every operation runs to completion synchronously. A rejected operation
/// returns an error and leaves the session exactly as it was.
///
/// Deserializing checks the same invariants `new` and the operations keep,
/// so a session restored from storage always points at a real question.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "StoredSession")]
pub struct QuizSession {
    definition: QuizDefinition,
    status: QuizStatus,
    current_index: usize,
    answers: Answers,
    feedback: Feedback,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<QuizScore>,
}

/// Unchecked shape of a serialized `QuizSession`.
#[derive(serde::Deserialize)]
struct StoredSession {
    definition: QuizDefinition,
    status: QuizStatus,
    current_index: usize,
    answers: Answers,
    feedback: Feedback,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<QuizScore>,
}

impl TryFrom<StoredSession> for QuizSession {
    type Error = QuizError;

    fn try_from(stored: StoredSession) -> Result<Self, Self::Error> {
        if stored.definition.questions.is_empty() {
            return Err(QuizError::EmptyQuiz);
        }
        if stored.current_index >= stored.definition.questions.len() {
            return Err(QuizError::InconsistentSession {
                reason: "current question is outside the quiz",
            });
        }
        if (stored.status == QuizStatus::Completed) != stored.score.is_some() {
            return Err(QuizError::InconsistentSession {
                reason: "only a completed session has a score",
            });
        }
        Ok(Self {
            definition: stored.definition,
            status: stored.status,
            current_index: stored.current_index,
            answers: stored.answers,
            feedback: stored.feedback,
            started_at: stored.started_at,
            completed_at: stored.completed_at,
            score: stored.score,
        })
    }
}

/// What a finished session hands to whoever stores results.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompletionNotice {
    pub quiz_id: String,
    pub score: QuizScore,
    pub answers: Answers,
    /// Whole seconds between start and completion.
    pub time_spent: Option<u64>,
    pub completed_at: DateTime<Utc>,
}

/// Result of `submit`. `notice` is only present on the call that completed
/// the session; later calls get the stored score and no notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub score: QuizScore,
    pub notice: Option<CompletionNotice>,
}

impl QuizSession {
    pub fn new(definition: QuizDefinition) -> Result<Self, QuizError> {
        if definition.questions.is_empty() {
            return Err(QuizError::EmptyQuiz);
        }
        Ok(Self {
            definition,
            status: QuizStatus::NotStarted,
            current_index: 0,
            answers: Answers::new(),
            feedback: Feedback::default(),
            started_at: None,
            completed_at: None,
            score: None,
        })
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.definition.questions
    }

    pub fn status(&self) -> QuizStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &QuizQuestion {
        &self.definition.questions[self.current_index]
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Final score, once completed.
    pub fn score(&self) -> Option<QuizScore> {
        self.score
    }

    pub fn question_count(&self) -> usize {
        self.definition.questions.len()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 == self.question_count()
    }

    /// Submission requires every question answered and the last one displayed.
    pub fn can_submit(&self) -> bool {
        self.status == QuizStatus::InProgress
            && self.answered_count() == self.question_count()
            && self.is_last()
    }

    pub fn start(&mut self) -> Result<(), QuizError> {
        self.start_at(Utc::now())
    }

    pub fn start_at(&mut self, now: DateTime<Utc>) -> Result<(), QuizError> {
        self.require(QuizStatus::NotStarted, "start")?;
        self.status = QuizStatus::InProgress;
        self.current_index = 0;
        self.started_at = Some(now);
        debug!("Quiz {} started", self.definition.id);
        Ok(())
    }

    /// Records or replaces the answer for `question_id`. Does not move.
    pub fn answer(&mut self, question_id: &str, value: &str) -> Result<(), QuizError> {
        self.require(QuizStatus::InProgress, "answer")?;
        if self.definition.question(question_id).is_none() {
            return Err(ValidationError::UnknownQuestion {
                question_id: question_id.to_string(),
            }
            .into());
        }

        self.answers.insert(question_id.to_string(), value.to_string());
        // Feedback shown for the old answer would be stale now.
        if self.current_question().id == question_id {
            self.feedback = Feedback::default();
        }
        Ok(())
    }

    /// Shows whether the recorded answer to the displayed question is right.
    pub fn reveal_feedback(&mut self) -> Result<Feedback, QuizError> {
        self.require(QuizStatus::InProgress, "reveal_feedback")?;
        let question = self.current_question();
        let answer = self
            .answers
            .get(&question.id)
            .ok_or_else(|| ValidationError::NotAnswered {
                question_id: question.id.clone(),
            })?;
        let is_correct = question.is_correct(answer);

        self.feedback = Feedback {
            shown: true,
            is_correct,
        };
        Ok(self.feedback)
    }

    /// Moves forward; a no-op on the last question.
    pub fn next(&mut self) -> Result<(), QuizError> {
        self.require(QuizStatus::InProgress, "next")?;
        if !self.is_last() {
            self.move_to(self.current_index + 1);
        }
        Ok(())
    }

    /// Moves back; a no-op on the first question.
    pub fn prev(&mut self) -> Result<(), QuizError> {
        self.require(QuizStatus::InProgress, "prev")?;
        if !self.is_first() {
            self.move_to(self.current_index - 1);
        }
        Ok(())
    }

    pub fn submit(&mut self) -> Result<Submission, QuizError> {
        self.submit_at(Utc::now())
    }

    /// Completes the session once. Repeated calls return the stored score
    /// without a notice.
    pub fn submit_at(&mut self, now: DateTime<Utc>) -> Result<Submission, QuizError> {
        if let (QuizStatus::Completed, Some(score)) = (self.status, self.score) {
            return Ok(Submission {
                score,
                notice: None,
            });
        }
        if !self.can_submit() {
            return Err(QuizError::CannotSubmit {
                answered: self.answered_count(),
                total: self.question_count(),
                position: self.current_index + 1,
            });
        }

        let score = scoring::score(
            &self.definition.questions,
            &self.answers,
            self.definition.passing_score,
        );
        self.score = Some(score);
        self.status = QuizStatus::Completed;
        self.completed_at = Some(now);

        let time_spent = self
            .started_at
            .map(|started| (now - started).num_seconds().max(0) as u64);
        info!(
            "Quiz {} completed: {}/{} ({}%)",
            self.definition.id, score.total_points, score.max_points, score.percentage
        );

        Ok(Submission {
            score,
            notice: Some(CompletionNotice {
                quiz_id: self.definition.id.clone(),
                score,
                answers: self.answers.clone(),
                time_spent,
                completed_at: now,
            }),
        })
    }

    /// Back to `not_started` with everything cleared. The definition is kept.
    pub fn reset(&mut self) {
        self.status = QuizStatus::NotStarted;
        self.current_index = 0;
        self.answers.clear();
        self.feedback = Feedback::default();
        self.started_at = None;
        self.completed_at = None;
        self.score = None;
        debug!("Quiz {} reset", self.definition.id);
    }

    fn move_to(&mut self, index: usize) {
        self.current_index = index;
        self.feedback = Feedback::default();
    }

    fn require(&self, status: QuizStatus, operation: &'static str) -> Result<(), QuizError> {
        if self.status != status {
            return Err(ValidationError::InvalidState {
                operation,
                status: self.status,
            }
            .into());
        }
        Ok(())
    }
}
