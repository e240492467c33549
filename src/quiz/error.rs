use super::QuizStatus;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("could not generate question {question} after {attempts} attempts")]
    GenerationExhausted { question: usize, attempts: usize },

    #[error("a quiz needs at least one question")]
    EmptyQuiz,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("cannot submit: {answered} of {total} questions answered, current question {position}")]
    CannotSubmit {
        answered: usize,
        total: usize,
        position: usize,
    },

    #[error("stored session is inconsistent: {reason}")]
    InconsistentSession { reason: &'static str },
}

/// Rejected operations. The session is left untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("question '{question_id}' is not part of this quiz")]
    UnknownQuestion { question_id: String },

    #[error("'{operation}' is not allowed while the quiz is {status}")]
    InvalidState {
        operation: &'static str,
        status: QuizStatus,
    },

    #[error("question '{question_id}' has not been answered yet")]
    NotAnswered { question_id: String },
}
