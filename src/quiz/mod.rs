pub mod equation;
pub mod error;
pub mod fraction;
pub mod generator;
pub mod results;
pub mod scoring;
pub mod session;

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

pub use error::{QuizError, ValidationError};
pub use generator::{EquationGenerator, GeneratorSettings, MAX_COEFFICIENT_RANGE};
pub use scoring::score;
pub use session::{CompletionNotice, QuizSession, Submission};

/// Recorded answers, keyed by question id.
pub type Answers = std::collections::BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuizQuestion>,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    /// Percentage needed to pass, 0-100.
    pub passing_score: u8,
}

impl QuizDefinition {
    pub fn new(
        id: String,
        title: String,
        description: String,
        questions: Vec<QuizQuestion>,
        passing_score: u8,
    ) -> Self {
        Self {
            id,
            title,
            description,
            questions,
            shuffle_questions: false,
            shuffle_options: false,
            passing_score: passing_score.min(100),
        }
    }

    pub fn question(&self, id: &str) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn max_points(&self) -> u32 {
        self.questions.iter().map(|q| q.weight).sum()
    }

    /// Shuffles questions and/or options according to the definition's flags.
    /// Options keep their values, so recorded answers stay meaningful.
    pub fn apply_shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.shuffle_options {
            for question in &mut self.questions {
                question.options.shuffle(rng);
            }
        }
        if self.shuffle_questions {
            self.questions.shuffle(rng);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<QuizOption>,
    /// Value of the correct option.
    pub correct: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl QuizQuestion {
    pub fn new(id: String, prompt: String, options: Vec<QuizOption>, correct: String) -> Self {
        Self {
            id,
            prompt,
            options,
            correct,
            weight: default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn is_correct(&self, value: &str) -> bool {
        self.correct == value
    }

    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.value == self.correct)
    }

    pub fn option_by_text(&self, text: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.text == text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizOption {
    pub value: String,
    pub text: String,
}

impl QuizOption {
    pub fn new(value: String, text: String) -> Self {
        Self { value, text }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuizStatus::NotStarted => "not_started",
            QuizStatus::InProgress => "in_progress",
            QuizStatus::Completed => "completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizScore {
    pub total_points: u32,
    pub max_points: u32,
    /// Rounded, 0-100.
    pub percentage: u8,
    pub passed: bool,
}

/// Correctness feedback for the displayed question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Feedback {
    pub shown: bool,
    pub is_correct: bool,
}
