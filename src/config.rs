use std::str::FromStr;

use rand::Rng;

use crate::quiz::{
    EquationGenerator, GeneratorSettings, QuizDefinition, QuizError, MAX_COEFFICIENT_RANGE,
};

/// Bot settings, read from the environment (and `.env`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Questions per quiz
    pub quiz_length: usize,
    pub passing_score: u8,
    pub coefficient_range: i64,
    pub max_denominator: i64,
    pub max_generation_attempts: usize,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    /// SQLite file holding dialogue state
    pub dialogue_db: String,
    /// SQLite file with finished quiz results
    pub results_db: String,
}

impl Default for Config {
    fn default() -> Self {
        let generator = GeneratorSettings::default();
        Self {
            quiz_length: 7,
            passing_score: generator.passing_score,
            coefficient_range: generator.coefficient_range,
            max_denominator: generator.max_denominator,
            max_generation_attempts: generator.max_attempts,
            shuffle_questions: generator.shuffle_questions,
            shuffle_options: generator.shuffle_options,
            dialogue_db: "db.sqlite".to_string(),
            results_db: "quiz_results.sqlite".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source; unset, unparsable or
    /// out-of-range values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            quiz_length: parse_checked(&lookup, "QUIZ_LENGTH", default.quiz_length, |n| *n >= 1),
            passing_score: parse_checked(&lookup, "PASSING_SCORE", default.passing_score, |p| {
                *p <= 100
            }),
            coefficient_range: parse_checked(
                &lookup,
                "COEFFICIENT_RANGE",
                default.coefficient_range,
                |r| (1..=MAX_COEFFICIENT_RANGE).contains(r),
            ),
            max_denominator: parse_checked(&lookup, "MAX_DENOMINATOR", default.max_denominator, |d| {
                *d >= 1
            }),
            max_generation_attempts: parse_or(
                &lookup,
                "MAX_GENERATION_ATTEMPTS",
                default.max_generation_attempts,
            ),
            shuffle_questions: parse_or(&lookup, "SHUFFLE_QUESTIONS", default.shuffle_questions),
            shuffle_options: parse_or(&lookup, "SHUFFLE_OPTIONS", default.shuffle_options),
            dialogue_db: lookup("DIALOGUE_DB").unwrap_or(default.dialogue_db),
            results_db: lookup("RESULTS_DB").unwrap_or(default.results_db),
        }
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            coefficient_range: self.coefficient_range,
            max_denominator: self.max_denominator,
            max_attempts: self.max_generation_attempts,
            passing_score: self.passing_score,
            shuffle_questions: self.shuffle_questions,
            shuffle_options: self.shuffle_options,
        }
    }

    /// A new quiz of `quiz_length` questions built with these settings.
    pub fn generate_quiz<R: Rng>(&self, rng: R) -> Result<QuizDefinition, QuizError> {
        EquationGenerator::new(rng, self.generator_settings()).generate(self.quiz_length)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    parse_checked(lookup, name, default, |_| true)
}

fn parse_checked<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T {
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) if valid(&value) => value,
        Ok(_) => {
            log::warn!("Ignoring {}={:?}: out of range", name, raw);
            default
        }
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid value", name, raw);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("QUIZ_LENGTH", "10"),
            ("PASSING_SCORE", "75"),
            ("COEFFICIENT_RANGE", "12"),
            ("SHUFFLE_QUESTIONS", "true"),
            ("RESULTS_DB", "/tmp/results.sqlite"),
        ]));
        assert_eq!(config.quiz_length, 10);
        assert_eq!(config.passing_score, 75);
        assert_eq!(config.coefficient_range, 12);
        assert!(config.shuffle_questions);
        assert_eq!(config.results_db, "/tmp/results.sqlite");

        let settings = config.generator_settings();
        assert_eq!(settings.passing_score, 75);
        assert_eq!(settings.coefficient_range, 12);
        assert!(settings.shuffle_questions);
    }

    #[test]
    fn every_generated_quiz_is_new() {
        let config = Config::from_lookup(lookup(&[("QUIZ_LENGTH", "5")]));
        let first = config.generate_quiz(StdRng::seed_from_u64(1)).unwrap();
        let second = config.generate_quiz(StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(first.questions.len(), 5);
        assert_eq!(second.questions.len(), 5);
        assert_ne!(first.id, second.id);
        assert_ne!(first.questions, second.questions);
        assert_eq!(first.passing_score, config.passing_score);
    }

    #[test]
    fn edge_values_are_accepted() {
        let widest = MAX_COEFFICIENT_RANGE.to_string();
        let config = Config::from_lookup(lookup(&[
            ("PASSING_SCORE", "100"),
            ("COEFFICIENT_RANGE", widest.as_str()),
        ]));
        assert_eq!(config.passing_score, 100);
        assert_eq!(config.coefficient_range, MAX_COEFFICIENT_RANGE);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("QUIZ_LENGTH", "many"),
            ("PASSING_SCORE", "300"),
        ]));
        assert_eq!(config.quiz_length, 7);
        // 300 does not fit in u8
        assert_eq!(config.passing_score, 60);
    }

    #[test]
    fn out_of_range_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("QUIZ_LENGTH", "0"),
            ("PASSING_SCORE", "250"),
            ("COEFFICIENT_RANGE", "5000000000"),
            ("MAX_DENOMINATOR", "0"),
        ]));
        // 250 parses as a u8 but is not a percentage
        assert_eq!(config.passing_score, 60);
        assert_eq!(config.coefficient_range, 6);
        assert_eq!(config.quiz_length, 7);
        assert_eq!(config.max_denominator, 2);

        let config = Config::from_lookup(lookup(&[("COEFFICIENT_RANGE", "-3")]));
        assert_eq!(config.coefficient_range, 6);
    }
}
