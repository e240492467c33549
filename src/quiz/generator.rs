use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use super::equation::{Mistake, Quadratic, Roots};
use super::{QuizDefinition, QuizError, QuizOption, QuizQuestion};

pub const OPTIONS_PER_QUESTION: usize = 4;
/// Widest coefficient range the generator samples from. Beyond it almost no
/// triple has small rational roots, and the arithmetic would approach `i64` limits.
pub const MAX_COEFFICIENT_RANGE: i64 = 100;
const OPTION_VALUES: [&str; OPTIONS_PER_QUESTION] = ["a", "b", "c", "d"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Coefficients are drawn from `[-coefficient_range, coefficient_range]`,
    /// clamped to `1..=MAX_COEFFICIENT_RANGE`.
    pub coefficient_range: i64,
    /// Largest denominator allowed in a correct root.
    pub max_denominator: i64,
    /// Coefficient triples tried per question before giving up.
    pub max_attempts: usize,
    pub passing_score: u8,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            coefficient_range: 6,
            max_denominator: 2,
            max_attempts: 200,
            passing_score: 60,
            shuffle_questions: false,
            shuffle_options: true,
        }
    }
}

/// Builds quizzes of quadratic equations with exact rational roots.
///
/// All randomness comes from the injected `rng`, so a seeded generator
/// always produces the same quiz.
pub struct EquationGenerator<R> {
    rng: R,
    settings: GeneratorSettings,
}

impl<R: Rng> EquationGenerator<R> {
    pub fn new(rng: R, settings: GeneratorSettings) -> Self {
        Self { rng, settings }
    }

    /// Generates a quiz with exactly `count` questions.
    ///
    /// Fails as a whole if any single question cannot be built within
    /// `max_attempts`, so a caller never sees a partial quiz.
    pub fn generate(&mut self, count: usize) -> Result<QuizDefinition, QuizError> {
        if count == 0 {
            return Err(QuizError::EmptyQuiz);
        }

        let id = format!("quadratic-{:016x}", self.rng.gen::<u64>());
        let questions = (1..=count)
            .map(|n| self.generate_question(&format!("{}-q{}", id, n), n))
            .collect::<Result<Vec<_>, _>>()?;

        let mut definition = QuizDefinition::new(
            id,
            "Квіз: квадратні рівняння".to_string(),
            "Перевір, як ти розв'язуєш рівняння другого степеня".to_string(),
            questions,
            self.settings.passing_score,
        );
        definition.shuffle_questions = self.settings.shuffle_questions;
        definition.shuffle_options = self.settings.shuffle_options;
        definition.apply_shuffle(&mut self.rng);

        debug!(
            "Generated quiz {} with {} questions",
            definition.id,
            definition.questions.len()
        );
        Ok(definition)
    }

    /// `position` is 1-based and only used for error reporting.
    pub fn generate_question(&mut self, id: &str, position: usize) -> Result<QuizQuestion, QuizError> {
        for attempt in 1..=self.settings.max_attempts {
            let equation = self.sample();
            match self.build_question(id, &equation) {
                Some(question) => return Ok(question),
                None => debug!("Attempt {}: rejected {}", attempt, equation),
            }
        }

        warn!(
            "Gave up on question {} after {} attempts",
            position, self.settings.max_attempts
        );
        Err(QuizError::GenerationExhausted {
            question: position,
            attempts: self.settings.max_attempts,
        })
    }

    fn sample(&mut self) -> Quadratic {
        let range = self.settings.coefficient_range.clamp(1, MAX_COEFFICIENT_RANGE);
        let magnitude = self.rng.gen_range(1..=range);
        let a = if self.rng.gen_bool(0.5) { magnitude } else { -magnitude };
        Quadratic {
            a,
            b: self.rng.gen_range(-range..=range),
            c: self.rng.gen_range(-range..=range),
        }
    }

    fn build_question(&mut self, id: &str, equation: &Quadratic) -> Option<QuizQuestion> {
        let correct = equation.solve()?;
        if correct.max_denominator() > self.settings.max_denominator {
            return None;
        }

        let mut mistakes = Mistake::ALL;
        mistakes.shuffle(&mut self.rng);

        // Roots render canonically, so distinct root sets never share a text.
        let mut chosen: Vec<Roots> = vec![correct];
        for mistake in mistakes {
            if chosen.len() == OPTIONS_PER_QUESTION {
                break;
            }
            if let Some(roots) = mistake.apply(equation, &correct) {
                if !chosen.contains(&roots) {
                    chosen.push(roots);
                }
            }
        }
        if chosen.len() < OPTIONS_PER_QUESTION {
            return None;
        }

        // Values follow root order so the unshuffled layout says nothing
        // about which option is right.
        chosen.sort();
        let options: Vec<QuizOption> = chosen
            .iter()
            .zip(OPTION_VALUES)
            .map(|(roots, value)| QuizOption::new(value.to_string(), roots.to_string()))
            .collect();
        let correct_text = correct.to_string();
        let correct_value = options.iter().find(|o| o.text == correct_text)?.value.clone();

        Some(QuizQuestion::new(
            id.to_string(),
            format!("Розв'яжи рівняння: {}", equation),
            options,
            correct_value,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn generator(seed: u64, settings: GeneratorSettings) -> EquationGenerator<StdRng> {
        EquationGenerator::new(StdRng::seed_from_u64(seed), settings)
    }

    #[test]
    fn generates_requested_number_of_valid_questions() {
        for seed in 0..20 {
            for count in [1, 3, 7] {
                let quiz = generator(seed, GeneratorSettings::default())
                    .generate(count)
                    .unwrap();
                assert_eq!(quiz.questions.len(), count);

                let ids: HashSet<_> = quiz.questions.iter().map(|q| q.id.as_str()).collect();
                assert_eq!(ids.len(), count);

                for q in &quiz.questions {
                    assert_eq!(q.options.len(), OPTIONS_PER_QUESTION);
                    let texts: HashSet<_> = q.options.iter().map(|o| o.text.as_str()).collect();
                    assert_eq!(texts.len(), OPTIONS_PER_QUESTION);
                    let values: HashSet<_> = q.options.iter().map(|o| o.value.as_str()).collect();
                    assert_eq!(values.len(), OPTIONS_PER_QUESTION);
                    let correct: Vec<_> = q.options.iter().filter(|o| q.is_correct(&o.value)).collect();
                    assert_eq!(correct.len(), 1);
                }
            }
        }
    }

    #[test]
    fn prompts_show_equations_and_options_show_roots() {
        let quiz = generator(42, GeneratorSettings::default()).generate(10).unwrap();
        for q in &quiz.questions {
            let text = &q.correct_option().unwrap().text;
            assert!(text.starts_with("x"), "unexpected root text {}", text);
            assert!(q.prompt.ends_with("= 0"));
        }
    }

    #[test]
    fn same_seed_gives_same_quiz() {
        let first = generator(9, GeneratorSettings::default()).generate(7).unwrap();
        let second = generator(9, GeneratorSettings::default()).generate(7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unshuffled_options_are_in_value_order() {
        let settings = GeneratorSettings {
            shuffle_options: false,
            ..GeneratorSettings::default()
        };
        let quiz = generator(3, settings).generate(5).unwrap();
        for q in &quiz.questions {
            let values: Vec<_> = q.options.iter().map(|o| o.value.as_str()).collect();
            assert_eq!(values, OPTION_VALUES);
        }
    }

    #[test]
    fn carries_flags_and_passing_score() {
        let settings = GeneratorSettings {
            passing_score: 75,
            shuffle_questions: true,
            ..GeneratorSettings::default()
        };
        let quiz = generator(5, settings).generate(4).unwrap();
        assert_eq!(quiz.passing_score, 75);
        assert!(quiz.shuffle_questions);
        assert!(quiz.shuffle_options);
        assert!(quiz.questions.iter().all(|q| q.id.starts_with(&quiz.id)));
    }

    #[test]
    fn zero_attempts_exhausts_immediately() {
        let settings = GeneratorSettings {
            max_attempts: 0,
            ..GeneratorSettings::default()
        };
        let err = generator(1, settings).generate(3).unwrap_err();
        assert_eq!(
            err,
            QuizError::GenerationExhausted {
                question: 1,
                attempts: 0
            }
        );
    }

    #[test]
    fn impossible_denominator_bound_exhausts() {
        let settings = GeneratorSettings {
            max_denominator: 0,
            max_attempts: 25,
            ..GeneratorSettings::default()
        };
        let err = generator(1, settings).generate(2).unwrap_err();
        assert!(matches!(
            err,
            QuizError::GenerationExhausted { question: 1, attempts: 25 }
        ));
    }

    #[test]
    fn out_of_range_coefficient_settings_are_clamped() {
        for coefficient_range in [i64::MAX, i64::MIN, 0, -5] {
            let settings = GeneratorSettings {
                coefficient_range,
                max_attempts: 20_000,
                ..GeneratorSettings::default()
            };
            let quiz = generator(8, settings).generate(2).unwrap();
            assert_eq!(quiz.questions.len(), 2);
        }
    }

    #[test]
    fn clamped_range_keeps_coefficients_small() {
        let settings = GeneratorSettings {
            coefficient_range: i64::MAX,
            ..GeneratorSettings::default()
        };
        let mut sampler = generator(4, settings);
        for _ in 0..500 {
            let eq = sampler.sample();
            assert!(eq.a != 0);
            for k in [eq.a, eq.b, eq.c] {
                assert!(k.abs() <= MAX_COEFFICIENT_RANGE, "{} escaped the range", eq);
            }
        }
    }

    #[test]
    fn empty_quiz_is_rejected() {
        let err = generator(1, GeneratorSettings::default()).generate(0).unwrap_err();
        assert_eq!(err, QuizError::EmptyQuiz);
    }
}
