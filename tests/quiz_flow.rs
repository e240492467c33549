use quiz_bot::quiz::results::{
    save_completion, MemoryResultStore, QuizStats, ResultStore, SaveOutcome, SqliteResultStore,
};
use quiz_bot::quiz::{
    EquationGenerator, GeneratorSettings, QuizError, QuizSession, QuizStatus, ValidationError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn seven_question_session(seed: u64) -> QuizSession {
    let quiz = EquationGenerator::new(StdRng::seed_from_u64(seed), GeneratorSettings::default())
        .generate(7)
        .expect("default settings always produce a quiz");
    assert_eq!(quiz.passing_score, 60);
    QuizSession::new(quiz).unwrap()
}

/// Answers every question, the first `correct` of them correctly, using the
/// option texts the way a user picking buttons would.
fn play(session: &mut QuizSession, correct: usize) {
    session.start().unwrap();
    for i in 0..session.question_count() {
        let question = session.current_question().clone();
        let option = question
            .options
            .iter()
            .find(|o| question.is_correct(&o.value) == (i < correct))
            .unwrap();
        session.answer(&question.id, &option.value).unwrap();
        assert_eq!(session.reveal_feedback().unwrap().is_correct, i < correct);
        session.next().unwrap();
    }
}

#[test]
fn perfect_run_passes_and_is_stored_once() {
    let mut session = seven_question_session(11);
    play(&mut session, 7);
    assert!(session.can_submit());

    let store = MemoryResultStore::new();
    let first = session.submit().unwrap();
    assert_eq!(first.score.percentage, 100);
    assert!(first.score.passed);
    if let Some(notice) = &first.notice {
        assert!(matches!(
            save_completion(&store, notice, Some("42")),
            SaveOutcome::Saved(_)
        ));
    }

    let second = session.submit().unwrap();
    assert_eq!(second.score, first.score);
    assert!(second.notice.is_none());
    assert_eq!(store.for_user("42").unwrap().len(), 1);
}

#[test]
fn three_of_seven_fails() {
    let mut session = seven_question_session(12);
    play(&mut session, 3);
    let submission = session.submit().unwrap();
    assert_eq!(submission.score.total_points, 3);
    assert_eq!(submission.score.max_points, 7);
    assert_eq!(submission.score.percentage, 43);
    assert!(!submission.score.passed);
    assert_eq!(session.status(), QuizStatus::Completed);
}

#[test]
fn history_feeds_stats() {
    let store = SqliteResultStore::open_in_memory().unwrap();
    for (seed, correct) in [(1, 7), (2, 3)] {
        let mut session = seven_question_session(seed);
        play(&mut session, correct);
        let notice = session.submit().unwrap().notice.unwrap();
        save_completion(&store, &notice, Some("student"));
    }

    let stats = QuizStats::from_results(&store.for_user("student").unwrap()).unwrap();
    assert_eq!(stats.total_quizzes, 2);
    assert_eq!(stats.total_correct, 10);
    assert_eq!(stats.total_questions, 14);
    assert_eq!(stats.best_percentage, 100);
    assert_eq!(stats.worst_percentage, 43);
    assert_eq!(stats.average_percentage, 72);
}

#[test]
fn answers_outside_the_quiz_are_rejected() {
    let mut session = seven_question_session(3);
    session.start().unwrap();
    let err = session.answer("not-a-question", "a").unwrap_err();
    assert!(matches!(
        err,
        QuizError::Validation(ValidationError::UnknownQuestion { .. })
    ));
    assert_eq!(session.answered_count(), 0);
}

#[test]
fn exhausted_generation_yields_no_quiz() {
    let settings = GeneratorSettings {
        max_denominator: 0,
        max_attempts: 10,
        ..GeneratorSettings::default()
    };
    let result = EquationGenerator::new(StdRng::seed_from_u64(0), settings).generate(7);
    assert!(matches!(result, Err(QuizError::GenerationExhausted { .. })));
}
