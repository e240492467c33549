use super::{Answers, QuizQuestion, QuizScore};

/// Scores recorded answers against the questions' correct options.
///
/// Unanswered questions and answers for unknown questions earn nothing.
/// `percentage` is rounded half up; a quiz worth zero points scores 0%.
pub fn score(questions: &[QuizQuestion], answers: &Answers, passing_score: u8) -> QuizScore {
    let max_points: u32 = questions.iter().map(|q| q.weight).sum();
    let total_points: u32 = questions
        .iter()
        .filter(|q| answers.get(&q.id).is_some_and(|a| q.is_correct(a)))
        .map(|q| q.weight)
        .sum();

    let percentage = if max_points == 0 {
        0
    } else {
        let (total, max) = (u64::from(total_points), u64::from(max_points));
        ((total * 200 + max) / (max * 2)) as u8
    };

    QuizScore {
        total_points,
        max_points,
        percentage,
        passed: percentage >= passing_score,
    }
}
