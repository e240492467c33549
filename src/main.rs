use std::sync::Arc;

use dotenv::dotenv;
use log::{info, warn};
use quiz_bot::quiz::results::{save_completion, QuizStats, ResultStore, SaveOutcome, SqliteResultStore};
use quiz_bot::quiz::{QuizError, QuizScore, QuizSession, Submission};
use quiz_bot::Config;
use rand::rngs::StdRng;
use rand::SeedableRng;
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup},
};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveMenuChoice,
    InQuiz {
        session: QuizSession,
        immediate_feedback: bool,
    },
}

type UserInfoStorage = std::sync::Arc<ErasedStorage<State>>;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    if let Err(e) = dotenv() {
        warn!("No .env file loaded: {}", e);
    }
    info!("Starting quiz bot...");

    let config = Arc::new(Config::from_env());
    let bot = Bot::from_env();

    info!("Opening dialogue storage at {}", config.dialogue_db);
    let storage: UserInfoStorage = SqliteStorage::open(&config.dialogue_db, Json)
        .await
        .expect("Failed to open the dialogue database")
        .erase();

    let results = Arc::new(
        SqliteResultStore::open(&config.results_db).expect("Failed to open the results database"),
    );
    let results_for_menu = results.clone();
    let config_for_menu = config.clone();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveMenuChoice].endpoint(
                move |bot: Bot, dialogue: QuizDialogue, msg: Message| {
                    receive_menu_choice(
                        config_for_menu.clone(),
                        results_for_menu.clone(),
                        bot,
                        dialogue,
                        msg,
                    )
                },
            ))
            .branch(
                dptree::case![State::InQuiz {
                    session,
                    immediate_feedback
                }]
                .endpoint(
                    move |bot: Bot,
                          dialogue: QuizDialogue,
                          (session, immediate_feedback): (QuizSession, bool),
                          msg: Message| {
                        in_quiz(
                            config.clone(),
                            results.clone(),
                            bot,
                            dialogue,
                            (session, immediate_feedback),
                            msg,
                        )
                    },
                ),
            ),
    )
    .dependencies(dptree::deps![storage])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

const START_WITH_FEEDBACK: &str = "Почати квіз з підказками";
const START_WITHOUT_FEEDBACK: &str = "Почати квіз без підказок";
const MY_STATS: &str = "Моя статистика";

const PREV: &str = "⬅️ Назад";
const NEXT: &str = "Далі ➡️";
const SUBMIT: &str = "✅ Завершити";
const RESTART: &str = "🔄 Почати спочатку";

fn menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(START_WITH_FEEDBACK)],
        vec![KeyboardButton::new(START_WITHOUT_FEEDBACK)],
        vec![KeyboardButton::new(MY_STATS)],
    ])
}

const GREETING_TEXT: &str = "Привіт! Я допоможу тобі потренуватися розв'язувати квадратні рівняння. Обери, що робимо:";
async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(menu_keyboard())
        .await?;

    dialogue.update(State::ReceiveMenuChoice).await?;
    Ok(())
}

async fn receive_menu_choice(
    config: Arc<Config>,
    results: Arc<SqliteResultStore>,
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
) -> HandlerResult {
    match msg.text() {
        Some(START_WITH_FEEDBACK) => begin_quiz(&config, bot, dialogue, msg, true).await,
        Some(START_WITHOUT_FEEDBACK) => begin_quiz(&config, bot, dialogue, msg, false).await,
        Some(MY_STATS) => send_stats(&results, &bot, &msg).await,
        _ => {
            bot.send_message(msg.chat.id, "Будь ласка, виберіть один з варіантів")
                .reply_markup(menu_keyboard())
                .await?;
            Ok(())
        }
    }
}

/// Generates a new quiz and starts a session on it. Returns the intro text too.
fn new_quiz(config: &Config) -> Result<(String, QuizSession), QuizError> {
    let definition = config.generate_quiz(StdRng::from_entropy())?;
    let intro = format!(
        "{}\n{}\n\nПитань: {}. Щоб скласти, потрібно {}%.",
        definition.title,
        definition.description,
        definition.questions.len(),
        definition.passing_score
    );
    let mut session = QuizSession::new(definition)?;
    session.start()?;
    Ok((intro, session))
}

const GENERATION_FAILED_TEXT: &str = "Не вдалося скласти квіз, спробуй ще раз";

async fn begin_quiz(
    config: &Config,
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    immediate_feedback: bool,
) -> HandlerResult {
    let (intro, session) = match new_quiz(config) {
        Ok(quiz) => quiz,
        Err(e) => {
            warn!("Quiz generation failed: {}", e);
            bot.send_message(msg.chat.id, GENERATION_FAILED_TEXT)
                .reply_markup(menu_keyboard())
                .await?;
            return Ok(());
        }
    };

    bot.send_message(msg.chat.id, intro).await?;
    send_question(&bot, msg.chat.id, &session).await?;

    dialogue
        .update(State::InQuiz {
            session,
            immediate_feedback,
        })
        .await?;
    Ok(())
}

async fn send_question(bot: &Bot, chat_id: ChatId, session: &QuizSession) -> HandlerResult {
    let question = session.current_question();
    let mut text = format!(
        "Питання {} з {} (є відповідь: {})\n\n{}",
        session.current_index() + 1,
        session.question_count(),
        session.answered_count(),
        question.prompt
    );
    let chosen = session
        .answer_for(&question.id)
        .and_then(|value| question.options.iter().find(|o| o.value == value));
    if let Some(option) = chosen {
        text.push_str(&format!("\n\nТвоя відповідь: {}", option.text));
    }

    let mut rows: Vec<Vec<KeyboardButton>> = question
        .options
        .iter()
        .map(|o| vec![KeyboardButton::new(o.text.clone())])
        .collect();

    let mut navigation = Vec::new();
    if !session.is_first() {
        navigation.push(KeyboardButton::new(PREV));
    }
    if !session.is_last() {
        navigation.push(KeyboardButton::new(NEXT));
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }
    if session.can_submit() {
        rows.push(vec![KeyboardButton::new(SUBMIT)]);
    }
    rows.push(vec![KeyboardButton::new(RESTART)]);

    bot.send_message(chat_id, text)
        .reply_markup(KeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

async fn in_quiz(
    config: Arc<Config>,
    results: Arc<SqliteResultStore>,
    bot: Bot,
    dialogue: QuizDialogue,
    (mut session, immediate_feedback): (QuizSession, bool),
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Будь ласка, обери варіант на клавіатурі")
            .await?;
        return Ok(());
    };

    match text {
        PREV => session.prev()?,
        NEXT => session.next()?,
        RESTART => match new_quiz(&config) {
            Ok((intro, fresh)) => {
                bot.send_message(msg.chat.id, intro).await?;
                session = fresh;
            }
            Err(e) => {
                warn!("Quiz generation failed on restart: {}", e);
                bot.send_message(msg.chat.id, GENERATION_FAILED_TEXT).await?;
            }
        },
        SUBMIT => return finish_quiz(&results, bot, dialogue, session, msg).await,
        answer_text => {
            let question = session.current_question();
            let Some(option) = question.option_by_text(answer_text) else {
                bot.send_message(msg.chat.id, "Такого варіанту немає, обери на клавіатурі")
                    .await?;
                return Ok(());
            };
            let (question_id, value) = (question.id.clone(), option.value.clone());
            session.answer(&question_id, &value)?;

            // Immediate feedback is our policy; the session only reveals on request.
            if immediate_feedback {
                let feedback = session.reveal_feedback()?;
                let reply = if feedback.is_correct {
                    "Правильно!".to_string()
                } else {
                    let correct = session
                        .current_question()
                        .correct_option()
                        .map(|o| o.text.clone())
                        .unwrap_or_default();
                    format!("Неправильно! Правильна відповідь: {}", correct)
                };
                bot.send_message(msg.chat.id, reply).await?;
            }
            session.next()?;
        }
    }

    send_question(&bot, msg.chat.id, &session).await?;
    dialogue
        .update(State::InQuiz {
            session,
            immediate_feedback,
        })
        .await?;
    Ok(())
}

async fn finish_quiz(
    results: &Arc<SqliteResultStore>,
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: QuizSession,
    msg: Message,
) -> HandlerResult {
    if !session.can_submit() {
        bot.send_message(
            msg.chat.id,
            "Щоб завершити, дай відповідь на всі питання і перейди до останнього",
        )
        .await?;
        return send_question(&bot, msg.chat.id, &session).await;
    }

    let Submission { score, notice } = session.submit()?;

    let save_status = match (notice, msg.from()) {
        (Some(notice), Some(user)) => {
            let user_id = user.id.0.to_string();
            let store = Arc::clone(results);
            let saved = tokio::task::spawn_blocking(move || {
                save_completion(store.as_ref(), &notice, Some(&user_id))
            })
            .await?;
            match saved {
                SaveOutcome::Saved(_) => "Результат збережено у твоєму профілі!",
                SaveOutcome::Failed(_) => "Не вдалося зберегти результат.",
            }
        }
        (Some(_), None) => "Результат не збережено: не вдалося визначити користувача.",
        (None, _) => "Цей квіз уже завершено.",
    };

    bot.send_message(msg.chat.id, format!("{}\n\n{}", summary(&session, &score), save_status))
        .reply_markup(menu_keyboard())
        .await?;

    dialogue.update(State::ReceiveMenuChoice).await?;
    Ok(())
}

fn summary(session: &QuizSession, score: &QuizScore) -> String {
    let verdict = if score.passed {
        "Вітаю, квіз складено!"
    } else {
        "Квіз не складено, спробуй ще раз."
    };
    let mut text = format!(
        "Квіз закінчився! Правильно: {} з {} ({}%)\n{}\n",
        score.total_points, score.max_points, score.percentage, verdict
    );

    for (i, question) in session.questions().iter().enumerate() {
        let correct = session
            .answer_for(&question.id)
            .is_some_and(|value| question.is_correct(value));
        let mark = if correct { "✅" } else { "❌" };
        let right_answer = question
            .correct_option()
            .map(|o| o.text.as_str())
            .unwrap_or_default();
        text.push_str(&format!("\n{} {}. {}\n    {}", mark, i + 1, question.prompt, right_answer));
    }
    text
}

async fn send_stats(results: &Arc<SqliteResultStore>, bot: &Bot, msg: &Message) -> HandlerResult {
    let Some(user) = msg.from() else {
        bot.send_message(msg.chat.id, "Не вдалося визначити користувача")
            .await?;
        return Ok(());
    };

    let store = Arc::clone(results);
    let user_id = user.id.0.to_string();
    let history = tokio::task::spawn_blocking(move || store.for_user(&user_id)).await?;

    let text = match history {
        Ok(history) => match QuizStats::from_results(&history) {
            Some(stats) => format!(
                "Квізів пройдено: {}\nПравильних відповідей: {} з {}\nСередній результат: {}%\nНайкращий: {}%\nНайгірший: {}%",
                stats.total_quizzes,
                stats.total_correct,
                stats.total_questions,
                stats.average_percentage,
                stats.best_percentage,
                stats.worst_percentage
            ),
            None => "Ти ще не пройшов жодного квізу".to_string(),
        },
        Err(e) => {
            warn!("Could not read results: {}", e);
            "Не вдалося завантажити статистику, спробуй пізніше".to_string()
        }
    };

    bot.send_message(msg.chat.id, text)
        .reply_markup(menu_keyboard())
        .await?;
    Ok(())
}
