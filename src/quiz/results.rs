use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use log::{info, warn};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};

use super::{Answers, CompletionNotice, QuizScore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("result database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed result record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("result store lock poisoned")]
    Poisoned,
}

/// A result about to be stored; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuizResult {
    pub quiz_id: String,
    pub user_id: Option<String>,
    pub score: QuizScore,
    pub answers: Answers,
    pub time_spent: Option<u64>,
    pub completed_at: DateTime<Utc>,
}

impl NewQuizResult {
    pub fn from_notice(notice: &CompletionNotice, user_id: Option<&str>) -> Self {
        Self {
            quiz_id: notice.quiz_id.clone(),
            user_id: user_id.map(str::to_string),
            score: notice.score,
            answers: notice.answers.clone(),
            time_spent: notice.time_spent,
            completed_at: notice.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizResult {
    pub id: u64,
    pub quiz_id: String,
    pub user_id: Option<String>,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u8,
    pub passed: bool,
    pub answers: Answers,
    pub time_spent: Option<u64>,
    pub completed_at: DateTime<Utc>,
}

impl QuizResult {
    fn stored(id: u64, result: NewQuizResult) -> Self {
        Self {
            id,
            quiz_id: result.quiz_id,
            user_id: result.user_id,
            score: result.score.total_points,
            max_score: result.score.max_points,
            percentage: result.score.percentage,
            passed: result.score.passed,
            answers: result.answers,
            time_spent: result.time_spent,
            completed_at: result.completed_at,
        }
    }
}

pub trait ResultStore {
    fn insert(&self, result: NewQuizResult) -> Result<QuizResult, StoreError>;

    fn all(&self) -> Result<Vec<QuizResult>, StoreError>;

    /// Newest first.
    fn for_user(&self, user_id: &str) -> Result<Vec<QuizResult>, StoreError> {
        let mut results: Vec<_> = self
            .all()?
            .into_iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .collect();
        newest_first(&mut results);
        Ok(results)
    }

    /// Newest first.
    fn for_quiz(&self, quiz_id: &str) -> Result<Vec<QuizResult>, StoreError> {
        let mut results: Vec<_> = self
            .all()?
            .into_iter()
            .filter(|r| r.quiz_id == quiz_id)
            .collect();
        newest_first(&mut results);
        Ok(results)
    }
}

fn newest_first(results: &mut [QuizResult]) {
    results.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
}

fn next_id(results: &[QuizResult]) -> u64 {
    results.iter().map(|r| r.id).max().unwrap_or(0) + 1
}

#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: Mutex<Vec<QuizResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<QuizResult>>, StoreError> {
        self.results.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ResultStore for MemoryResultStore {
    fn insert(&self, result: NewQuizResult) -> Result<QuizResult, StoreError> {
        let mut results = self.lock()?;
        let stored = QuizResult::stored(next_id(&results), result);
        results.push(stored.clone());
        Ok(stored)
    }

    fn all(&self) -> Result<Vec<QuizResult>, StoreError> {
        Ok(self.lock()?.clone())
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS quiz_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quiz_id TEXT NOT NULL,
    user_id TEXT,
    score INTEGER NOT NULL,
    max_score INTEGER NOT NULL,
    percentage INTEGER NOT NULL,
    passed INTEGER NOT NULL,
    answers TEXT NOT NULL,
    time_spent INTEGER,
    completed_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_quiz_results_user ON quiz_results (user_id, completed_at);
CREATE INDEX IF NOT EXISTS idx_quiz_results_quiz ON quiz_results (quiz_id, completed_at);
";

const SELECT_RESULTS: &str = "SELECT id, quiz_id, user_id, score, max_score, percentage, passed, \
     answers, time_spent, completed_at FROM quiz_results";

/// Results kept in an SQLite table. Answers are stored as a JSON object and
/// `completed_at` as Unix milliseconds.
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Mutex<Connection>,
}

impl SqliteResultStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self::with_connection(Connection::open(path)?)?;
        info!("Result store ready at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Newest first. Rows that cannot be read are logged and skipped.
    fn query(&self, filter: &str, args: &[&str]) -> Result<Vec<QuizResult>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "{} {} ORDER BY completed_at DESC, id DESC",
            SELECT_RESULTS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), row_to_result)?;
        let results: Vec<QuizResult> = rows.filter_map(log_and_skip_err).collect();
        Ok(results)
    }
}

impl ResultStore for SqliteResultStore {
    fn insert(&self, result: NewQuizResult) -> Result<QuizResult, StoreError> {
        let answers = serde_json::to_string(&result.answers)?;
        let time_spent = result
            .time_spent
            .map(|secs| i64::try_from(secs).unwrap_or(i64::MAX));

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO quiz_results \
             (quiz_id, user_id, score, max_score, percentage, passed, answers, time_spent, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                result.quiz_id,
                result.user_id,
                result.score.total_points,
                result.score.max_points,
                result.score.percentage,
                result.score.passed,
                answers,
                time_spent,
                result.completed_at.timestamp_millis(),
            ],
        )?;
        let rowid = conn.last_insert_rowid();
        let id = u64::try_from(rowid)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, rowid))?;
        Ok(QuizResult::stored(id, result))
    }

    fn all(&self) -> Result<Vec<QuizResult>, StoreError> {
        self.query("", &[])
    }

    fn for_user(&self, user_id: &str) -> Result<Vec<QuizResult>, StoreError> {
        self.query("WHERE user_id = ?1", &[user_id])
    }

    fn for_quiz(&self, quiz_id: &str) -> Result<Vec<QuizResult>, StoreError> {
        self.query("WHERE quiz_id = ?1", &[quiz_id])
    }
}

fn log_and_skip_err<T>(result: Result<T, rusqlite::Error>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Skipping unreadable quiz result: {}", e);
            None
        }
    }
}

fn integral<T: TryFrom<i64>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let value: i64 = row.get(idx)?;
    T::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

fn row_to_result(row: &Row<'_>) -> rusqlite::Result<QuizResult> {
    let answers_json: String = row.get(7)?;
    let answers: Answers = serde_json::from_str(&answers_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    let time_spent: Option<i64> = row.get(8)?;
    let time_spent = time_spent
        .map(|secs| u64::try_from(secs).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(8, secs)))
        .transpose()?;

    let millis: i64 = row.get(9)?;
    let completed_at = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(9, millis))?;

    Ok(QuizResult {
        id: integral(row, 0)?,
        quiz_id: row.get(1)?,
        user_id: row.get(2)?,
        score: integral(row, 3)?,
        max_score: integral(row, 4)?,
        percentage: integral(row, 5)?,
        passed: row.get(6)?,
        answers,
        time_spent,
        completed_at,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(QuizResult),
    Failed(String),
}

/// Hands a completion notice to the store once. Failures come back as a
/// value; nothing is retried.
pub fn save_completion(
    store: &dyn ResultStore,
    notice: &CompletionNotice,
    user_id: Option<&str>,
) -> SaveOutcome {
    match store.insert(NewQuizResult::from_notice(notice, user_id)) {
        Ok(saved) => {
            info!("Saved result {} for quiz {}", saved.id, saved.quiz_id);
            SaveOutcome::Saved(saved)
        }
        Err(e) => {
            warn!("Failed to save result for quiz {}: {}", notice.quiz_id, e);
            SaveOutcome::Failed(e.to_string())
        }
    }
}

/// Aggregates over a user's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizStats {
    pub total_quizzes: usize,
    pub total_correct: u64,
    pub total_questions: u64,
    pub average_percentage: u8,
    pub best_percentage: u8,
    pub worst_percentage: u8,
}

impl QuizStats {
    pub fn from_results(results: &[QuizResult]) -> Option<Self> {
        let best_percentage = results.iter().map(|r| r.percentage).max()?;
        let worst_percentage = results.iter().map(|r| r.percentage).min()?;
        let count = results.len() as u64;
        let sum: u64 = results.iter().map(|r| u64::from(r.percentage)).sum();

        Some(Self {
            total_quizzes: results.len(),
            total_correct: results.iter().map(|r| u64::from(r.score)).sum(),
            total_questions: results.iter().map(|r| u64::from(r.max_score)).sum(),
            average_percentage: ((sum * 2 + count) / (count * 2)) as u8,
            best_percentage,
            worst_percentage,
        })
    }
}
