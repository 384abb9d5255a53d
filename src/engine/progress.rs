// src/engine/progress.rs

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::{error::AppError, models::practice::UserQuestion};

/// Records one graded answer in the (user, question) progress row.
///
/// Upsert semantics: the first answer creates the row initialized from
/// this single outcome; later answers increment the matching counter.
/// last_answered is refreshed on every answer, last_correct only on a
/// correct one. The surrounding transaction serializes concurrent
/// answers for the same key.
pub async fn record_answer(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    question_id: i64,
    was_correct: bool,
) -> Result<UserQuestion, AppError> {
    let now = Utc::now();
    let last_correct = was_correct.then_some(now);

    let row = sqlx::query_as::<_, UserQuestion>(
        r#"
        INSERT INTO user_questions
            (user_id, question_id, correct_count, incorrect_count, last_answered, last_correct)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(user_id, question_id) DO UPDATE SET
            correct_count = user_questions.correct_count + excluded.correct_count,
            incorrect_count = user_questions.incorrect_count + excluded.incorrect_count,
            last_answered = excluded.last_answered,
            last_correct = COALESCE(excluded.last_correct, user_questions.last_correct)
        RETURNING user_id, question_id, correct_count, incorrect_count, last_answered, last_correct
        "#,
    )
    .bind(user_id)
    .bind(question_id)
    .bind(if was_correct { 1i64 } else { 0 })
    .bind(if was_correct { 0i64 } else { 1 })
    .bind(now)
    .bind(last_correct)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

/// Marks a question as seen without answering: refreshes last_answered,
/// leaves the counters untouched.
pub async fn mark_seen(pool: &SqlitePool, user_id: i64, question_id: i64) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO user_questions (user_id, question_id, correct_count, incorrect_count, last_answered)
        VALUES (?1, ?2, 0, 0, ?3)
        ON CONFLICT(user_id, question_id) DO UPDATE SET
            last_answered = excluded.last_answered
        "#,
    )
    .bind(user_id)
    .bind(question_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}
