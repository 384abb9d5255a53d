// src/engine/points.rs

use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use crate::error::AppError;

/// Appends a points_history entry and bumps the user's cached
/// total_points by the same amount. Both writes share the caller's
/// transaction so the ledger and the cache cannot diverge.
pub async fn grant_points(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    amount: i64,
    reason: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO points_history (user_id, amount, reason, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(reason)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    let updated = sqlx::query("UPDATE users SET total_points = total_points + ?1 WHERE id = ?2")
        .bind(amount)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(())
}
