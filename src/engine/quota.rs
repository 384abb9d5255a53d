// src/engine/quota.rs

use serde::Serialize;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

use crate::error::AppError;

/// Read-only quota snapshot. `remaining` is None when the limit is
/// unbounded.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub limit: Option<i64>,
    pub used: i64,
    pub remaining: Option<i64>,
}

#[derive(FromRow)]
struct QuotaRow {
    ai_quota_limit: Option<i64>,
    ai_quota_used: i64,
}

/// Checks the usage ceiling and increments the usage counter in one
/// transaction. A null limit means unlimited. `bypass_limit` removes
/// the ceiling check only; usage is still recorded.
pub async fn check_and_increment(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    count: i64,
    bypass_limit: bool,
) -> Result<(), AppError> {
    let row =
        sqlx::query_as::<_, QuotaRow>("SELECT ai_quota_limit, ai_quota_used FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

    if !bypass_limit {
        if let Some(limit) = row.ai_quota_limit {
            if row.ai_quota_used + count > limit {
                let available = (limit - row.ai_quota_used).max(0);
                return Err(AppError::QuotaExceeded(format!(
                    "AI quota exceeded: requested {}, {} of {} remaining",
                    count, available, limit
                )));
            }
        }
    }

    sqlx::query("UPDATE users SET ai_quota_used = ai_quota_used + ?1 WHERE id = ?2")
        .bind(count)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Reports the current quota without mutating usage.
pub async fn get_status(pool: &SqlitePool, user_id: i64) -> Result<QuotaStatus, AppError> {
    let row =
        sqlx::query_as::<_, QuotaRow>("SELECT ai_quota_limit, ai_quota_used FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(QuotaStatus {
        limit: row.ai_quota_limit,
        used: row.ai_quota_used,
        remaining: row
            .ai_quota_limit
            .map(|limit| (limit - row.ai_quota_used).max(0)),
    })
}
