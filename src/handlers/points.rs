// src/handlers/points.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::points::{LeaderboardEntry, PointsHistoryEntry},
    utils::jwt::Claims,
};

/// Lists the current user's most recent point-earning events.
pub async fn get_history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let history = sqlx::query_as::<_, PointsHistoryEntry>(
        r#"
        SELECT id, user_id, amount, reason, created_at
        FROM points_history
        WHERE user_id = ?1
        ORDER BY id DESC
        LIMIT 100
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(history))
}

/// Retrieves the top users ranked by total points.
pub async fn get_leaderboard(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT username, total_points, streak
        FROM users
        ORDER BY total_points DESC, username ASC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}
