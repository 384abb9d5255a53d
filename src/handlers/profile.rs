use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{error::AppError, models::user::MeResponse, utils::jwt::Claims};

/// Get current user's profile and statistics.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let me = sqlx::query_as::<_, MeResponse>(
        r#"
        SELECT
            u.id, u.email, u.username, u.role, u.total_points, u.streak,
            u.daily_target, u.ai_quota_limit, u.ai_quota_used, u.created_at,
            (SELECT COUNT(*) FROM user_questions uq WHERE uq.user_id = u.id) AS questions_practiced
        FROM users u
        WHERE u.id = ?1
        "#,
    )
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(me))
}
