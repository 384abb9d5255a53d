// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::question::{LibrarySummary, PublicQuestion, Question},
};

/// Lists all question libraries with their question counts.
pub async fn list_libraries(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let libraries = sqlx::query_as::<_, LibrarySummary>(
        r#"
        SELECT
            l.id, l.name, l.description,
            (SELECT COUNT(*) FROM questions q WHERE q.library_id = l.id) AS question_count
        FROM libraries l
        ORDER BY l.id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list libraries: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(libraries))
}

#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lists questions of a library, answers and analysis stripped.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Path(library_id): Path<i64>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let library_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM libraries WHERE id = ?1")
        .bind(library_id)
        .fetch_one(&pool)
        .await?;
    if library_exists == 0 {
        return Err(AppError::NotFound("Library not found".to_string()));
    }

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, library_id, type, content, options, analysis, tags, created_at
        FROM questions
        WHERE library_id = ?1
        ORDER BY id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(library_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let public: Vec<PublicQuestion> = questions.into_iter().map(PublicQuestion::from).collect();
    Ok(Json(public))
}

/// Retrieves a single question in its canonical (unshuffled) order,
/// correctness stripped.
pub async fn get_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, library_id, type, content, options, analysis, tags, created_at
        FROM questions
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(PublicQuestion::from(question)))
}
