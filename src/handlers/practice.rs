// src/handlers/practice.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::{CORRECT_ANSWER_BONUS, MAPPING_TOKEN_TTL_SECS},
    engine::{
        grade::{GradeMode, grade},
        points::grant_points,
        progress,
        shuffle::shuffle_options,
        streak,
    },
    error::AppError,
    models::{
        practice::{
            DailyPracticeRecord, DailyStatusResponse, MarkSeenRequest, PracticeQuestionResponse,
            SubmitAnswerRequest, SubmitAnswerResponse,
        },
        question::Question,
    },
    state::AppState,
    utils::jwt::{Claims, sign_mapping_token, verify_mapping_token},
};

#[derive(Debug, Deserialize)]
pub struct NextQuestionParams {
    pub library_id: Option<i64>,
}

/// Serves a random practice question with shuffled options.
///
/// The display->canonical mapping is not stored server-side: it is
/// signed into the returned practice token, which the client presents
/// back with its submission.
pub async fn next_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<NextQuestionParams>,
) -> Result<impl IntoResponse, AppError> {
    let question = match params.library_id {
        Some(library_id) => {
            sqlx::query_as::<_, Question>(
                r#"
                SELECT id, library_id, type, content, options, analysis, tags, created_at
                FROM questions
                WHERE library_id = ?1
                ORDER BY RANDOM()
                LIMIT 1
                "#,
            )
            .bind(library_id)
            .fetch_optional(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Question>(
                r#"
                SELECT id, library_id, type, content, options, analysis, tags, created_at
                FROM questions
                ORDER BY RANDOM()
                LIMIT 1
                "#,
            )
            .fetch_optional(&state.pool)
            .await?
        }
    };

    let question = question.ok_or(AppError::NotFound("No questions available".to_string()))?;

    let (options, mapping) = shuffle_options(&question.options)?;

    let practice_token = sign_mapping_token(
        claims.user_id(),
        HashMap::from([(question.id, mapping)]),
        &state.config.jwt_secret,
        MAPPING_TOKEN_TTL_SECS,
    )?;

    Ok(Json(PracticeQuestionResponse {
        id: question.id,
        question_type: question.question_type,
        content: question.content,
        options,
        practice_token,
        expires_in: MAPPING_TOKEN_TTL_SECS,
    }))
}

/// Grades a practice submission and records all bookkeeping in one
/// transaction: progress counters, the correct-answer bonus and the
/// daily streak/reward pipeline.
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();
    let token = verify_mapping_token(&payload.practice_token, user_id, &state.config.jwt_secret)?;
    let mapping = token.questions.get(&payload.question_id).ok_or_else(|| {
        AppError::BadRequest("Practice token does not cover this question".to_string())
    })?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, library_id, type, content, options, analysis, tags, created_at
        FROM questions
        WHERE id = ?1
        "#,
    )
    .bind(payload.question_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let correct_ids = question.correct_ids();
    let verdict = grade(&correct_ids, &payload.selected, mapping, GradeMode::Strict)?;

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let progress = progress::record_answer(&mut tx, user_id, question.id, verdict.correct).await?;

    if verdict.correct {
        grant_points(&mut tx, user_id, CORRECT_ANSWER_BONUS, "correct-answer").await?;
    }

    let daily = streak::record_daily_activity(&mut tx, user_id, Utc::now()).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(SubmitAnswerResponse {
        correct: verdict.correct,
        canonical_selected: verdict.canonical_selected,
        correct_ids: correct_ids.into_iter().collect(),
        analysis: question.analysis,
        progress,
        daily,
    }))
}

/// Marks a question as viewed without answering.
pub async fn mark_seen(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<MarkSeenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE id = ?1")
        .bind(payload.question_id)
        .fetch_one(&state.pool)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    progress::mark_seen(&state.pool, claims.user_id(), payload.question_id).await?;

    Ok(Json(json!({ "seen": true })))
}

/// Today's practice status plus the reward the next completed day
/// would earn. Read-only.
pub async fn daily_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();
    let date_key = streak::date_key(Utc::now());

    #[derive(sqlx::FromRow)]
    struct UserRow {
        streak: i64,
        daily_target: i64,
    }

    let user = sqlx::query_as::<_, UserRow>("SELECT streak, daily_target FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let today = sqlx::query_as::<_, DailyPracticeRecord>(
        r#"
        SELECT user_id, date_key, question_count, completed, reward_points, completed_at
        FROM daily_practice
        WHERE user_id = ?1 AND date_key = ?2
        "#,
    )
    .bind(user_id)
    .bind(&date_key)
    .fetch_optional(&pool)
    .await?;

    let (question_count, completed) = today
        .map(|t| (t.question_count, t.completed))
        .unwrap_or((0, false));

    Ok(Json(DailyStatusResponse {
        date_key,
        question_count,
        completed,
        daily_target: user.daily_target,
        streak: user.streak,
        next_reward: streak::next_reward(user.streak),
    }))
}
