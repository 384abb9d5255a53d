// src/handlers/ai.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    config::DEFAULT_AI_BASE_PROMPT,
    engine::{quota, style},
    error::AppError,
    models::{
        preset::{StylePreset, UpdateStyleRequest},
        question::Question,
    },
    state::AppState,
    utils::{html::clean_html, jwt::Claims},
};

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub question_id: i64,
    /// Preset to style the explanation with; the default preset when absent.
    pub style_preset_id: Option<i64>,
    /// Regenerate even when a cached explanation exists.
    #[serde(default)]
    pub regenerate: bool,
}

/// Generates (or returns the cached) AI explanation for a question.
///
/// Order of gates: fixed-window rate limit, per-user cache, quota
/// check-and-increment, then the outbound model call. Admins bypass the
/// quota ceiling but their usage is still recorded.
pub async fn generate_explanation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ExplainRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let decision = state.ai_limiter.check(&format!("ai:{}", user_id));
    if !decision.success {
        return Err(AppError::RateLimited(format!(
            "Too many AI requests; window resets at {}",
            decision.reset_at
        )));
    }

    if !payload.regenerate {
        let cached = sqlx::query_scalar::<_, String>(
            "SELECT content FROM ai_explanations WHERE user_id = ?1 AND question_id = ?2",
        )
        .bind(user_id)
        .bind(payload.question_id)
        .fetch_optional(&state.pool)
        .await?;

        if let Some(content) = cached {
            return Ok(Json(json!({ "content": content, "cached": true })));
        }
    }

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

    // Quota is consumed before the model call; a failed generation
    // still counts as usage.
    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    quota::check_and_increment(&mut tx, user_id, 1, claims.role == "admin").await?;
    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let system_prompt = build_system_prompt(&state, user_id, payload.style_preset_id).await?;
    let user_prompt = build_question_prompt(&question);

    let content = state.model.explain(&system_prompt, &user_prompt).await?;
    let content = clean_html(&content);

    sqlx::query(
        r#"
        INSERT INTO ai_explanations (user_id, question_id, content, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(user_id, question_id) DO UPDATE SET
            content = excluded.content,
            created_at = excluded.created_at
        "#,
    )
    .bind(user_id)
    .bind(question.id)
    .bind(&content)
    .bind(Utc::now())
    .execute(&state.pool)
    .await?;

    Ok(Json(json!({ "content": content, "cached": false })))
}

/// Base instruction + composed style: the site-wide base prompt,
/// followed by the preset/custom merge when one applies.
async fn build_system_prompt(
    state: &AppState,
    user_id: i64,
    style_preset_id: Option<i64>,
) -> Result<String, AppError> {
    let base = sqlx::query_scalar::<_, String>(
        "SELECT value FROM site_config WHERE key = 'ai_base_prompt'",
    )
    .fetch_optional(&state.pool)
    .await?
    .unwrap_or_else(|| DEFAULT_AI_BASE_PROMPT.to_string());

    let preset = match style_preset_id {
        Some(id) => Some(
            sqlx::query_as::<_, StylePreset>(
                "SELECT id, name, prompt, is_default FROM style_presets WHERE id = ?1",
            )
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AppError::NotFound("Style preset not found".to_string()))?,
        ),
        None => {
            sqlx::query_as::<_, StylePreset>(
                "SELECT id, name, prompt, is_default FROM style_presets WHERE is_default = 1",
            )
            .fetch_optional(&state.pool)
            .await?
        }
    };

    let custom = sqlx::query_scalar::<_, Option<String>>(
        "SELECT ai_style FROM users WHERE id = ?1",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .flatten();

    let styled = style::compose(preset.as_ref().map(|p| p.prompt.as_str()), custom.as_deref());

    Ok(match styled {
        Some(instruction) => format!("{}\n\n{}", base, instruction),
        None => base,
    })
}

fn build_question_prompt(question: &Question) -> String {
    let mut prompt = format!("Question: {}\n", question.content);
    for option in question.options.iter() {
        prompt.push_str(&format!(
            "- {}{}\n",
            option.text,
            if option.correct { " (correct)" } else { "" }
        ));
    }
    if let Some(analysis) = &question.analysis {
        prompt.push_str(&format!("\nReference analysis: {}\n", analysis));
    }
    prompt.push_str("\nExplain why the correct answer is correct and the others are not.");
    prompt
}

/// Read-only AI quota status for the current user.
pub async fn quota_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let status = quota::get_status(&state.pool, claims.user_id()).await?;
    Ok(Json(status))
}

/// Lists the available style presets.
pub async fn list_presets(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let presets = sqlx::query_as::<_, StylePreset>(
        "SELECT id, name, prompt, is_default FROM style_presets ORDER BY is_default DESC, name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(presets))
}

/// Updates the caller's free-form explanation style. Null clears it.
pub async fn update_style(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateStyleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let style = payload
        .style
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    sqlx::query("UPDATE users SET ai_style = ?1 WHERE id = ?2")
        .bind(&style)
        .bind(claims.user_id())
        .execute(&state.pool)
        .await?;

    Ok(Json(json!({ "style": style })))
}
