// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json as SqlxJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        admin::{
            AdminUpdateUserRequest, AuditLog, CreateLibraryRequest, ImportRequest,
            SetConfigRequest, SiteConfigEntry, UpdateLibraryRequest, UpdateQuestionRequest,
        },
        preset::{CreatePresetRequest, UpdatePresetRequest},
        question::{ImportQuestion, NormalizedQuestion},
        user::User,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Appends an audit trail entry. Best-effort: a failed write is logged
/// and never fails the admin action itself.
async fn audit(pool: &SqlitePool, user_id: i64, action: &str, detail: String) {
    let result = sqlx::query(
        "INSERT INTO audit_logs (user_id, action, detail, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(user_id)
    .bind(action)
    .bind(detail)
    .bind(Utc::now())
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("Failed to record audit log for {}: {:?}", action, e);
    }
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, password, role, total_points, streak,
               last_practice_date, daily_target, ai_quota_limit, ai_quota_used,
               ai_style, created_at
        FROM users
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Updates a user's role, daily target or AI quota ceiling.
/// Admin only.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Check existence
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if exists == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    // Perform updates sequentially if fields are present
    if let Some(role) = &payload.role {
        if role != "user" && role != "admin" {
            return Err(AppError::BadRequest("Role must be 'user' or 'admin'".to_string()));
        }
        sqlx::query("UPDATE users SET role = ?1 WHERE id = ?2")
            .bind(role)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(daily_target) = payload.daily_target {
        if daily_target < 1 {
            return Err(AppError::BadRequest(
                "Daily target must be at least 1".to_string(),
            ));
        }
        sqlx::query("UPDATE users SET daily_target = ?1 WHERE id = ?2")
            .bind(daily_target)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if payload.unlimited_ai {
        sqlx::query("UPDATE users SET ai_quota_limit = NULL WHERE id = ?1")
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    } else if let Some(limit) = payload.ai_quota_limit {
        if limit < 0 {
            return Err(AppError::BadRequest(
                "AI quota limit must not be negative".to_string(),
            ));
        }
        sqlx::query("UPDATE users SET ai_quota_limit = ?1 WHERE id = ?2")
            .bind(limit)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    audit(&pool, claims.user_id(), "update_user", format!("user {}", id)).await;

    Ok(StatusCode::OK)
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Prevent self-deletion
    if id == claims.user_id() {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit(&pool, claims.user_id(), "delete_user", format!("user {}", id)).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new question library.
/// Admin only.
pub async fn create_library(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateLibraryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO libraries (name, description, created_at)
        VALUES (?1, ?2, ?3)
        RETURNING id
        "#,
    )
    .bind(&payload.name)
    .bind(payload.description.unwrap_or_default())
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict(format!("Library '{}' already exists", payload.name))
        } else {
            tracing::error!("Failed to create library: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    audit(&pool, claims.user_id(), "create_library", format!("library {}", id)).await;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a library by ID.
/// Admin only.
pub async fn update_library(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLibraryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.is_none() && payload.description.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE libraries SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict("Library name already exists".to_string())
        } else {
            tracing::error!("Failed to update library: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Library not found".to_string()));
    }

    audit(&pool, claims.user_id(), "update_library", format!("library {}", id)).await;

    Ok(StatusCode::OK)
}

/// Deletes a library and its questions.
/// Admin only.
pub async fn delete_library(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM libraries WHERE id = ?1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete library: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Library not found".to_string()));
    }

    audit(&pool, claims.user_id(), "delete_library", format!("library {}", id)).await;

    Ok(StatusCode::NO_CONTENT)
}

async fn library_exists(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM libraries WHERE id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

async fn insert_question(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    library_id: i64,
    question: &NormalizedQuestion,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO questions (library_id, type, content, options, analysis, tags, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING id
        "#,
    )
    .bind(library_id)
    .bind(&question.question_type)
    .bind(&question.content)
    .bind(SqlxJson(&question.options))
    .bind(question.analysis.as_deref().map(clean_html))
    .bind(SqlxJson(&question.tags))
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

/// Creates a single question in a library. Accepts the same tolerant
/// shapes as bulk import.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(library_id): Path<i64>,
    Json(payload): Json<ImportQuestion>,
) -> Result<impl IntoResponse, AppError> {
    if !library_exists(&pool, library_id).await? {
        return Err(AppError::NotFound("Library not found".to_string()));
    }

    let normalized = payload.normalize().map_err(AppError::BadRequest)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let id = insert_question(&mut tx, library_id, &normalized).await?;
    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    audit(&pool, claims.user_id(), "create_question", format!("question {}", id)).await;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Bulk-imports questions into a library.
///
/// Every entry is normalized and validated first; any invalid entry
/// rejects the whole batch, so a failed import leaves no partial state.
/// Admin only.
pub async fn import_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(library_id): Path<i64>,
    Json(payload): Json<ImportRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.questions.is_empty() {
        return Err(AppError::BadRequest("No questions to import".to_string()));
    }
    if !library_exists(&pool, library_id).await? {
        return Err(AppError::NotFound("Library not found".to_string()));
    }

    let mut normalized = Vec::with_capacity(payload.questions.len());
    let mut errors = Vec::new();
    for (i, question) in payload.questions.into_iter().enumerate() {
        match question.normalize() {
            Ok(n) => normalized.push(n),
            Err(e) => errors.push(format!("question {}: {}", i + 1, e)),
        }
    }
    if !errors.is_empty() {
        return Err(AppError::BadRequest(errors.join("; ")));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    for question in &normalized {
        insert_question(&mut tx, library_id, question).await?;
    }
    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    audit(
        &pool,
        claims.user_id(),
        "import_questions",
        format!("{} questions into library {}", normalized.len(), library_id),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"imported": normalized.len()})),
    ))
}

/// Updates a question by ID. Options are immutable after import.
/// Admin only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.content.is_none()
        && payload.analysis.is_none()
        && payload.tags.is_none()
        && payload.library_id.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(content) = payload.content {
        separated.push("content = ");
        separated.push_bind_unseparated(content);
    }

    if let Some(analysis) = payload.analysis {
        separated.push("analysis = ");
        separated.push_bind_unseparated(clean_html(&analysis));
    }

    if let Some(tags) = payload.tags {
        separated.push("tags = ");
        separated.push_bind_unseparated(SqlxJson(tags));
    }

    if let Some(library_id) = payload.library_id {
        separated.push("library_id = ");
        separated.push_bind_unseparated(library_id);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    audit(&pool, claims.user_id(), "update_question", format!("question {}", id)).await;

    Ok(StatusCode::OK)
}

/// Deletes a question by ID.
/// Admin only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ?1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    audit(&pool, claims.user_id(), "delete_question", format!("question {}", id)).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all site-config entries.
/// Admin only.
pub async fn get_config(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, SiteConfigEntry>("SELECT key, value FROM site_config ORDER BY key")
        .fetch_all(&pool)
        .await?;

    Ok(Json(entries))
}

/// Sets one site-config value (upsert).
/// Admin only.
pub async fn set_config(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SetConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO site_config (key, value)
        VALUES (?1, ?2)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(&payload.key)
    .bind(&payload.value)
    .execute(&pool)
    .await?;

    audit(&pool, claims.user_id(), "set_config", payload.key.clone()).await;

    Ok(StatusCode::OK)
}

/// Creates a style preset.
/// Admin only.
pub async fn create_preset(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePresetRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO style_presets (name, prompt) VALUES (?1, ?2) RETURNING id",
    )
    .bind(&payload.name)
    .bind(&payload.prompt)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict(format!("Preset '{}' already exists", payload.name))
        } else {
            tracing::error!("Failed to create preset: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    audit(&pool, claims.user_id(), "create_preset", format!("preset {}", id)).await;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a style preset by ID.
/// Admin only.
pub async fn update_preset(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePresetRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.is_none() && payload.prompt.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE style_presets SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(prompt) = payload.prompt {
        separated.push("prompt = ");
        separated.push_bind_unseparated(prompt);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict("Preset name already exists".to_string())
        } else {
            tracing::error!("Failed to update preset: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Preset not found".to_string()));
    }

    audit(&pool, claims.user_id(), "update_preset", format!("preset {}", id)).await;

    Ok(StatusCode::OK)
}

/// Deletes a style preset by ID.
/// Admin only.
pub async fn delete_preset(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM style_presets WHERE id = ?1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Preset not found".to_string()));
    }

    audit(&pool, claims.user_id(), "delete_preset", format!("preset {}", id)).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Makes one preset the default. The clear-then-set pair runs in a
/// single transaction so at most one preset ever holds the flag.
/// Admin only.
pub async fn set_default_preset(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    sqlx::query("UPDATE style_presets SET is_default = 0 WHERE is_default = 1")
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("UPDATE style_presets SET is_default = 1 WHERE id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Preset not found".to_string()));
    }

    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    audit(&pool, claims.user_id(), "set_default_preset", format!("preset {}", id)).await;

    Ok(StatusCode::OK)
}

/// Lists the most recent audit-log entries.
/// Admin only.
pub async fn list_audit_logs(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let logs = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT id, user_id, action, detail, created_at
        FROM audit_logs
        ORDER BY id DESC
        LIMIT 100
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(logs))
}
