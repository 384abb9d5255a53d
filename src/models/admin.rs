// src/models/admin.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::ImportQuestion;

/// Represents the 'audit_logs' table: append-only trail of admin mutations.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub detail: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A row of the 'site_config' key/value store.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SiteConfigEntry {
    pub key: String,
    pub value: String,
}

/// DTO for setting a site-config value.
#[derive(Debug, Deserialize, Validate)]
pub struct SetConfigRequest {
    #[validate(length(min = 1, max = 100))]
    pub key: String,
    #[validate(length(max = 8000))]
    pub value: String,
}

/// DTO for creating a question library.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLibraryRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: Option<String>,
}

/// DTO for updating a library. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateLibraryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// DTO for a bulk question import into a library.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub questions: Vec<ImportQuestion>,
}

/// DTO for updating a question. Fields are optional; options are
/// immutable after import (delete and re-import to change them).
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub content: Option<String>,
    pub analysis: Option<String>,
    pub tags: Option<Vec<String>>,
    pub library_id: Option<i64>,
}

/// DTO for Admin updating a user. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub role: Option<String>,
    pub daily_target: Option<i64>,
    /// New AI quota ceiling; ignored when `unlimited_ai` is true.
    pub ai_quota_limit: Option<i64>,
    /// Clears the ceiling (unlimited usage).
    #[serde(default)]
    pub unlimited_ai: bool,
}
