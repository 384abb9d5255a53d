// src/models/preset.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'style_presets' table: named prompt presets for
/// AI explanations. At most one preset is the default.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StylePreset {
    pub id: i64,
    pub name: String,
    pub prompt: String,
    pub is_default: bool,
}

/// DTO for creating a style preset.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePresetRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 4000))]
    pub prompt: String,
}

/// DTO for updating a style preset. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdatePresetRequest {
    pub name: Option<String>,
    pub prompt: Option<String>,
}

/// DTO for updating the caller's free-form style prompt.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStyleRequest {
    /// Null clears the stored style.
    #[validate(length(max = 2000))]
    pub style: Option<String>,
}
