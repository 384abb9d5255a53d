// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Login identity, unique.
    pub email: String,

    /// Display name, unique.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    /// Cached sum of this user's points_history amounts.
    pub total_points: i64,

    /// Consecutive qualifying practice days.
    pub streak: i64,

    /// Date key (YYYY-MM-DD, UTC) of the last qualifying practice day.
    pub last_practice_date: Option<String>,

    /// Questions per day needed to complete daily practice.
    pub daily_target: i64,

    /// AI generation ceiling; NULL means unlimited.
    pub ai_quota_limit: Option<i64>,
    pub ai_quota_used: i64,

    /// Free-form style prompt merged into AI explanation requests.
    pub ai_style: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize, FromRow)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: String,
    pub total_points: i64,
    pub streak: i64,
    pub daily_target: i64,
    pub questions_practiced: i64,
    pub ai_quota_limit: Option<i64>,
    pub ai_quota_used: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
