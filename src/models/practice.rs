// src/models/practice.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::engine::shuffle::DisplayOption;

/// Represents the 'user_questions' table: per-user per-question progress.
/// Created on first view/answer, mutated on every subsequent answer,
/// never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserQuestion {
    pub user_id: i64,
    pub question_id: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub last_answered: Option<chrono::DateTime<chrono::Utc>>,
    pub last_correct: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'daily_practice' table: one row per (user, UTC day).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailyPracticeRecord {
    pub user_id: i64,
    pub date_key: String,
    pub question_count: i64,
    pub completed: bool,
    pub reward_points: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A shuffled question presentation plus the signed mapping token the
/// client must return with its submission.
#[derive(Debug, Serialize)]
pub struct PracticeQuestionResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Vec<DisplayOption>,
    pub practice_token: String,
    pub expires_in: u64,
}

/// DTO for submitting a practice answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1))]
    pub practice_token: String,
    pub question_id: i64,
    /// Selected display ids, e.g. ["A"] or ["B", "D"].
    #[validate(length(min = 1, message = "At least one option must be selected."))]
    pub selected: Vec<String>,
}

/// DTO for the view-without-answering marker.
#[derive(Debug, Deserialize)]
pub struct MarkSeenRequest {
    pub question_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub correct: bool,
    pub canonical_selected: Vec<String>,
    pub correct_ids: Vec<String>,
    pub analysis: Option<String>,
    pub progress: UserQuestion,
    pub daily: crate::engine::streak::DailyOutcome,
}

/// Today's practice status plus the non-mutating reward preview.
#[derive(Debug, Serialize)]
pub struct DailyStatusResponse {
    pub date_key: String,
    pub question_count: i64,
    pub completed: bool,
    pub daily_target: i64,
    pub streak: i64,
    pub next_reward: i64,
}
