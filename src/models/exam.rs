// src/models/exam.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::engine::shuffle::DisplayOption;

/// Represents the 'exam_records' table.
/// Stores each user's best exam score.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamRecord {
    pub id: i64,
    pub user_id: i64,
    pub score: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One shuffled question of a generated exam paper.
#[derive(Debug, Serialize)]
pub struct ExamQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Vec<DisplayOption>,
}

/// DTO for returning a generated exam.
#[derive(Debug, Serialize)]
pub struct ExamResponse {
    pub questions: Vec<ExamQuestion>,
    pub exam_token: String,
    pub expires_in: u64, // seconds
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// The token received from generate_exam.
    pub exam_token: String,

    /// User's answers map.
    /// Key: Question ID (i64)
    /// Value: Selected display ids.
    pub answers: HashMap<i64, Vec<String>>,
}
