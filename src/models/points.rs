// src/models/points.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'points_history' table: append-only point-earning events.
/// The sum of a user's amounts always equals users.total_points.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PointsHistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub reason: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated struct for displaying the leaderboard,
/// ranked by cached total points.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_points: i64,
    pub streak: i64,
}
