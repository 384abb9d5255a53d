// src/engine/streak.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, Sqlite, Transaction};

use crate::{config::REWARD_SCHEDULE, engine::points, error::AppError};

/// Result of recording one qualifying practice activity.
#[derive(Debug, Clone, Serialize)]
pub struct DailyOutcome {
    pub date_key: String,
    pub today_count: i64,
    pub completed: bool,
    pub streak: i64,
    /// True only on the activity that first completed today's target.
    pub reward_granted: bool,
    pub reward_points: i64,
}

/// The UTC calendar day of `now` as a fixed-width YYYY-MM-DD key.
pub fn date_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Whole-day difference between two date keys, None if either is malformed.
pub fn day_delta(prev: &str, today: &str) -> Option<i64> {
    let prev = NaiveDate::parse_from_str(prev, "%Y-%m-%d").ok()?;
    let today = NaiveDate::parse_from_str(today, "%Y-%m-%d").ok()?;
    Some((today - prev).num_days())
}

/// Streak transition for a qualifying day: consecutive days extend the
/// streak, a same-day repeat leaves it alone, a gap (or no prior day)
/// resets it to 1.
pub fn transition(current_streak: i64, last_day: Option<&str>, today: &str) -> i64 {
    match last_day.and_then(|d| day_delta(d, today)) {
        Some(0) => current_streak,
        Some(1) => current_streak + 1,
        _ => 1,
    }
}

/// Reward for the day that just completed, given the streak after its
/// transition. Streak length 1 maps to the first schedule entry.
pub fn completion_reward(streak: i64) -> i64 {
    REWARD_SCHEDULE[(streak - 1).rem_euclid(REWARD_SCHEDULE.len() as i64) as usize]
}

/// Non-mutating preview of the reward the next completed day would earn.
pub fn next_reward(streak: i64) -> i64 {
    REWARD_SCHEDULE[streak.rem_euclid(REWARD_SCHEDULE.len() as i64) as usize]
}

#[derive(FromRow)]
struct UserDaily {
    streak: i64,
    last_practice_date: Option<String>,
    daily_target: i64,
}

#[derive(FromRow)]
struct DayRow {
    question_count: i64,
    completed: bool,
    reward_points: i64,
}

/// Records one qualifying activity for `user_id` at `now`.
///
/// Increments today's daily_practice counter (creating the row on the
/// day's first activity, which also applies the streak transition), and
/// on first reaching the user's daily target marks the day completed
/// and grants the schedule reward through the points ledger. The
/// completed flag guarantees the reward is granted at most once per
/// date key. All writes share the caller's transaction.
pub async fn record_daily_activity(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<DailyOutcome, AppError> {
    let key = date_key(now);

    let user = sqlx::query_as::<_, UserDaily>(
        "SELECT streak, last_practice_date, daily_target FROM users WHERE id = ?1",
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let day = sqlx::query_as::<_, DayRow>(
        r#"
        INSERT INTO daily_practice (user_id, date_key, question_count)
        VALUES (?1, ?2, 1)
        ON CONFLICT(user_id, date_key) DO UPDATE SET
            question_count = daily_practice.question_count + 1
        RETURNING question_count, completed, reward_points
        "#,
    )
    .bind(user_id)
    .bind(&key)
    .fetch_one(&mut **tx)
    .await?;

    let mut streak = user.streak;
    if day.question_count == 1 {
        streak = transition(user.streak, user.last_practice_date.as_deref(), &key);
        sqlx::query("UPDATE users SET streak = ?1, last_practice_date = ?2 WHERE id = ?3")
            .bind(streak)
            .bind(&key)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
    }

    let mut completed = day.completed;
    let mut reward_granted = false;
    let mut reward_points = day.reward_points;

    if !completed && day.question_count >= user.daily_target {
        let reward = completion_reward(streak);
        let updated = sqlx::query(
            r#"
            UPDATE daily_practice
            SET completed = 1, reward_points = ?1, completed_at = ?2
            WHERE user_id = ?3 AND date_key = ?4 AND completed = 0
            "#,
        )
        .bind(reward)
        .bind(now)
        .bind(user_id)
        .bind(&key)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 1 {
            points::grant_points(tx, user_id, reward, "daily-streak").await?;
            completed = true;
            reward_granted = true;
            reward_points = reward;
        }
    }

    Ok(DailyOutcome {
        date_key: key,
        today_count: day.question_count,
        completed,
        streak,
        reward_granted,
        reward_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_key_is_the_utc_calendar_day() {
        let early = Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 1).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 5, 23, 59, 59).unwrap();
        assert_eq!(date_key(early), "2026-03-05");
        assert_eq!(date_key(early), date_key(late));
    }

    #[test]
    fn day_delta_counts_whole_days() {
        assert_eq!(day_delta("2026-03-05", "2026-03-06"), Some(1));
        assert_eq!(day_delta("2026-03-05", "2026-03-05"), Some(0));
        assert_eq!(day_delta("2026-02-28", "2026-03-01"), Some(1));
        assert_eq!(day_delta("2026-03-01", "2026-03-08"), Some(7));
        assert_eq!(day_delta("garbage", "2026-03-05"), None);
    }

    #[test]
    fn consecutive_day_extends_streak() {
        assert_eq!(transition(6, Some("2026-03-05"), "2026-03-06"), 7);
    }

    #[test]
    fn same_day_leaves_streak_unchanged() {
        assert_eq!(transition(6, Some("2026-03-05"), "2026-03-05"), 6);
    }

    #[test]
    fn gap_or_no_history_resets_streak() {
        assert_eq!(transition(6, Some("2026-03-03"), "2026-03-06"), 1);
        assert_eq!(transition(6, None, "2026-03-06"), 1);
    }

    #[test]
    fn reward_schedule_wraps_weekly() {
        assert_eq!(completion_reward(1), 5);
        assert_eq!(completion_reward(7), 50);
        assert_eq!(completion_reward(8), 5);
        assert_eq!(completion_reward(14), 50);
    }

    #[test]
    fn next_reward_previews_the_following_completion() {
        // A user at streak 6 who completes tomorrow reaches streak 7.
        assert_eq!(next_reward(6), completion_reward(7));
        assert_eq!(next_reward(6), 50);
        assert_eq!(next_reward(0), 5);
        assert_eq!(next_reward(7), 5);
    }
}
