// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Reward points for completing the daily practice target,
/// indexed by (streak length - 1) with wraparound past a week.
pub const REWARD_SCHEDULE: [i64; 7] = [5, 10, 15, 20, 25, 30, 50];

/// Display labels assigned to shuffled options. Questions with more
/// options than labels cannot be presented.
pub const DISPLAY_ALPHABET: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// Exam paper composition and scoring.
pub const EXAM_SINGLE_COUNT: i64 = 6;
pub const EXAM_MULTIPLE_COUNT: i64 = 4;
pub const EXAM_POINTS_PER_QUESTION: i64 = 10;

/// Points granted for a correct practice answer.
pub const CORRECT_ANSWER_BONUS: i64 = 2;

/// Lifetime of the signed shuffle-mapping tokens (practice and exam).
pub const MAPPING_TOKEN_TTL_SECS: u64 = 2 * 60 * 60;

/// Fallback system prompt for AI explanations when the site_config
/// override is absent.
pub const DEFAULT_AI_BASE_PROMPT: &str = "You are a tutor for amateur-radio licensing exams. \
Explain questions accurately and concisely for a student preparing for the test. \
Use plain language and keep the explanation under 200 words.";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub ai_api_base: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_rate_limit: u32,
    pub ai_rate_window_ms: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_email = env::var("ADMIN_EMAIL").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let ai_api_base = env::var("AI_API_BASE").ok();
        let ai_api_key = env::var("AI_API_KEY").ok();
        let ai_model = env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let ai_rate_limit = env::var("AI_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let ai_rate_window_ms = env::var("AI_RATE_WINDOW_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60_000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_email,
            admin_password,
            ai_api_base,
            ai_api_key,
            ai_model,
            ai_rate_limit,
            ai_rate_window_ms,
        }
    }
}
