// tests/practice_flow_tests.rs
//
// End-to-end flows over a spawned app: import -> practice -> streak ->
// points, exam submission, strict grading and AI quota accounting.

use std::sync::Arc;

use backend::{
    ai::ExplanationModel, config::Config, error::AppError, routes, state::AppState,
    utils::rate_limit::RateLimiter,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

/// Deterministic stand-in for the outbound model. Returns markup that
/// must be sanitized before storage.
struct StubModel;

#[async_trait::async_trait]
impl ExplanationModel for StubModel {
    async fn explain(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, AppError> {
        Ok("<p>Because of antenna resonance.</p><script>alert(1)</script>".to_string())
    }
}

async fn spawn_app() -> (String, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
        ai_api_base: None,
        ai_api_key: None,
        ai_model: "stub".to_string(),
        ai_rate_limit: 100,
        ai_rate_window_ms: 60_000,
    };

    let state = AppState {
        pool: pool.clone(),
        ai_limiter: Arc::new(RateLimiter::new(config.ai_rate_limit, config.ai_rate_window_ms)),
        model: Arc::new(StubModel),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    username: &str,
) -> (i64, String) {
    let email = format!("{}@example.com", username);

    let created: serde_json::Value = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": email,
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed")
        .json()
        .await
        .expect("Failed to parse register json");
    let id = created["id"].as_i64().expect("id missing");

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");
    let token = login["token"].as_str().expect("token missing").to_string();

    (id, token)
}

/// Registers a user, promotes it to admin directly in the database and
/// logs in again so the token carries the admin role.
async fn make_admin(
    client: &reqwest::Client,
    address: &str,
    pool: &SqlitePool,
    username: &str,
) -> String {
    let (id, _) = register_and_login(client, address, username).await;

    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    login["token"].as_str().unwrap().to_string()
}

/// Creates a library and imports 6 single-choice and 4 multiple-choice
/// questions. Every correct option's text starts with "Right".
async fn seed_questions(client: &reqwest::Client, address: &str, admin_token: &str) -> i64 {
    let created: serde_json::Value = client
        .post(format!("{}/api/admin/libraries", address))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({ "name": "Technician Pool", "description": "Element 2" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let library_id = created["id"].as_i64().unwrap();

    let mut questions = Vec::new();
    for i in 0..6 {
        questions.push(serde_json::json!({
            "type": "single",
            "content": format!("Single question {}", i),
            "options": [
                format!("Right answer {}", i),
                "Wrong one", "Wrong two", "Wrong three"
            ],
            "answer": "A",
            "tags": "test, single"
        }));
    }
    for i in 0..4 {
        questions.push(serde_json::json!({
            "type": "multiple",
            "content": format!("Multiple question {}", i),
            "options": [
                { "text": format!("Right first {}", i), "isCorrect": true },
                { "text": format!("Right second {}", i), "is_correct": true },
                "Wrong one",
                "Wrong two"
            ]
        }));
    }

    let response = client
        .post(format!("{}/api/admin/libraries/{}/import", address, library_id))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({ "questions": questions }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["imported"], 10);

    library_id
}

/// Fetches the next practice question and answers it correctly by
/// picking the display options whose text starts with "Right".
async fn submit_correct_answer(
    client: &reqwest::Client,
    address: &str,
    token: &str,
) -> serde_json::Value {
    let question: serde_json::Value = client
        .get(format!("{}/api/practice/next", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let options = question["options"].as_array().unwrap();
    // Correctness must never leak to the presentation layer.
    for option in options {
        assert!(option.get("correct").is_none());
        assert!(option.get("is_correct").is_none());
    }

    let selected: Vec<String> = options
        .iter()
        .filter(|o| o["text"].as_str().unwrap().starts_with("Right"))
        .map(|o| o["id"].as_str().unwrap().to_string())
        .collect();
    assert!(!selected.is_empty());

    let response = client
        .post(format!("{}/api/practice/submit", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "practice_token": question["practice_token"],
            "question_id": question["id"],
            "selected": selected
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    response.json().await.unwrap()
}

#[tokio::test]
async fn practice_day_completes_and_rewards() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin_token = make_admin(&client, &address, &pool, "sysop").await;
    seed_questions(&client, &address, &admin_token).await;

    let (user_id, token) = register_and_login(&client, &address, "novice").await;

    // A two-question daily target keeps the test fast.
    let response = client
        .put(format!("{}/api/admin/users/{}", address, user_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "daily_target": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // First correct answer: day opened, streak starts, no reward yet.
    let first = submit_correct_answer(&client, &address, &token).await;
    assert_eq!(first["correct"], true);
    assert_eq!(first["daily"]["today_count"], 1);
    assert_eq!(first["daily"]["streak"], 1);
    assert_eq!(first["daily"]["completed"], false);
    assert_eq!(first["daily"]["reward_granted"], false);

    // Second correct answer reaches the target: completed, streak-1 reward.
    let second = submit_correct_answer(&client, &address, &token).await;
    assert_eq!(second["daily"]["today_count"], 2);
    assert_eq!(second["daily"]["completed"], true);
    assert_eq!(second["daily"]["reward_granted"], true);
    assert_eq!(second["daily"]["reward_points"], 5);

    // Third answer the same day: counted, but the reward stays granted-once.
    let third = submit_correct_answer(&client, &address, &token).await;
    assert_eq!(third["daily"]["today_count"], 3);
    assert_eq!(third["daily"]["reward_granted"], false);
    assert_eq!(third["daily"]["streak"], 1);

    // Cached total equals the ledger sum: 3 correct bonuses + 5 reward.
    let me: serde_json::Value = client
        .get(format!("{}/api/profile/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["total_points"], 11);
    assert_eq!(me["streak"], 1);

    let history: serde_json::Value = client
        .get(format!("{}/api/points/history", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = history.as_array().unwrap();
    let sum: i64 = entries.iter().map(|e| e["amount"].as_i64().unwrap()).sum();
    assert_eq!(sum, me["total_points"].as_i64().unwrap());
    assert_eq!(
        entries
            .iter()
            .filter(|e| e["reason"] == "daily-streak")
            .count(),
        1
    );

    // Daily status previews the next completion's reward (streak 1 -> 10).
    let daily: serde_json::Value = client
        .get(format!("{}/api/practice/daily", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(daily["completed"], true);
    assert_eq!(daily["question_count"], 3);
    assert_eq!(daily["next_reward"], 10);
}

#[tokio::test]
async fn streak_of_six_completes_into_seven_for_fifty_points() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin_token = make_admin(&client, &address, &pool, "sysop").await;
    seed_questions(&client, &address, &admin_token).await;

    let (user_id, token) = register_and_login(&client, &address, "veteran").await;

    let response = client
        .put(format!("{}/api/admin/users/{}", address, user_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "daily_target": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // Six consecutive qualifying days, the last of them yesterday.
    let yesterday = (chrono::Utc::now() - chrono::Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();
    sqlx::query("UPDATE users SET streak = 6, last_practice_date = ?1 WHERE id = ?2")
        .bind(&yesterday)
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let result = submit_correct_answer(&client, &address, &token).await;
    assert_eq!(result["daily"]["streak"], 7);
    assert_eq!(result["daily"]["completed"], true);
    assert_eq!(result["daily"]["reward_granted"], true);
    assert_eq!(result["daily"]["reward_points"], 50);

    let me: serde_json::Value = client
        .get(format!("{}/api/profile/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // One correct-answer bonus plus the streak-7 reward.
    assert_eq!(me["total_points"], 52);
    assert_eq!(me["streak"], 7);
}

#[tokio::test]
async fn submissions_with_unknown_ids_are_rejected() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin_token = make_admin(&client, &address, &pool, "sysop").await;
    seed_questions(&client, &address, &admin_token).await;
    let (_, token) = register_and_login(&client, &address, "novice").await;

    let question: serde_json::Value = client
        .get(format!("{}/api/practice/next", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Canonical ids bypass the shuffle and must not grade in strict mode.
    let response = client
        .post(format!("{}/api/practice/submit", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "practice_token": question["practice_token"],
            "question_id": question["id"],
            "selected": ["a"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn exam_scores_and_keeps_highest() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin_token = make_admin(&client, &address, &pool, "sysop").await;
    seed_questions(&client, &address, &admin_token).await;
    let (user_id, token) = register_and_login(&client, &address, "candidate").await;

    let exam: serde_json::Value = client
        .get(format!("{}/api/exam/generate", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let questions = exam["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 10);

    // Perfect paper: pick every "Right" display option.
    let mut answers = serde_json::Map::new();
    for q in questions {
        let selected: Vec<String> = q["options"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|o| o["text"].as_str().unwrap().starts_with("Right"))
            .map(|o| o["id"].as_str().unwrap().to_string())
            .collect();
        answers.insert(q["id"].to_string(), serde_json::json!(selected));
    }

    let response = client
        .post(format!("{}/api/exam/submit", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "exam_token": exam["exam_token"],
            "answers": answers
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let result: serde_json::Value = response.json().await.unwrap();
    assert_eq!(result["score"], 100);
    assert_eq!(result["correct_count"], 10);

    // A worse retake must not lower the stored score.
    let mut wrong_answers = serde_json::Map::new();
    for q in questions {
        let selected: Vec<String> = q["options"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|o| o["text"].as_str().unwrap().starts_with("Wrong"))
            .take(1)
            .map(|o| o["id"].as_str().unwrap().to_string())
            .collect();
        wrong_answers.insert(q["id"].to_string(), serde_json::json!(selected));
    }
    let response = client
        .post(format!("{}/api/exam/submit", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "exam_token": exam["exam_token"],
            "answers": wrong_answers
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let stored: i64 =
        sqlx::query_scalar("SELECT score FROM exam_records WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, 100);
}

#[tokio::test]
async fn ai_quota_gates_generation_and_caches() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin_token = make_admin(&client, &address, &pool, "sysop").await;
    let library_id = seed_questions(&client, &address, &admin_token).await;
    let (user_id, token) = register_and_login(&client, &address, "curious").await;

    let response = client
        .put(format!("{}/api/admin/users/{}", address, user_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "ai_quota_limit": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let question_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM questions WHERE library_id = ?1 ORDER BY id LIMIT 2")
            .bind(library_id)
            .fetch_all(&pool)
            .await
            .unwrap();

    // First generation consumes the whole quota.
    let response = client
        .post(format!("{}/api/ai/explanations", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "question_id": question_ids[0] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["cached"], false);
    let content = body["content"].as_str().unwrap();
    assert!(content.contains("antenna resonance"));
    assert!(!content.contains("script"), "model output must be sanitized");

    // Second question: ceiling reached.
    let response = client
        .post(format!("{}/api/ai/explanations", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "question_id": question_ids[1] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 429);

    // The cached explanation stays readable without burning quota.
    let response = client
        .post(format!("{}/api/ai/explanations", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "question_id": question_ids[0] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["cached"], true);

    // Read-only status reports the exhausted ceiling without mutating it.
    let status: serde_json::Value = client
        .get(format!("{}/api/ai/quota", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["limit"], 1);
    assert_eq!(status["used"], 1);
    assert_eq!(status["remaining"], 0);
}
