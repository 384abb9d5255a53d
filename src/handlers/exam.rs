// src/handlers/exam.rs

use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::{
    config::{Config, EXAM_MULTIPLE_COUNT, EXAM_POINTS_PER_QUESTION, EXAM_SINGLE_COUNT,
        MAPPING_TOKEN_TTL_SECS},
    engine::{
        grade::{GradeMode, grade},
        shuffle::shuffle_options,
    },
    error::AppError,
    models::{
        exam::{ExamQuestion, ExamResponse, SubmitExamRequest},
        question::Question,
    },
    utils::jwt::{Claims, sign_mapping_token, verify_mapping_token},
};

async fn random_questions(
    pool: &SqlitePool,
    question_type: &str,
    count: i64,
) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, library_id, type, content, options, analysis, tags, created_at
        FROM questions
        WHERE type = ?1
        ORDER BY RANDOM()
        LIMIT ?2
        "#,
    )
    .bind(question_type)
    .bind(count)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch {} questions: {:?}", question_type, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(questions)
}

/// Generates a random exam paper.
///
/// Selects random single-choice and multiple-choice questions, shuffles
/// every option list and signs all display mappings into one exam token.
/// Correct answers never leave the server.
pub async fn generate_exam(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut paper = random_questions(&pool, "single", EXAM_SINGLE_COUNT).await?;
    paper.extend(random_questions(&pool, "multiple", EXAM_MULTIPLE_COUNT).await?);

    if paper.is_empty() {
        return Err(AppError::NotFound(
            "No questions available for an exam".to_string(),
        ));
    }

    let mut questions = Vec::with_capacity(paper.len());
    let mut mappings = HashMap::with_capacity(paper.len());
    for question in paper {
        let (options, mapping) = shuffle_options(&question.options)?;
        mappings.insert(question.id, mapping);
        questions.push(ExamQuestion {
            id: question.id,
            question_type: question.question_type,
            content: question.content,
            options,
        });
    }

    let exam_token = sign_mapping_token(
        claims.user_id(),
        mappings,
        &config.jwt_secret,
        MAPPING_TOKEN_TTL_SECS,
    )?;

    Ok(Json(ExamResponse {
        questions,
        exam_token,
        expires_in: MAPPING_TOKEN_TTL_SECS,
    }))
}

/// Submits an exam attempt and calculates the score.
///
/// * Resolves each submission through the exam token's mappings.
/// * Scores 10 points per correct question, all-or-nothing per question.
/// * Saves the result with an Upsert keeping the highest score.
pub async fn submit_exam(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let user_id = claims.user_id();
    let token = verify_mapping_token(&req.exam_token, user_id, &config.jwt_secret)?;

    let question_ids: Vec<i64> = req.answers.keys().cloned().collect();

    // Use QueryBuilder for dynamic IN clause
    let mut query_builder = sqlx::QueryBuilder::<Sqlite>::new(
        "SELECT id, library_id, type, content, options, analysis, tags, created_at
         FROM questions WHERE id IN (",
    );

    let mut separated = query_builder.separated(",");
    for id in &question_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let db_questions: Vec<Question> = query_builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let db_map: HashMap<i64, Question> = db_questions.into_iter().map(|q| (q.id, q)).collect();

    let mut correct_count: i64 = 0;
    for (question_id, selected) in &req.answers {
        let mapping = token.questions.get(question_id).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Exam token does not cover question {}",
                question_id
            ))
        })?;

        // A question deleted between generation and submission is skipped.
        let Some(question) = db_map.get(question_id) else {
            continue;
        };

        let verdict = grade(&question.correct_ids(), selected, mapping, GradeMode::Strict)?;
        if verdict.correct {
            correct_count += 1;
        }
    }

    let total_score = correct_count * EXAM_POINTS_PER_QUESTION;

    // Upsert: keep the highest score if the user retakes the exam
    sqlx::query(
        r#"
        INSERT INTO exam_records (user_id, score, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(user_id) DO UPDATE SET
            score = CASE WHEN excluded.score > exam_records.score
                         THEN excluded.score ELSE exam_records.score END,
            created_at = excluded.created_at
        "#,
    )
    .bind(user_id)
    .bind(total_score)
    .bind(Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert exam record: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "score": total_score,
        "correct_count": correct_count,
        "total_questions": question_ids.len(),
        "message": "Exam submitted successfully"
    })))
}
