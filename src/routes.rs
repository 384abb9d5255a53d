// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, ai, auth, exam, points, practice, profile, questions},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, browsing, practice, exam, points, AI, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, rate limiter, AI model).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let library_routes = Router::new()
        .route("/", get(questions::list_libraries))
        .route("/{id}/questions", get(questions::list_questions));

    let question_routes = Router::new().route("/{id}", get(questions::get_question));

    let practice_routes = Router::new()
        .route("/next", get(practice::next_question))
        .route("/submit", post(practice::submit_answer))
        .route("/seen", post(practice::mark_seen))
        .route("/daily", get(practice::daily_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let exam_routes = Router::new()
        .route("/generate", get(exam::generate_exam))
        .route("/submit", post(exam::submit_exam))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let points_routes = Router::new()
        .route("/leaderboard", get(points::get_leaderboard))
        // Protected points routes
        .merge(
            Router::new()
                .route("/history", get(points::get_history))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let ai_routes = Router::new()
        .route("/explanations", post(ai::generate_explanation))
        .route("/quota", get(ai::quota_status))
        .route("/presets", get(ai::list_presets))
        .route("/style", put(ai::update_style))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/libraries", post(admin::create_library))
        .route(
            "/libraries/{id}",
            put(admin::update_library).delete(admin::delete_library),
        )
        .route("/libraries/{id}/questions", post(admin::create_question))
        .route("/libraries/{id}/import", post(admin::import_questions))
        .route(
            "/questions/{id}",
            delete(admin::delete_question).put(admin::update_question),
        )
        .route("/config", get(admin::get_config).put(admin::set_config))
        .route("/presets", post(admin::create_preset))
        .route(
            "/presets/{id}",
            put(admin::update_preset).delete(admin::delete_preset),
        )
        .route("/presets/{id}/default", post(admin::set_default_preset))
        .route("/audit-logs", get(admin::list_audit_logs))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/libraries", library_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/practice", practice_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/points", points_routes)
        .nest("/api/ai", ai_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}
