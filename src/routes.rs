// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, course, progress, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, courses, quizzes, progress).
/// * Applies global middleware (Trace, CORS) and rate limiting on auth.
/// * Injects global state (pool + config).
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

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(4)
        .burst_size(10)
        .finish()
        .unwrap();

    let governor_conf = Arc::new(governor_conf);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(GovernorLayer::new(governor_conf));

    let course_routes = Router::new()
        .route("/", get(course::list_courses))
        .route("/{id}", get(course::get_course))
        // Enrolled-student routes
        .merge(
            Router::new()
                .route("/{id}/enroll", post(course::enroll))
                .route("/{id}/content", get(course::list_course_content))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        // Instructor routes: auth first, then role check
        .merge(
            Router::new()
                .route("/", post(course::create_course))
                .route("/{id}/modules", post(course::create_module))
                .route(
                    "/{id}/modules/{module_id}/content",
                    post(course::create_content),
                )
                .route("/{id}/students", get(course::list_students))
                .layer(middleware::from_fn(instructor_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let quiz_routes = Router::new()
        .route("/{id}", get(quiz::get_quiz))
        .merge(
            Router::new()
                .route(
                    "/{id}/attempts",
                    post(quiz::submit_attempt).get(quiz::list_attempts),
                )
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/{id}", delete(quiz::delete_quiz))
                .layer(middleware::from_fn(instructor_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let progress_routes = Router::new()
        .route("/courses/{course_id}", get(progress::get_enrollment_progress))
        .route("/courses/{course_id}/locked", get(progress::get_locked_content))
        .route("/courses/{course_id}/reset", post(progress::reset_progress))
        .route(
            "/courses/{course_id}/complete",
            post(progress::force_complete_course),
        )
        .route(
            "/courses/{course_id}/modules/{module_id}/content/{content_id}/complete",
            post(progress::mark_content_complete),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/progress", progress_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
