// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{photo, question, response, room, seed, storage},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (rooms, questions, responses, photos, seeding).
/// * Serves the storage buckets as static files under /storage.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, event hub).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let room_routes = Router::new()
        .route("/room", post(room::create_room))
        .route("/rooms/by-code/{code}", get(room::get_room_by_code))
        .route("/rooms/{room_id}/start", post(room::start_session))
        .route("/rooms/{room_id}/timeline", put(room::save_timeline_position))
        .route("/rooms/{room_id}/watch", get(room::watch_room))
        .route(
            "/rooms/{room_id}/questions",
            get(question::list_questions).post(question::create_question),
        )
        .route(
            "/rooms/{room_id}/questions/{question_id}/open",
            post(question::open_question),
        )
        .route("/rooms/{room_id}/close", post(question::close_question))
        .route("/rooms/{room_id}/reset", post(question::reset_all));

    let response_routes = Router::new()
        .route(
            "/questions/{question_id}/responses",
            get(response::list_responses).post(response::submit_response),
        )
        .route(
            "/questions/{question_id}/results",
            get(response::get_results),
        )
        .route(
            "/questions/{question_id}/responses/watch",
            get(response::watch_responses),
        );

    let media_routes = Router::new()
        .route("/photos", get(photo::list_photos))
        .route("/seed", post(seed::seed))
        .route("/storage/seed", post(seed::storage_seed))
        .route("/storage/list", get(storage::list_files));

    let storage_root = state.config.storage_root.clone();

    Router::new()
        .nest(
            "/api",
            room_routes.merge(response_routes).merge(media_routes),
        )
        .nest_service("/storage", ServeDir::new(storage_root))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
