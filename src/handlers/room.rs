// src/handlers/room.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use sqlx::PgPool;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    lifecycle,
    models::room::{CreateRoomRequest, Room, TimelinePosition},
    state::AppState,
};

/// Creates a room with a fresh unique join code.
/// Body is optional; `{name}` if present.
pub async fn create_room(
    State(pool): State<PgPool>,
    payload: Option<Json<CreateRoomRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let name = match payload {
        Some(Json(req)) => {
            req.validate()
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            req.name.filter(|n| !n.is_empty())
        }
        None => None,
    };

    let room = lifecycle::create_room(&pool, name).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// Looks up a room by its human join code (case-insensitive on input).
pub async fn get_room_by_code(
    State(pool): State<PgPool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let room = lifecycle::get_room_by_code(&pool, &code).await?;
    Ok(Json(room))
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let room = lifecycle::start_session(&state.pool, &state.events, room_id).await?;
    Ok(Json(room))
}

/// Persists the presentation view's timeline scroll snapshot.
pub async fn save_timeline_position(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Json(position): Json<TimelinePosition>,
) -> Result<impl IntoResponse, AppError> {
    let room = sqlx::query_as::<_, Room>(
        "UPDATE rooms SET timeline_position = $1 WHERE id = $2 \
         RETURNING id, code, name, active_question_id, session_started, timeline_position, created_at",
    )
    .bind(sqlx::types::Json(&position))
    .bind(room_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    state.events.publish_room(&room);
    Ok(Json(room))
}

/// SSE stream of room updates: the current row, then every published change.
/// Dropping the connection drops the subscription.
pub async fn watch_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let current = lifecycle::get_room(&state.pool, room_id).await?;
    let updates =
        BroadcastStream::new(state.events.watch_room(room_id)).filter_map(|update| update.ok());

    let stream = tokio_stream::once(current)
        .chain(updates)
        .map(|room| Event::default().event("room").json_data(&room));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
