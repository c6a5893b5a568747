// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    lifecycle,
    models::question::{CreateQuestionRequest, Question},
    state::AppState,
};

/// Lists a room's questions in display order.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    lifecycle::get_room(&pool, room_id).await?;
    let questions = lifecycle::get_questions(&pool, room_id).await?;
    Ok(Json(questions))
}

/// Creates a question during host setup.
pub async fn create_question(
    State(pool): State<PgPool>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    payload
        .check_options()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;
    lifecycle::get_room(&pool, room_id).await?;

    let question = sqlx::query_as::<_, Question>(
        "INSERT INTO questions (room_id, type, prompt, options, order_index) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, room_id, type, prompt, options, order_index, used, created_at",
    )
    .bind(room_id)
    .bind(payload.question_type)
    .bind(&payload.prompt)
    .bind(payload.options.map(sqlx::types::Json))
    .bind(payload.order_index)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn open_question(
    State(state): State<AppState>,
    Path((room_id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let room = lifecycle::open_question(&state.pool, &state.events, room_id, question_id).await?;
    Ok(Json(room))
}

pub async fn close_question(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let room = lifecycle::close_question(&state.pool, &state.events, room_id).await?;
    Ok(Json(room))
}

/// Bulk reset of every question in the room. Destructive; partial failure is
/// reported with per-item errors and nothing is rolled back.
pub async fn reset_all(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let report = lifecycle::reset_all(&state.pool, &state.events, room_id).await?;

    if report.errors.is_empty() {
        Ok(Json(serde_json::json!({
            "success": true,
            "reset": report.reset,
        }))
        .into_response())
    } else {
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "success": false,
                "reset": report.reset,
                "errors": report.errors,
            })),
        )
            .into_response())
    }
}
