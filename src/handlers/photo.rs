// src/handlers/photo.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{error::AppError, models::photo::TimelinePhoto};

/// All timeline photos, earliest first.
pub async fn list_photos(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let photos = sqlx::query_as::<_, TimelinePhoto>(
        "SELECT id, storage_path, public_url, taken_at, caption, location, created_at \
         FROM timeline_photos ORDER BY taken_at ASC",
    )
    .fetch_all(&pool)
    .await?;
    Ok(Json(photos))
}
