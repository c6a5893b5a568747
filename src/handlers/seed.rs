// src/handlers/seed.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use crate::{error::AppError, seed, seed::SeedOutcome, state::AppState, storage};

fn default_seed_type() -> String {
    "moments".to_string()
}

fn default_count() -> usize {
    12
}

fn default_bucket() -> String {
    storage::DEFAULT_BUCKET.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRequest {
    pub room_code: Option<String>,
    #[serde(rename = "type", default = "default_seed_type")]
    pub seed_type: String,
    #[serde(default)]
    pub clear_existing: bool,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default)]
    pub folder: String,
    #[serde(default = "default_bucket")]
    pub bucket_name: String,
}

/// Turns a seeding outcome into the response body, 200 on success and 500
/// with the collected per-item errors otherwise.
fn seed_response(outcome: SeedOutcome) -> axum::response::Response {
    let message = match (outcome.success, outcome.photos_found) {
        (true, Some(found)) => format!(
            "Successfully created {} photos from {found} found in storage",
            outcome.photos_created
        ),
        (true, None) => format!("Successfully created {} photos", outcome.photos_created),
        (false, Some(found)) => format!(
            "Created {} photos from {found} found, with {} errors",
            outcome.photos_created,
            outcome.errors.len()
        ),
        (false, None) => format!(
            "Created {} photos with {} errors",
            outcome.photos_created,
            outcome.errors.len()
        ),
    };

    let mut body = serde_json::json!({
        "success": outcome.success,
        "message": message,
        "photosCreated": outcome.photos_created,
    });
    if let Some(found) = outcome.photos_found {
        body["photosFound"] = serde_json::json!(found);
    }
    if !outcome.errors.is_empty() {
        body["errors"] = serde_json::json!(outcome.errors);
    }

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(body)).into_response()
}

/// Seeds the photo timeline from the moments file or with generated samples.
pub async fn seed(
    State(state): State<AppState>,
    Json(payload): Json<SeedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(room_code) = payload.room_code.as_deref() else {
        return Err(AppError::BadRequest("roomCode is required".to_string()));
    };

    let outcome = match payload.seed_type.as_str() {
        "moments" => {
            seed::seed_from_moments(
                &state.pool,
                &state.config,
                room_code,
                payload.clear_existing,
            )
            .await
        }
        "sample" => seed::seed_samples(&state.pool, room_code, payload.count).await,
        "storage" => {
            seed::seed_from_storage(
                &state.pool,
                &state.config,
                room_code,
                &payload.bucket_name,
                &payload.folder,
                payload.clear_existing,
            )
            .await
        }
        _ => {
            return Err(AppError::BadRequest(
                "Invalid type. Use \"moments\", \"sample\", or \"storage\"".to_string(),
            ));
        }
    };

    Ok(seed_response(outcome))
}

/// Storage-dedicated seeding entry: same semantics as `POST /api/seed` with
/// `type: "storage"`.
pub async fn storage_seed(
    State(state): State<AppState>,
    Json(payload): Json<SeedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(room_code) = payload.room_code.as_deref() else {
        return Err(AppError::BadRequest("roomCode is required".to_string()));
    };

    let outcome = seed::seed_from_storage(
        &state.pool,
        &state.config,
        room_code,
        &payload.bucket_name,
        &payload.folder,
        payload.clear_existing,
    )
    .await;

    Ok(seed_response(outcome))
}
