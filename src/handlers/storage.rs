// src/handlers/storage.rs

use axum::{Json, extract::Query, extract::State, response::IntoResponse};
use serde::Deserialize;

use crate::{
    error::AppError,
    state::AppState,
    storage,
    utils::photo::{self, ParsedPhoto},
};

fn default_bucket() -> String {
    storage::DEFAULT_BUCKET.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub recursive: bool,
}

/// Lists a storage bucket with per-file extracted dates and captions, plus a
/// month-keyed grouping for the timeline view.
pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let storage_root = state.config.storage_root.clone();
    let base_url = state.config.public_base_url.clone();
    let bucket = params.bucket.clone();
    let folder = params.folder.clone();

    let files = tokio::task::spawn_blocking(move || {
        storage::list_bucket(&storage_root, &base_url, &bucket, &folder, params.recursive)
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("storage listing task failed: {e}")))??;

    let mut photos: Vec<ParsedPhoto> = files.into_iter().map(photo::parse_photo).collect();
    photo::sort_by_date(&mut photos);
    let grouped = photo::group_by_month(&photos);

    Ok(Json(serde_json::json!({
        "success": true,
        "count": photos.len(),
        "files": photos,
        "groupedByMonth": grouped,
    })))
}
