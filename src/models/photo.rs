// src/models/photo.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Represents the 'timeline_photos' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TimelinePhoto {
    pub id: Uuid,
    pub storage_path: String,
    pub public_url: String,
    pub taken_at: Option<chrono::DateTime<chrono::Utc>>,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One file found in a storage bucket, before any date parsing.
#[derive(Debug, Clone, Serialize)]
pub struct StorageFile {
    pub name: String,
    /// Path relative to the bucket root, `/`-separated.
    pub path: String,
    pub size: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "publicUrl")]
    pub public_url: String,
}
