// src/models/response.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'responses' table in the database.
///
/// The store's column is named `answer`; the API field this code exposes is
/// `value`. The rename is applied here so every read carries it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ResponseRow {
    pub id: Uuid,

    pub room_id: Uuid,

    pub question_id: Uuid,

    /// Opaque per-device token, not a user account.
    pub session_id: String,

    #[sqlx(rename = "answer")]
    pub value: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for a participant submitting an answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResponseRequest {
    #[validate(length(min = 1, max = 64, message = "session_id must be 1 to 64 characters"))]
    pub session_id: String,

    #[validate(length(min = 1, max = 2000, message = "value must be 1 to 2000 characters"))]
    pub value: String,
}
