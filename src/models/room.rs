// src/models/room.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

/// Snapshot of the presentation view's timeline scroll state, stored as JSONB
/// so a reconnecting presenter can resume where it left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePosition {
    pub month: Option<String>,
    #[serde(rename = "scrollPosition")]
    pub scroll_position: f64,
    #[serde(rename = "activeMomentId")]
    pub active_moment_id: Option<String>,
}

/// Represents the 'rooms' table in the database.
///
/// `active_question_id` is the single nullable pointer that makes "at most
/// one open question per room" structural rather than enforced.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,

    /// Human-entered join code, 6 characters, uppercase, unique.
    pub code: String,

    pub name: Option<String>,

    pub active_question_id: Option<Uuid>,

    /// One-way flag flipped by the host; gates opening questions.
    pub session_started: bool,

    pub timeline_position: Option<Json<TimelinePosition>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new room.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(max = 80, message = "Room name must be at most 80 characters"))]
    pub name: Option<String>,
}
