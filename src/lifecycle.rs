// src/lifecycle.rs
//
// Room and question lifecycle against the record store. Question states are
// observed through two fields: `used`, and whether the room's
// `active_question_id` points at the question. Unopened -> Open -> Closed,
// with reset-all as the only way back. Any in-memory view is a cache that can
// be stale; the open guard re-validates against a fresh read before the
// irreversible transition.

use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::events::EventHub;
use crate::models::{question::Question, room::Room};

pub const CODE_LENGTH: usize = 6;
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_ATTEMPTS: usize = 10;

const ROOM_COLUMNS: &str =
    "id, code, name, active_question_id, session_started, timeline_position, created_at";
const QUESTION_COLUMNS: &str =
    "id, room_id, type, prompt, options, order_index, used, created_at";

/// Lifecycle guard rejections. Non-fatal: the transition is aborted without
/// mutating state and the caller resynchronizes from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SessionNotStarted,
    AlreadyOpen,
    AlreadyUsed,
    NoActiveQuestion,
}

impl Rejection {
    pub fn message(self) -> &'static str {
        match self {
            Rejection::SessionNotStarted => "Start the session before opening questions",
            Rejection::AlreadyOpen => "This question is already open",
            Rejection::AlreadyUsed => "This question has already been used; reset all to reopen it",
            Rejection::NoActiveQuestion => "No question is currently open",
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        AppError::Conflict(rejection.message().to_string())
    }
}

/// The store may hand back `used` as a boolean, a number, or a string
/// depending on what wrote it. Anything truthy counts.
pub fn used_flag_set(raw: &serde_json::Value) -> bool {
    match raw {
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(n) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        serde_json::Value::String(s) => s == "true",
        _ => false,
    }
}

pub fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub async fn get_room(pool: &PgPool, room_id: Uuid) -> Result<Room, AppError> {
    sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
        .bind(room_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))
}

/// Codes are stored uppercase; normalize here so every caller is
/// case-insensitive.
pub async fn get_room_by_code(pool: &PgPool, code: &str) -> Result<Room, AppError> {
    sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE code = $1"))
        .bind(code.to_uppercase())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No room with code {code}")))
}

pub async fn get_questions(pool: &PgPool, room_id: Uuid) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE room_id = $1 ORDER BY order_index ASC"
    ))
    .bind(room_id)
    .fetch_all(pool)
    .await?;
    Ok(questions)
}

pub async fn get_question(pool: &PgPool, question_id: Uuid) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
    ))
    .bind(question_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
}

/// Allocates a room with a unique 6-character uppercase code, retrying on
/// collision up to the attempt budget. No partial rooms are left behind on
/// failure; the single insert is atomic at the store.
pub async fn create_room(pool: &PgPool, name: Option<String>) -> Result<Room, AppError> {
    create_room_with(pool, name, random_code).await
}

pub async fn create_room_with<F>(
    pool: &PgPool,
    name: Option<String>,
    mut next_code: F,
) -> Result<Room, AppError>
where
    F: FnMut() -> String,
{
    for _ in 0..CODE_ATTEMPTS {
        let code = next_code();
        let taken: Option<Uuid> = sqlx::query_scalar("SELECT id FROM rooms WHERE code = $1")
            .bind(&code)
            .fetch_optional(pool)
            .await?;
        if taken.is_some() {
            continue;
        }
        let room = sqlx::query_as::<_, Room>(&format!(
            "INSERT INTO rooms (code, name) VALUES ($1, $2) RETURNING {ROOM_COLUMNS}"
        ))
        .bind(&code)
        .bind(&name)
        .fetch_one(pool)
        .await?;
        return Ok(room);
    }
    Err(AppError::CodeGenerationExhausted)
}

/// One-way: gates opening questions and is never unset, not even by
/// reset-all.
pub async fn start_session(
    pool: &PgPool,
    events: &EventHub,
    room_id: Uuid,
) -> Result<Room, AppError> {
    let room = sqlx::query_as::<_, Room>(&format!(
        "UPDATE rooms SET session_started = TRUE WHERE id = $1 RETURNING {ROOM_COLUMNS}"
    ))
    .bind(room_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;
    events.publish_room(&room);
    Ok(room)
}

/// Unopened -> Open. Clears pre-existing responses so the question starts
/// with a clean slate, then flips the room's active pointer.
pub async fn open_question(
    pool: &PgPool,
    events: &EventHub,
    room_id: Uuid,
    question_id: Uuid,
) -> Result<Room, AppError> {
    let room = get_room(pool, room_id).await?;
    if !room.session_started {
        return Err(Rejection::SessionNotStarted.into());
    }

    let question = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND room_id = $2"
    ))
    .bind(question_id)
    .bind(room_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Question not found in this room".to_string()))?;

    if room.active_question_id == Some(question.id) {
        return Err(Rejection::AlreadyOpen.into());
    }

    // The `used` flag loaded above may be stale against a concurrent host
    // action. Re-read the authoritative value immediately before the
    // irreversible transition, tolerating type drift in the store.
    let fresh: serde_json::Value =
        sqlx::query_scalar("SELECT to_jsonb(used) FROM questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    if used_flag_set(&fresh) {
        return Err(Rejection::AlreadyUsed.into());
    }

    sqlx::query("DELETE FROM responses WHERE question_id = $1")
        .bind(question_id)
        .execute(pool)
        .await?;

    let room = sqlx::query_as::<_, Room>(&format!(
        "UPDATE rooms SET active_question_id = $1 WHERE id = $2 RETURNING {ROOM_COLUMNS}"
    ))
    .bind(question_id)
    .bind(room_id)
    .fetch_one(pool)
    .await?;

    events.publish_room(&room);
    Ok(room)
}

/// Open -> Closed/Used. Marking `used` is best effort: even if that write
/// misbehaves, the active pointer is still cleared so the room never stays
/// stuck on a closed question. A final read-back reconciles local state.
pub async fn close_question(
    pool: &PgPool,
    events: &EventHub,
    room_id: Uuid,
) -> Result<Room, AppError> {
    let room = get_room(pool, room_id).await?;
    let Some(active_id) = room.active_question_id else {
        return Err(Rejection::NoActiveQuestion.into());
    };

    let marked: Result<Option<bool>, sqlx::Error> =
        sqlx::query_scalar("UPDATE questions SET used = TRUE WHERE id = $1 RETURNING used")
            .bind(active_id)
            .fetch_optional(pool)
            .await;
    match marked {
        Ok(Some(true)) => {}
        Ok(readback) => tracing::warn!(
            question = %active_id,
            ?readback,
            "used flag did not read back true after close"
        ),
        Err(e) => tracing::error!(question = %active_id, error = %e, "failed to mark question used"),
    }

    sqlx::query("UPDATE rooms SET active_question_id = NULL WHERE id = $1")
        .bind(room_id)
        .execute(pool)
        .await?;

    let room = get_room(pool, room_id).await?;
    events.publish_room(&room);
    Ok(room)
}

#[derive(Debug, serde::Serialize)]
pub struct ResetReport {
    /// Questions fully reset (responses cleared and `used` flipped back).
    pub reset: usize,
    /// Per-item failures. Completed work is not rolled back.
    pub errors: Vec<String>,
}

/// Closed/Used -> Unopened for every question in the room: deletes all
/// responses and clears `used`. The only transition out of Closed/Used.
pub async fn reset_all(
    pool: &PgPool,
    events: &EventHub,
    room_id: Uuid,
) -> Result<ResetReport, AppError> {
    get_room(pool, room_id).await?;
    let questions = get_questions(pool, room_id).await?;
    if questions.is_empty() {
        return Err(AppError::NotFound("No questions found to reset".to_string()));
    }

    let mut report = ResetReport {
        reset: 0,
        errors: Vec::new(),
    };

    for question in &questions {
        let mut intact = true;
        if let Err(e) = sqlx::query("DELETE FROM responses WHERE question_id = $1")
            .bind(question.id)
            .execute(pool)
            .await
        {
            report
                .errors
                .push(format!("clear responses for {}: {e}", question.id));
            intact = false;
        }
        if let Err(e) = sqlx::query("UPDATE questions SET used = FALSE WHERE id = $1")
            .bind(question.id)
            .execute(pool)
            .await
        {
            report
                .errors
                .push(format!("reset used flag for {}: {e}", question.id));
            intact = false;
        }
        if intact {
            report.reset += 1;
        }
    }

    let room = get_room(pool, room_id).await?;
    events.publish_room(&room);
    Ok(report)
}

/// Authoritative existence check behind the device answered-cache: has this
/// session already answered the question?
pub async fn has_response(
    pool: &PgPool,
    question_id: Uuid,
    session_id: &str,
) -> Result<bool, AppError> {
    let found: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM responses WHERE question_id = $1 AND session_id = $2 LIMIT 1")
            .bind(question_id)
            .bind(session_id)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}
