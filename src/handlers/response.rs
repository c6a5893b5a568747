// src/handlers/response.rs

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    lifecycle,
    models::{
        question::{QuestionOptions, QuestionType},
        response::{ResponseRow, SubmitResponseRequest},
    },
    state::AppState,
    tally,
};

/// Fallback re-poll period masking lost change notifications.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

async fn fetch_responses(pool: &PgPool, question_id: Uuid) -> Result<Vec<ResponseRow>, AppError> {
    let rows = sqlx::query_as::<_, ResponseRow>(
        "SELECT id, room_id, question_id, session_id, answer, created_at \
         FROM responses WHERE question_id = $1 ORDER BY created_at ASC",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Scale answers must be `{"name", "value"}` JSON or a bare number, with the
/// value on the 0-100 line.
fn check_scale_value(raw: &str) -> Result<(), AppError> {
    #[derive(Deserialize)]
    struct Wire {
        value: f64,
    }

    let value = match serde_json::from_str::<Wire>(raw) {
        Ok(wire) => Some(wire.value),
        Err(_) => raw.trim().parse::<f64>().ok(),
    };
    match value {
        Some(v) if (0.0..=100.0).contains(&v) => Ok(()),
        _ => Err(AppError::BadRequest(
            "Scale answers must carry a value between 0 and 100".to_string(),
        )),
    }
}

/// Submits a participant's answer.
///
/// Uniqueness per (question, session) is advisory: the row is inserted either
/// way and `duplicate` tells the device its answered-cache was stale.
pub async fn submit_response(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<SubmitResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let question = lifecycle::get_question(&state.pool, question_id).await?;
    if question.question_type == QuestionType::Scale {
        check_scale_value(&payload.value)?;
    }

    let duplicate =
        lifecycle::has_response(&state.pool, question_id, &payload.session_id).await?;

    let response = sqlx::query_as::<_, ResponseRow>(
        "INSERT INTO responses (room_id, question_id, session_id, answer) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, room_id, question_id, session_id, answer, created_at",
    )
    .bind(question.room_id)
    .bind(question_id)
    .bind(&payload.session_id)
    .bind(&payload.value)
    .fetch_one(&state.pool)
    .await?;

    state.events.publish_response(&response);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": response.id, "duplicate": duplicate })),
    ))
}

/// Raw responses in store-return order, with the `answer` column already
/// renamed to `value`.
pub async fn list_responses(
    State(pool): State<PgPool>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    lifecycle::get_question(&pool, question_id).await?;
    let responses = fetch_responses(&pool, question_id).await?;
    Ok(Json(responses))
}

/// Chart-ready aggregation for the question's type.
pub async fn get_results(
    State(pool): State<PgPool>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let question = lifecycle::get_question(&pool, question_id).await?;
    let responses = fetch_responses(&pool, question_id).await?;

    let body = match question.question_type {
        QuestionType::Mcq => {
            let Some(sqlx::types::Json(QuestionOptions::Choices(options))) = question.options
            else {
                return Err(AppError::InternalServerError(format!(
                    "mcq question {question_id} has no options list"
                )));
            };
            let tally = tally::tally_choices(&options, &responses);
            serde_json::json!({
                "type": "mcq",
                "prompt": question.prompt,
                "counts": tally.counts,
                "excluded": tally.excluded,
                "total": tally.total,
            })
        }
        QuestionType::Scale => {
            let Some(sqlx::types::Json(QuestionOptions::ScaleLabels { left, right })) =
                question.options
            else {
                return Err(AppError::InternalServerError(format!(
                    "scale question {question_id} has no labels"
                )));
            };
            let board = tally::scale_board(&responses);
            serde_json::json!({
                "type": "scale",
                "prompt": question.prompt,
                "left": left,
                "right": right,
                "dots": board.dots,
                "dropped": board.dropped,
                "total": responses.len(),
            })
        }
        QuestionType::Text => serde_json::json!({
            "type": "text",
            "prompt": question.prompt,
            "values": responses.iter().map(|r| r.value.clone()).collect::<Vec<_>>(),
            "total": responses.len(),
        }),
    };

    Ok(Json(body))
}

/// SSE stream for the live results view: an initial snapshot, then each
/// insert as it is published, with a fallback re-poll every 2 seconds that
/// emits a fresh snapshot only when the result-set size changed.
pub async fn watch_responses(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    lifecycle::get_question(&state.pool, question_id).await?;

    let (tx, rx) = mpsc::channel::<Event>(16);
    let updates = state.events.watch_responses(question_id);
    tokio::spawn(pump_responses(state.pool.clone(), question_id, tx, updates));

    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Feeds one watcher's SSE channel. Exits as soon as the client side of `tx`
/// is gone, so a torn-down view stops polling the database.
async fn pump_responses(
    pool: PgPool,
    question_id: Uuid,
    tx: mpsc::Sender<Event>,
    mut updates: broadcast::Receiver<ResponseRow>,
) {
    let mut known = match fetch_responses(&pool, question_id).await {
        Ok(rows) => {
            let len = rows.len();
            if let Ok(event) = Event::default().event("snapshot").json_data(&rows) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            len
        }
        Err(_) => 0,
    };

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    poll.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            update = updates.recv() => match update {
                Ok(row) => {
                    known += 1;
                    if let Ok(event) = Event::default().event("response").json_data(&row) {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = poll.tick() => {
                // Compare sizes before replacing local state so a
                // just-applied insert is not discarded by a slow poll.
                if let Ok(rows) = fetch_responses(&pool, question_id).await {
                    if rows.len() != known {
                        known = rows.len();
                        if let Ok(event) = Event::default().event("snapshot").json_data(&rows) {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn watcher_task_stops_when_the_client_disconnects() {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .expect("Failed to connect to Postgres for testing");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to migrate database");

        let (tx, mut rx) = mpsc::channel::<Event>(16);
        let (publisher, updates) = tokio::sync::broadcast::channel::<ResponseRow>(4);

        let task = tokio::spawn(pump_responses(pool, Uuid::new_v4(), tx, updates));

        // The initial snapshot arrives, then the client goes away.
        rx.recv().await.expect("expected the initial snapshot");
        drop(rx);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("pump should exit once the receiver is dropped")
            .unwrap();
        drop(publisher);
    }

    #[test]
    fn scale_values_accept_json_and_bare_numbers() {
        assert!(check_scale_value(r#"{"name":"Mo","value":42}"#).is_ok());
        assert!(check_scale_value("42").is_ok());
        assert!(check_scale_value(r#"{"name":"Mo","value":142}"#).is_err());
        assert!(check_scale_value("cocoa").is_err());
    }
}
