// src/events.rs

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{response::ResponseRow, room::Room};

const CHANNEL_CAPACITY: usize = 32;

/// In-process change-notification hub.
///
/// Mutating handlers publish the fresh row after a successful write; watchers
/// receive it over a broadcast channel. Dropping the receiver is the
/// unsubscribe, so a torn-down SSE connection releases its slot exactly once.
#[derive(Default)]
pub struct EventHub {
    rooms: Mutex<HashMap<Uuid, broadcast::Sender<Room>>>,
    responses: Mutex<HashMap<Uuid, broadcast::Sender<ResponseRow>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch_room(&self, room_id: Uuid) -> broadcast::Receiver<Room> {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish_room(&self, room: &Room) {
        let mut rooms = self.rooms.lock().unwrap();
        // Sweep channels nobody subscribes to anymore; the map should only
        // track rooms with at least one live watcher.
        rooms.retain(|_, tx| tx.receiver_count() > 0);
        if let Some(tx) = rooms.get(&room.id) {
            // Errors only mean nobody is listening right now.
            let _ = tx.send(room.clone());
        }
    }

    pub fn watch_responses(&self, question_id: Uuid) -> broadcast::Receiver<ResponseRow> {
        let mut responses = self.responses.lock().unwrap();
        responses
            .entry(question_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish_response(&self, response: &ResponseRow) {
        let mut responses = self.responses.lock().unwrap();
        responses.retain(|_, tx| tx.receiver_count() > 0);
        if let Some(tx) = responses.get(&response.question_id) {
            let _ = tx.send(response.clone());
        }
    }

    #[cfg(test)]
    fn room_channels(&self) -> usize {
        self.rooms.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: Uuid) -> Room {
        Room {
            id,
            code: "ABC123".to_string(),
            name: None,
            active_question_id: None,
            session_started: false,
            timeline_position: None,
            created_at: None,
        }
    }

    #[test]
    fn live_watchers_receive_published_rooms() {
        let hub = EventHub::new();
        let id = Uuid::new_v4();
        let mut rx = hub.watch_room(id);

        hub.publish_room(&room(id));

        let received = rx.try_recv().expect("expected the published room");
        assert_eq!(received.id, id);
    }

    #[test]
    fn channels_without_watchers_are_swept_on_publish() {
        let hub = EventHub::new();
        let abandoned = Uuid::new_v4();
        drop(hub.watch_room(abandoned));

        let watched = Uuid::new_v4();
        let _rx = hub.watch_room(watched);
        assert_eq!(hub.room_channels(), 2);

        hub.publish_room(&room(watched));
        assert_eq!(hub.room_channels(), 1);
    }
}
