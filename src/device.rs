// src/device.rs
//
// Per-device pseudo-identity and the local "already answered" cache. The
// durable client-side key-value store is injected behind a trait so tests run
// against an in-memory fake. The authoritative ground truth is always the
// response set in the record store; the cache only suppresses duplicate
// submissions and restores UI state after a reload.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

pub const SESSION_KEY: &str = "session_id";
pub const ANSWERED_PREFIX: &str = "answered_";

/// Durable client-side key-value storage with no expiry.
pub trait DeviceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

#[derive(Default)]
pub struct MemoryDeviceStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.inner
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.lock().unwrap().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().keys().cloned().collect()
    }
}

fn answered_key(question_id: Uuid) -> String {
    format!("{ANSWERED_PREFIX}{question_id}")
}

/// Returns this device's session token, minting and persisting one on first
/// use.
pub fn session_id(store: &dyn DeviceStore) -> String {
    if let Some(existing) = store.get(SESSION_KEY) {
        return existing;
    }
    let minted = format!("session_{}", Uuid::new_v4().simple());
    store.set(SESSION_KEY, &minted);
    minted
}

pub fn is_answered(store: &dyn DeviceStore, question_id: Uuid) -> bool {
    store.get(&answered_key(question_id)).as_deref() == Some("true")
}

pub fn mark_answered(store: &dyn DeviceStore, question_id: Uuid) {
    store.set(&answered_key(question_id), "true");
}

pub fn clear_answered(store: &dyn DeviceStore, question_id: Uuid) {
    store.remove(&answered_key(question_id));
}

/// Drops every answered marker on the device, e.g. after a host reset-all.
pub fn clear_all_answered(store: &dyn DeviceStore) {
    for key in store.keys() {
        if key.starts_with(ANSWERED_PREFIX) {
            store.remove(&key);
        }
    }
}

/// Converges the local marker to the remote existence check. Idempotent and
/// safe to run on every room update; in particular a stale "answered" marker
/// left behind by a host reset-all is cleared here.
pub fn reconcile_answered(
    store: &dyn DeviceStore,
    question_id: Uuid,
    remote_has_response: bool,
) -> bool {
    if remote_has_response {
        mark_answered(store, question_id);
    } else {
        clear_answered(store, question_id);
    }
    remote_has_response
}
