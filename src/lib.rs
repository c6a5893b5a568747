// src/lib.rs

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod storage;
pub mod tally;
pub mod utils;

// Re-export specific items for convenience if needed
pub use routes::create_router;
