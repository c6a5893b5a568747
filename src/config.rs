// src/config.rs

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub port: u16,
    /// Root directory holding storage buckets (each bucket is a subdirectory).
    pub storage_root: PathBuf,
    /// Base URL prepended to `/storage/{bucket}/{path}` public links.
    pub public_base_url: String,
    /// JSON file with curated "moments" used by the moments seed mode.
    pub moments_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let storage_root = env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storage"));

        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));

        let moments_file = env::var("MOMENTS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/moments.json"));

        Self {
            database_url,
            rust_log,
            port,
            storage_root,
            public_base_url,
            moments_file,
        }
    }
}
