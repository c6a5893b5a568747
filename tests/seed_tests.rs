// tests/seed_tests.rs
//
// Seeding and storage-listing flows. Like the API tests these need a real
// database via DATABASE_URL and pass vacuously without one; storage is a
// throwaway directory per test run.

use sipnsleigh::{config::Config, events::EventHub, lifecycle, routes, state::AppState};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

struct TestApp {
    address: String,
    pool: PgPool,
    storage_root: PathBuf,
}

async fn spawn_app() -> Option<TestApp> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let storage_root = std::env::temp_dir().join(format!(
        "sipnsleigh-seed-{}",
        uuid::Uuid::new_v4().simple()
    ));
    fs::create_dir_all(&storage_root).expect("Failed to create storage root");

    let config = Config {
        database_url: database_url.clone(),
        rust_log: "error".to_string(),
        port: 0,
        storage_root: storage_root.clone(),
        public_base_url: "http://localhost:3000".to_string(),
        moments_file: PathBuf::from("data/moments.json"),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        events: Arc::new(EventHub::new()),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(TestApp {
        address,
        pool,
        storage_root,
    })
}

fn populate_bucket(storage_root: &PathBuf) {
    let bucket = storage_root.join("timeline-photos");
    fs::create_dir_all(bucket.join("2025/03")).unwrap();
    fs::create_dir_all(bucket.join("2025/07")).unwrap();
    fs::write(bucket.join("2025/03/2025-03-08-snow-day.jpg"), b"jpg").unwrap();
    fs::write(bucket.join("2025/07/20250704_fireworks.png"), b"png").unwrap();
    // Non-image files never show up in listings
    fs::write(bucket.join("2025/03/notes.txt"), b"txt").unwrap();
}

async fn create_room_code(client: &reqwest::Client, address: &str) -> String {
    let room: serde_json::Value = client
        .post(&format!("{}/api/room", address))
        .json(&serde_json::json!({ "name": "Seed Test" }))
        .send()
        .await
        .expect("Failed to create room")
        .json()
        .await
        .unwrap();
    room["code"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn seed_requires_a_room_code() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/seed", app.address))
        .json(&serde_json::json!({ "type": "sample" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "roomCode is required");
}

#[tokio::test]
async fn seed_rejects_unknown_modes() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let code = create_room_code(&client, &app.address).await;

    let response = client
        .post(&format!("{}/api/seed", app.address))
        .json(&serde_json::json!({ "roomCode": code, "type": "everything" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn sample_seeding_creates_placeholder_photos() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let code = create_room_code(&client, &app.address).await;

    let response = client
        .post(&format!("{}/api/seed", app.address))
        .json(&serde_json::json!({ "roomCode": code, "type": "sample", "count": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["photosCreated"], 3);

    let photos: Vec<serde_json::Value> = client
        .get(&format!("{}/api/photos", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(photos.len() >= 3);
}

#[tokio::test]
async fn storage_listing_parses_dates_and_groups_by_month() {
    let Some(app) = spawn_app().await else { return };
    populate_bucket(&app.storage_root);
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(&format!(
            "{}/api/storage/list?recursive=true",
            app.address
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);

    let files = body["files"].as_array().unwrap();
    // Sorted by extracted date, so March precedes July
    assert_eq!(files[0]["month"], "March");
    assert_eq!(files[0]["year"], 2025);
    assert_eq!(files[0]["caption"], "Snow Day");
    assert_eq!(files[1]["month"], "July");

    let grouped = body["groupedByMonth"].as_object().unwrap();
    assert!(grouped.contains_key("March 2025"));
    assert!(grouped.contains_key("July 2025"));
}

#[tokio::test]
async fn storage_seeding_reports_found_and_created() {
    let Some(app) = spawn_app().await else { return };
    populate_bucket(&app.storage_root);
    let client = reqwest::Client::new();
    let code = create_room_code(&client, &app.address).await;

    let response = client
        .post(&format!("{}/api/storage/seed", app.address))
        .json(&serde_json::json!({ "roomCode": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["photosFound"], 2);
    assert_eq!(body["photosCreated"], 2);
}

#[tokio::test]
async fn seeding_accepts_lowercase_room_codes() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let code = create_room_code(&client, &app.address).await;

    let response = client
        .post(&format!("{}/api/seed", app.address))
        .json(&serde_json::json!({
            "roomCode": code.to_lowercase(),
            "type": "sample",
            "count": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["photosCreated"], 1);
}

#[tokio::test]
async fn destructive_reseed_clears_even_when_the_bucket_is_empty() {
    let Some(app) = spawn_app().await else { return };
    fs::create_dir_all(app.storage_root.join("timeline-photos")).unwrap();
    let client = reqwest::Client::new();
    let code = create_room_code(&client, &app.address).await;

    let marker = format!("stale-{}.jpg", uuid::Uuid::new_v4().simple());
    sqlx::query(
        "INSERT INTO timeline_photos (storage_path, public_url) VALUES ($1, $2)",
    )
    .bind(&marker)
    .bind("http://localhost:3000/storage/timeline-photos/stale.jpg")
    .execute(&app.pool)
    .await
    .unwrap();

    let response = client
        .post(&format!("{}/api/storage/seed", app.address))
        .json(&serde_json::json!({ "roomCode": code, "clearExisting": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["photosFound"], 0);

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM timeline_photos WHERE storage_path = $1")
            .bind(&marker)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn room_codes_retry_on_collision_and_give_up_eventually() {
    let Some(app) = spawn_app().await else { return };

    let existing = lifecycle::create_room(&app.pool, None).await.unwrap();
    let taken = existing.code.clone();

    // One collision followed by a fresh code succeeds
    let fresh = format!(
        "T{}",
        &uuid::Uuid::new_v4().simple().to_string()[..5].to_uppercase()
    );
    let mut codes = vec![taken.clone(), fresh.clone()].into_iter();
    let room = lifecycle::create_room_with(&app.pool, None, move || codes.next().unwrap())
        .await
        .unwrap();
    assert_eq!(room.code, fresh);

    // Ten straight collisions exhaust the attempt budget
    let result = lifecycle::create_room_with(&app.pool, None, || taken.clone()).await;
    assert!(result.is_err());
}
