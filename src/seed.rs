// src/seed.rs
//
// Timeline photo seeding: from the curated moments file, from placeholder
// images, or from a storage bucket. All three process items one by one and
// collect per-item error strings; completed inserts are never rolled back.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use crate::config::Config;
use crate::lifecycle;
use crate::storage::{self, DEFAULT_BUCKET};
use crate::utils::photo::{MONTH_NAMES, parse_photo, sort_by_date};

#[derive(Debug, serde::Serialize)]
pub struct SeedOutcome {
    pub success: bool,
    pub photos_created: usize,
    /// Only meaningful for the storage mode.
    pub photos_found: Option<usize>,
    pub errors: Vec<String>,
}

impl SeedOutcome {
    fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            photos_created: 0,
            photos_found: None,
            errors,
        }
    }
}

/// One curated entry in the moments JSON file.
#[derive(Debug, Deserialize)]
pub struct MomentRecord {
    pub id: String,
    pub date: String,
    pub photo_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
}

/// Accepts either a full URL or a bucket-relative path (with or without the
/// bucket prefix) and returns something a browser can load.
pub fn moment_public_url(base_url: &str, photo_url: &str) -> String {
    if photo_url.starts_with("http://") || photo_url.starts_with("https://") {
        return photo_url.to_string();
    }
    let path = photo_url.trim_start_matches('/');
    let path = path.strip_prefix("timeline-photos/").unwrap_or(path);
    storage::public_url(base_url, DEFAULT_BUCKET, path)
}

/// Moments carry either a full timestamp or a plain `YYYY-MM-DD` date.
pub fn parse_moment_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

async fn insert_photo(
    pool: &PgPool,
    storage_path: &str,
    public_url: &str,
    taken_at: Option<DateTime<Utc>>,
    caption: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO timeline_photos (storage_path, public_url, taken_at, caption) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(storage_path)
    .bind(public_url)
    .bind(taken_at)
    .bind(caption)
    .execute(pool)
    .await?;
    Ok(())
}

async fn clear_photos(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM timeline_photos").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Seeds photos from the configured moments JSON file.
pub async fn seed_from_moments(
    pool: &PgPool,
    config: &Config,
    room_code: &str,
    clear_existing: bool,
) -> SeedOutcome {
    if let Err(e) = lifecycle::get_room_by_code(pool, room_code).await {
        return SeedOutcome::failed(vec![format!(
            "Failed to find room with code {room_code}: {e}"
        )]);
    }

    let raw = match tokio::fs::read_to_string(&config.moments_file).await {
        Ok(raw) => raw,
        Err(e) => {
            return SeedOutcome::failed(vec![format!(
                "Failed to read moments file {}: {e}",
                config.moments_file.display()
            )]);
        }
    };
    let moments: Vec<MomentRecord> = match serde_json::from_str(&raw) {
        Ok(moments) => moments,
        Err(e) => return SeedOutcome::failed(vec![format!("Invalid moments file: {e}")]),
    };

    let mut errors = Vec::new();
    let mut photos_created = 0;

    if clear_existing {
        match clear_photos(pool).await {
            Ok(removed) => tracing::info!(removed, "cleared existing timeline photos"),
            Err(e) => return SeedOutcome::failed(vec![format!("Failed to clear photos: {e}")]),
        }
    }

    for moment in &moments {
        let taken_at = parse_moment_date(&moment.date);
        if taken_at.is_none() {
            errors.push(format!(
                "Moment {} has unparseable date {:?}",
                moment.id, moment.date
            ));
            continue;
        }
        let public_url = moment_public_url(&config.public_base_url, &moment.photo_url);
        if let Err(e) = insert_photo(
            pool,
            &moment.photo_url,
            &public_url,
            taken_at,
            moment.caption.as_deref(),
        )
        .await
        {
            errors.push(format!("Failed to create photo for {}: {e}", moment.id));
        } else {
            photos_created += 1;
        }
    }

    SeedOutcome {
        success: errors.is_empty(),
        photos_created,
        photos_found: None,
        errors,
    }
}

/// Seeds up to twelve placeholder photos, one per month of the current year.
pub async fn seed_samples(pool: &PgPool, room_code: &str, count: usize) -> SeedOutcome {
    if let Err(e) = lifecycle::get_room_by_code(pool, room_code).await {
        return SeedOutcome::failed(vec![format!(
            "Failed to find room with code {room_code}: {e}"
        )]);
    }

    let mut errors = Vec::new();
    let mut photos_created = 0;
    let year = Utc::now().year();

    for i in 0..count.min(12) {
        let month = MONTH_NAMES[i];
        let Some(taken_at) = Utc
            .with_ymd_and_hms(year, i as u32 + 1, 15, 0, 0, 0)
            .single()
        else {
            continue;
        };
        let storage_path = format!("sample-{room_code}-{i}.jpg");
        let public_url = format!("https://picsum.photos/seed/{room_code}-{i}/800/600");
        let caption = format!("Sample photo from {month}");
        if let Err(e) =
            insert_photo(pool, &storage_path, &public_url, Some(taken_at), Some(&caption)).await
        {
            errors.push(format!("Failed to create sample photo for {month}: {e}"));
        } else {
            photos_created += 1;
        }
    }

    SeedOutcome {
        success: errors.is_empty(),
        photos_created,
        photos_found: None,
        errors,
    }
}

/// Seeds from a storage bucket: recursive listing, date/caption extraction,
/// then one insert per photo in date order.
pub async fn seed_from_storage(
    pool: &PgPool,
    config: &Config,
    room_code: &str,
    bucket: &str,
    folder: &str,
    clear_existing: bool,
) -> SeedOutcome {
    if let Err(e) = lifecycle::get_room_by_code(pool, room_code).await {
        return SeedOutcome::failed(vec![format!(
            "Failed to find room with code {room_code}: {e}"
        )]);
    }

    let storage_root = config.storage_root.clone();
    let base_url = config.public_base_url.clone();
    let bucket = bucket.to_string();
    let folder = folder.to_string();
    let listed = tokio::task::spawn_blocking(move || {
        storage::list_bucket(&storage_root, &base_url, &bucket, &folder, true)
    })
    .await;

    let files = match listed {
        Ok(Ok(files)) => files,
        Ok(Err(e)) => {
            return SeedOutcome::failed(vec![format!(
                "Failed to list photos from storage: {e}"
            )]);
        }
        Err(e) => {
            return SeedOutcome::failed(vec![format!("Storage listing task failed: {e}")]);
        }
    };

    let photos_found = files.len();

    // Clear even when the bucket came back empty: a destructive re-seed
    // against an emptied bucket must not keep stale photos around.
    if clear_existing {
        match clear_photos(pool).await {
            Ok(removed) => tracing::info!(removed, "cleared existing timeline photos"),
            Err(e) => {
                let mut outcome =
                    SeedOutcome::failed(vec![format!("Failed to clear photos: {e}")]);
                outcome.photos_found = Some(photos_found);
                return outcome;
            }
        }
    }

    if photos_found == 0 {
        return SeedOutcome {
            success: true,
            photos_created: 0,
            photos_found: Some(0),
            errors: Vec::new(),
        };
    }

    let mut photos = files.into_iter().map(parse_photo).collect::<Vec<_>>();
    sort_by_date(&mut photos);

    let mut errors = Vec::new();
    let mut photos_created = 0;
    for photo in &photos {
        if let Err(e) = insert_photo(
            pool,
            &photo.file.path,
            &photo.file.public_url,
            Some(photo.date),
            photo.caption.as_deref(),
        )
        .await
        {
            errors.push(format!(
                "Failed to create photo for {}: {e}",
                photo.file.name
            ));
        } else {
            photos_created += 1;
        }
    }

    SeedOutcome {
        success: errors.is_empty(),
        photos_created,
        photos_found: Some(photos_found),
        errors,
    }
}
