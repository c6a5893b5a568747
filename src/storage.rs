// src/storage.rs
//
// Blob storage backed by directories under the configured storage root: each
// bucket is a subdirectory, and the router serves the root statically so the
// public URLs below resolve. Listing is synchronous filesystem work; handlers
// run it through `spawn_blocking`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::photo::StorageFile;

pub const DEFAULT_BUCKET: &str = "timeline-photos";

pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

pub fn is_image(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}

/// Public URL for a blob: `{base}/storage/{bucket}/{path}`.
pub fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        path.trim_start_matches('/')
    )
}

fn reject_traversal(segment: &str, what: &str) -> Result<(), AppError> {
    let escapes = Path::new(segment)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(AppError::BadRequest(format!(
            "{what} must not contain parent or absolute path segments"
        )));
    }
    Ok(())
}

/// Lists image files in a bucket, optionally descending into subfolders.
/// Paths in the result are relative to the bucket root, `/`-separated, and
/// the list is ordered by creation time (earliest first).
pub fn list_bucket(
    storage_root: &Path,
    base_url: &str,
    bucket: &str,
    folder: &str,
    recursive: bool,
) -> Result<Vec<StorageFile>, AppError> {
    reject_traversal(bucket, "bucket")?;
    reject_traversal(folder, "folder")?;

    let bucket_root = storage_root.join(bucket);
    let start = if folder.is_empty() {
        bucket_root.clone()
    } else {
        bucket_root.join(folder)
    };

    if !start.is_dir() {
        return Err(AppError::InternalServerError(format!(
            "storage listing failed: {} is not a readable directory",
            start.display()
        )));
    }

    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = vec![start];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| {
            AppError::InternalServerError(format!("storage listing failed for {}: {e}", dir.display()))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                AppError::InternalServerError(format!("storage listing failed: {e}"))
            })?;
            let path = entry.path();

            if path.is_dir() {
                if recursive {
                    pending.push(path);
                }
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_image(&name) {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| {
                AppError::InternalServerError(format!("storage metadata failed: {e}"))
            })?;
            let modified: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());
            // Creation time is unavailable on some filesystems.
            let created: DateTime<Utc> = metadata
                .created()
                .map(DateTime::from)
                .unwrap_or(modified);

            let rel = path
                .strip_prefix(&bucket_root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            files.push(StorageFile {
                public_url: public_url(base_url, bucket, &rel),
                name,
                path: rel,
                size: metadata.len(),
                created_at: created,
                updated_at: modified,
            });
        }
    }

    files.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(files)
}
