// src/utils/photo.rs
//
// Pure, deterministic photo metadata extraction: capture date from the blob
// path or filename, and a human caption from the filename. Nothing here
// touches the store.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;

use crate::models::photo::StorageFile;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month as usize - 1).copied()
}

static YEAR_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());
static DATE_YMD_DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
static DATE_YMD_COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})(\d{2})(\d{2})").unwrap());
static DATE_MDY_DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})-(\d{2})-(\d{4})").unwrap());

/// Capture date derived from a blob path, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhotoDate {
    pub date: Option<NaiveDate>,
    pub month: Option<&'static str>,
    pub year: Option<i32>,
}

/// Looks for a 4-digit year segment followed by a month segment in the path
/// (`2024/03/…` or `2024/march/…`), then for a date embedded in the filename
/// under `YYYY-MM-DD`, `YYYYMMDD`, `MM-DD-YYYY`, in that order. The day
/// defaults to the 15th when only year and month are known.
pub fn parse_photo_path(path: &str) -> PhotoDate {
    let parts: Vec<&str> = path.split('/').collect();

    for (i, part) in parts.iter().enumerate() {
        if !YEAR_SEGMENT.is_match(part) {
            continue;
        }
        let year: i32 = match part.parse() {
            Ok(y) => y,
            Err(_) => continue,
        };
        let Some(next) = parts.get(i + 1) else {
            continue;
        };
        let month_num = next
            .parse::<u32>()
            .ok()
            .filter(|m| (1..=12).contains(m))
            .or_else(|| {
                MONTH_NAMES
                    .iter()
                    .position(|m| m.eq_ignore_ascii_case(next))
                    .map(|idx| idx as u32 + 1)
            });
        if let Some(m) = month_num {
            if let Some(date) = NaiveDate::from_ymd_opt(year, m, 15) {
                return PhotoDate {
                    date: Some(date),
                    month: month_name(m),
                    year: Some(year),
                };
            }
        }
    }

    let filename = parts.last().copied().unwrap_or("");
    parse_filename_date(filename)
}

fn parse_filename_date(filename: &str) -> PhotoDate {
    let patterns: [(&Regex, [usize; 3]); 3] = [
        (&DATE_YMD_DASHED, [1, 2, 3]),
        (&DATE_YMD_COMPACT, [1, 2, 3]),
        (&DATE_MDY_DASHED, [3, 1, 2]),
    ];

    for (pattern, [y_idx, m_idx, d_idx]) in patterns {
        let Some(caps) = pattern.captures(filename) else {
            continue;
        };
        let year: i32 = caps[y_idx].parse().unwrap_or(0);
        let month: u32 = caps[m_idx].parse().unwrap_or(0);
        let day: u32 = caps[d_idx].parse().unwrap_or(0);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return PhotoDate {
                date: Some(date),
                month: month_name(month),
                year: Some(year),
            };
        }
    }

    PhotoDate::default()
}

static STRIP_YMD_DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}[_-]?").unwrap());
static STRIP_YMD_COMPACT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{8}[_-]?").unwrap());
static STRIP_MDY_DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}-\d{2}-\d{4}[_-]?").unwrap());
static STRIP_LEADING_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[_-]?").unwrap());
static CAMEL_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());

/// Strips known date patterns and leading digits from the filename, then
/// converts the remaining kebab-case/snake_case/camelCase tokens to Title
/// Case. An empty result yields `None`, never an empty string.
pub fn extract_caption(filename: &str) -> Option<String> {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };

    let stripped = STRIP_YMD_DASHED.replace_all(stem, "");
    let stripped = STRIP_YMD_COMPACT.replace_all(&stripped, "");
    let stripped = STRIP_MDY_DASHED.replace_all(&stripped, "");
    let stripped = STRIP_LEADING_DIGITS.replace(&stripped, "");
    let stripped = stripped.trim();

    if stripped.is_empty() {
        return None;
    }

    let spaced = CAMEL_BOUNDARY.replace_all(stripped, "$1 $2");
    let spaced = spaced.replace(['-', '_'], " ");

    let caption = spaced
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ");

    if caption.is_empty() { None } else { Some(caption) }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// A storage file annotated with its derived date, month, year, and caption.
/// Missing dates fall back to the file's stored creation timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedPhoto {
    #[serde(flatten)]
    pub file: StorageFile,
    pub date: DateTime<Utc>,
    pub month: String,
    pub year: i32,
    pub caption: Option<String>,
}

pub fn parse_photo(file: StorageFile) -> ParsedPhoto {
    let parsed = parse_photo_path(&file.path);
    let caption = extract_caption(&file.name);

    let date = parsed
        .date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(file.created_at);
    let month = parsed
        .month
        .map(str::to_string)
        .or_else(|| month_name(file.created_at.month()).map(str::to_string))
        .unwrap_or_default();
    let year = parsed.year.unwrap_or_else(|| file.created_at.year());

    ParsedPhoto {
        file,
        date,
        month,
        year,
        caption,
    }
}

pub fn sort_by_date(photos: &mut [ParsedPhoto]) {
    photos.sort_by_key(|p| p.date);
}

/// Buckets photos under `"{Month} {Year}"`, or `"Unknown"` when the month is
/// missing entirely.
pub fn group_by_month(photos: &[ParsedPhoto]) -> BTreeMap<String, Vec<ParsedPhoto>> {
    let mut grouped: BTreeMap<String, Vec<ParsedPhoto>> = BTreeMap::new();
    for photo in photos {
        let key = if photo.month.is_empty() {
            "Unknown".to_string()
        } else {
            format!("{} {}", photo.month, photo.year)
        };
        grouped.entry(key).or_default().push(photo.clone());
    }
    grouped
}
