// src/tally.rs
//
// Chart-ready aggregation of a question's raw response set. All pure: the
// handlers fetch rows and hand them here.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::response::ResponseRow;

/// Two scale responses this close (in 0-100 scale units) share a stack.
pub const STACK_THRESHOLD: f64 = 5.0;

/// Sixteen light backgrounds that keep black label text readable.
pub const COLOR_PALETTE: [&str; 16] = [
    "#FFB3BA", "#BAFFC9", "#BAE1FF", "#FFFFBA", "#FFDFBA", "#E0BBE4", "#FFCCCB", "#B4E4FF",
    "#C7CEEA", "#F0E68C", "#98D8C8", "#F7DC6F", "#AED6F1", "#FAD7A0", "#D5A6BD", "#A9DFBF",
];

/// Deterministic color per session id, stable across re-renders and across
/// the whole session. 32-bit string hash into the fixed palette.
pub fn color_for_session(session_id: &str) -> &'static str {
    let mut hash: i32 = 0;
    for c in session_id.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(c as i32);
    }
    COLOR_PALETTE[hash.unsigned_abs() as usize % COLOR_PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionCount {
    pub option: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceTally {
    /// Per-option counts, in the option list's original order, zero counts
    /// included.
    pub counts: Vec<OptionCount>,
    /// Responses whose trimmed value matched no declared option.
    pub excluded: usize,
    pub total: usize,
}

pub fn tally_choices(options: &[String], responses: &[ResponseRow]) -> ChoiceTally {
    let mut counts: Vec<OptionCount> = options
        .iter()
        .map(|option| OptionCount {
            option: option.clone(),
            count: 0,
        })
        .collect();

    let mut excluded = 0;
    for response in responses {
        let value = response.value.trim();
        match counts.iter_mut().find(|c| c.option == value) {
            Some(entry) => entry.count += 1,
            None => excluded += 1,
        }
    }

    ChoiceTally {
        counts,
        excluded,
        total: responses.len(),
    }
}

/// Wire form of a scale answer: `{"name": "...", "value": 0-100}`.
#[derive(Debug, Deserialize)]
struct ScaleValue {
    name: Option<String>,
    value: f64,
}

/// One positioned dot on the scale line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScaleDot {
    pub id: Uuid,
    pub session_id: String,
    pub name: String,
    pub value: f64,
    pub color: &'static str,
    /// Which proximity stack this dot belongs to, left to right.
    pub stack: usize,
    /// Offset outward from the scale line, ascending value order within the
    /// stack (0 sits on the line).
    pub dot_slot: usize,
    /// Label position from the top of the stack, descending value order, so
    /// labels never cross their dots.
    pub label_slot: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaleBoard {
    pub dots: Vec<ScaleDot>,
    /// Responses whose value could not be interpreted at all.
    pub dropped: usize,
}

/// Groups parsed responses into stacks by transitive proximity: a response
/// joins a stack if it is within [`STACK_THRESHOLD`] of any member already in
/// it. Over values sorted ascending, grouping by consecutive gap realizes
/// exactly that closure.
pub fn scale_board(responses: &[ResponseRow]) -> ScaleBoard {
    let mut dropped = 0;
    let mut parsed: Vec<(Uuid, String, String, f64)> = Vec::with_capacity(responses.len());

    for response in responses {
        let raw = response.value.trim();
        let entry = match serde_json::from_str::<ScaleValue>(raw) {
            Ok(scale) => Some((
                scale.name.unwrap_or_else(|| response.session_id.clone()),
                scale.value,
            )),
            // Fall back to a bare number with the session id as the name.
            Err(_) => raw
                .parse::<f64>()
                .ok()
                .map(|value| (response.session_id.clone(), value)),
        };
        match entry {
            Some((name, value)) if value.is_finite() => {
                parsed.push((response.id, response.session_id.clone(), name, value));
            }
            _ => dropped += 1,
        }
    }

    parsed.sort_by(|a, b| a.3.partial_cmp(&b.3).unwrap_or(Ordering::Equal));

    let mut stacks: Vec<Vec<(Uuid, String, String, f64)>> = Vec::new();
    for entry in parsed {
        match stacks.last_mut() {
            Some(stack) if entry.3 - stack.last().unwrap().3 <= STACK_THRESHOLD => {
                stack.push(entry);
            }
            _ => stacks.push(vec![entry]),
        }
    }

    let mut dots = Vec::new();
    for (stack_idx, stack) in stacks.iter().enumerate() {
        let len = stack.len();
        for (rank, (id, session_id, name, value)) in stack.iter().enumerate() {
            dots.push(ScaleDot {
                id: *id,
                session_id: session_id.clone(),
                name: name.clone(),
                value: *value,
                color: color_for_session(session_id),
                stack: stack_idx,
                dot_slot: rank,
                label_slot: len - 1 - rank,
            });
        }
    }

    ScaleBoard { dots, dropped }
}
