//! Row selection for the review path.
//!
//! Matching runs over display-fidelity rows (header at index 0), the same
//! strings a reviewer copied the key from. Timestamps are compared through
//! [`timestamp::normalize`]; part numbers are compared as exact strings.

use std::fmt;

use crate::models::{CellValue, Row};
use crate::schema::{PART_NO_COLUMN, TIMESTAMP_COLUMN};
use crate::timestamp;

/// How many rows a key may select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Timestamp and part number must both match; the first hit wins.
    Single { part_no: String },
    /// Every row sharing the timestamp.
    Batch,
}

/// A normalized update key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchKey {
    timestamp: String,
    policy: MatchPolicy,
}

impl MatchKey {
    pub fn single(timestamp: &str, part_no: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp::normalize(timestamp),
            policy: MatchPolicy::Single {
                part_no: part_no.into(),
            },
        }
    }

    pub fn batch(timestamp: &str) -> Self {
        Self {
            timestamp: timestamp::normalize(timestamp),
            policy: MatchPolicy::Batch,
        }
    }

    /// The normalized timestamp this key matches.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub const fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    fn matches(&self, row: &[CellValue]) -> bool {
        let Some(stored_ts) = row.get(TIMESTAMP_COLUMN) else {
            return false;
        };
        if timestamp::normalize(&stored_ts.to_string()) != self.timestamp {
            return false;
        }
        match &self.policy {
            MatchPolicy::Batch => true,
            MatchPolicy::Single { part_no } => row
                .get(PART_NO_COLUMN)
                .is_some_and(|stored| stored.to_string() == *part_no),
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.policy {
            MatchPolicy::Single { part_no } => {
                write!(f, "timestamp {} and part_no {part_no}", self.timestamp)
            }
            MatchPolicy::Batch => write!(f, "timestamp {}", self.timestamp),
        }
    }
}

/// Indices of the rows `key` selects, in ascending order.
///
/// A single-match key yields at most one index; rows after the first hit are
/// never inspected.
pub fn find_matches(rows: &[Row], key: &MatchKey) -> Vec<usize> {
    let candidates = rows
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, row)| key.matches(row))
        .map(|(index, _)| index);

    match key.policy {
        MatchPolicy::Single { .. } => candidates.take(1).collect(),
        MatchPolicy::Batch => candidates.collect(),
    }
}
