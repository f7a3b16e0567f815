//! Merges remotely observed records into the canonical set.
//!
//! Reconciliation matches on `text` alone; dedupe matches on the full
//! (text, category) pair. Both are pure and never touch their inputs.

use crate::models::{Record, RecordSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// A remote record replaces the local record with the same text.
    #[default]
    RemoteWins,
    /// Remote records are only appended when their text is unseen.
    KeepBothIfNew,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::RemoteWins => "remote-wins",
            ConflictPolicy::KeepBothIfNew => "keep-both-if-new",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote-wins" | "server-wins" => Ok(ConflictPolicy::RemoteWins),
            "keep-both-if-new" | "append-new" => Ok(ConflictPolicy::KeepBothIfNew),
            other => Err(format!(
                "unknown conflict policy '{other}' (expected remote-wins|keep-both-if-new)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub merged: RecordSet,
    pub changed: bool,
    pub appended: usize,
    pub replaced: usize,
}

pub fn reconcile(
    local: &RecordSet,
    remote: &RecordSet,
    policy: ConflictPolicy,
) -> ReconciliationResult {
    let mut working = local.clone();
    let mut appended = 0usize;
    let mut replaced = 0usize;

    for candidate in remote {
        match working.position_by_text(&candidate.text) {
            None => {
                working.push(candidate.clone());
                appended += 1;
            }
            Some(index) => {
                if policy == ConflictPolicy::KeepBothIfNew {
                    continue;
                }
                if replace_at(&mut working, index, candidate) {
                    replaced += 1;
                }
            }
        }
    }

    let changed = appended > 0 || replaced > 0;
    ReconciliationResult {
        merged: if changed { working } else { local.clone() },
        changed,
        appended,
        replaced,
    }
}

/// Overwrites `set[index]` with `candidate`. Returns false when they are
/// already identical. If the exact pair exists elsewhere the slot is dropped
/// so the set keeps unique (text, category) pairs.
fn replace_at(set: &mut RecordSet, index: usize, candidate: &Record) -> bool {
    let records = set.records_mut();
    if records[index] == *candidate {
        return false;
    }
    let duplicate_elsewhere = records
        .iter()
        .enumerate()
        .any(|(i, r)| i != index && r == candidate);
    if duplicate_elsewhere {
        records.remove(index);
    } else {
        records[index] = candidate.clone();
    }
    true
}

/// Drops later occurrences of an exact (text, category) pair.
pub fn dedupe(set: &RecordSet) -> RecordSet {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    set.iter()
        .filter(|r| seen.insert(r.natural_key()))
        .cloned()
        .collect()
}
