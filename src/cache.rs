use std::num::NonZeroU32;

use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::user::UserRecord;

/// What to do with an incoming record whose key is already cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Drop the newcomer, the first record seen for a key stays.
    #[default]
    KeepFirst,
    /// Replace the cached record in place, keeping its position.
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("page {got} arrived out of order, expected page {expected}")]
    OutOfOrder { expected: NonZeroU32, got: NonZeroU32 },
}

/// The records one fetch produced, tagged with the cursor that fetched them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub cursor: NonZeroU32,
    pub records: Vec<UserRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub cursor: NonZeroU32,
    /// Records that became new entries.
    pub accepted: usize,
    /// Records that replaced an existing entry.
    pub overwritten: usize,
    /// Records dropped as duplicates.
    pub skipped: usize,
}

/// Append-only sequence of batches, flattened in arrival order.
///
/// `generation` changes only on [`PageCache::reset`]; `revision` changes on
/// every mutation and is what derived views key on.
#[derive(Debug, Clone)]
pub struct PageCache {
    batches: Vec<Batch>,
    generation: u64,
    revision: u64,
    duplicates: DuplicatePolicy,
}

impl PageCache {
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        PageCache {
            batches: vec![],
            generation: 0,
            revision: 0,
            duplicates,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn last_cursor(&self) -> Option<NonZeroU32> {
        self.batches.last().map(|b| b.cursor)
    }

    /// The cursor the next fetch must use.
    pub fn next_cursor(&self) -> NonZeroU32 {
        match self.last_cursor() {
            Some(c) => c.saturating_add(1),
            None => NonZeroU32::MIN,
        }
    }

    /// Number of records across all batches.
    pub fn len(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattened view: batch order, then order within the batch.
    pub fn users(&self) -> impl Iterator<Item = &UserRecord> {
        self.batches.iter().flat_map(|b| b.records.iter())
    }

    pub fn find(&self, key: &str) -> Option<&UserRecord> {
        self.users().find(|u| u.key() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Appends the batch fetched with `cursor`. Pages must land strictly in
    /// cursor order.
    pub fn append(&mut self, cursor: NonZeroU32, records: Vec<UserRecord>) -> Result<Appended, CacheError> {
        let expected = self.next_cursor();
        if cursor != expected {
            return Err(CacheError::OutOfOrder {
                expected,
                got: cursor,
            });
        }

        let mut report = Appended {
            cursor,
            accepted: 0,
            overwritten: 0,
            skipped: 0,
        };
        let mut fresh: Vec<UserRecord> = Vec::with_capacity(records.len());
        for record in records {
            let existing = self
                .batches
                .iter_mut()
                .flat_map(|b| b.records.iter_mut())
                .chain(fresh.iter_mut())
                .find(|u| u.key() == record.key());
            match (existing, self.duplicates) {
                (None, _) => {
                    fresh.push(record);
                    report.accepted += 1;
                }
                (Some(_), DuplicatePolicy::KeepFirst) => {
                    debug!("Skipping duplicate user {}", record.key());
                    report.skipped += 1;
                }
                (Some(slot), DuplicatePolicy::Overwrite) => {
                    debug!("Overwriting duplicate user {}", record.key());
                    *slot = record;
                    report.overwritten += 1;
                }
            }
        }

        self.batches.push(Batch {
            cursor,
            records: fresh,
        });
        self.revision += 1;
        Ok(report)
    }

    /// Removes the record with `key` from whichever batch holds it. Everything
    /// else keeps its relative order.
    pub fn remove(&mut self, key: &str) -> Option<UserRecord> {
        for batch in self.batches.iter_mut() {
            if let Some(pos) = batch.records.iter().position(|u| u.key() == key) {
                self.revision += 1;
                return Some(batch.records.remove(pos));
            }
        }
        None
    }

    /// Drops every batch and starts a new generation. Returns the generation.
    pub fn reset(&mut self) -> u64 {
        self.batches.clear();
        self.generation += 1;
        self.revision += 1;
        self.generation
    }
}
