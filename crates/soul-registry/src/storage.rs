//! # Persistent Storage Layer
//!
//! Sled-backed persistence for habits and learnings. Records are stored as
//! JSON under their big-endian identifier, so iteration order is creation
//! order. Retrieval relies on that order for stable tie-breaking.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `habits` | id (u64, big-endian) | serialized [`Habit`] |
//! | `learnings` | id (u64, big-endian) | serialized [`Learning`] |
//!
//! Updates go through sled's compare-and-swap loop, so concurrent
//! `times_applied` increments from sibling faculties are never lost.

use crate::models::{Habit, Learning, RecordId, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const HABIT_TREE: &str = "habits";
const LEARNING_TREE: &str = "learnings";

/// Wrapper around a Sled database for registry records.
///
/// Cloning is cheap and shares the underlying database.
#[derive(Clone)]
pub struct Storage {
    db: sled::Db,
    habits: sled::Tree,
    learnings: sled::Tree,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Database` if the path is unusable or the
    /// database is corrupted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// Creates a temporary storage, removed when dropped.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let habits = db.open_tree(HABIT_TREE)?;
        let learnings = db.open_tree(LEARNING_TREE)?;
        Ok(Storage {
            db,
            habits,
            learnings,
        })
    }

    /// Allocates a fresh record identifier. Identifiers start at 1.
    pub fn next_id(&self) -> Result<RecordId> {
        Ok(self.db.generate_id()? + 1)
    }

    pub fn store_habit(&self, habit: &Habit) -> Result<()> {
        put(&self.habits, habit.id, habit)
    }

    pub fn load_habit(&self, id: RecordId) -> Result<Option<Habit>> {
        get(&self.habits, id)
    }

    /// All habits in creation order.
    pub fn habits(&self) -> Result<Vec<Habit>> {
        all(&self.habits)
    }

    /// Applies `edit` to a stored habit atomically.
    ///
    /// Returns the updated habit, or `None` if absent.
    pub fn update_habit<F>(&self, id: RecordId, edit: F) -> Result<Option<Habit>>
    where
        F: FnMut(&mut Habit),
    {
        update(&self.habits, id, edit)
    }

    pub fn habit_count(&self) -> usize {
        self.habits.len()
    }

    pub fn store_learning(&self, learning: &Learning) -> Result<()> {
        put(&self.learnings, learning.id, learning)
    }

    pub fn load_learning(&self, id: RecordId) -> Result<Option<Learning>> {
        get(&self.learnings, id)
    }

    /// All learnings in creation order.
    pub fn learnings(&self) -> Result<Vec<Learning>> {
        all(&self.learnings)
    }

    /// Applies `edit` to a stored learning atomically.
    ///
    /// Returns the updated learning, or `None` if absent.
    pub fn update_learning<F>(&self, id: RecordId, edit: F) -> Result<Option<Learning>>
    where
        F: FnMut(&mut Learning),
    {
        update(&self.learnings, id, edit)
    }

    /// Flushes pending writes to disk, returning the bytes flushed.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("habits", &self.habits.len())
            .field("learnings", &self.learnings.len())
            .finish()
    }
}

fn put<T: Serialize>(tree: &sled::Tree, id: RecordId, record: &T) -> Result<()> {
    tree.insert(id.to_be_bytes(), serde_json::to_vec(record)?)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &sled::Tree, id: RecordId) -> Result<Option<T>> {
    match tree.get(id.to_be_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn all<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
    let mut records = Vec::with_capacity(tree.len());
    for entry in tree.iter() {
        let (_, bytes) = entry?;
        records.push(serde_json::from_slice(&bytes)?);
    }
    Ok(records)
}

fn update<T, F>(tree: &sled::Tree, id: RecordId, mut edit: F) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(&mut T),
{
    // Undecodable records are left untouched; the decode below reports them.
    let updated = tree.update_and_fetch(id.to_be_bytes(), |old| {
        let bytes = old?;
        let Ok(mut record) = serde_json::from_slice::<T>(bytes) else {
            return Some(bytes.to_vec());
        };
        edit(&mut record);
        Some(serde_json::to_vec(&record).unwrap_or_else(|_| bytes.to_vec()))
    })?;

    match updated {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}
