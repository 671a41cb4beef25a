//! Persistence of stopped tasks so they can be resumed later.
//!
//! A stopped task is fully described by its world, its region and the cursor
//! of its coordinate sequence. [`JsonFileStore`] keeps every saved task in a
//! single JSON document keyed by world, rewritten atomically on each change.

use crate::{ChunkPos, Cursor, Region, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Everything needed to continue an interrupted task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTask {
    pub world: String,
    pub center: ChunkPos,
    pub radius: i32,
    pub cursor: Cursor,
}

impl SavedTask {
    pub const fn region(&self) -> Region {
        Region::new(self.center, self.radius)
    }
}

/// Durable storage for [`SavedTask`]s, keyed by world.
///
/// A running task calls `save` and `remove` on Tokio's blocking pool, so
/// implementations may do blocking I/O.
pub trait TaskStore: Send + Sync + 'static {
    /// Saves `task`, replacing any earlier entry for the same world.
    fn save(&self, task: &SavedTask) -> Result<()>;

    fn load(&self, world: &str) -> Result<Option<SavedTask>>;

    /// Removes the entry for `world`. Removing a missing entry is not an
    /// error.
    fn remove(&self, world: &str) -> Result<()>;
}

/// An in-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<BTreeMap<String, SavedTask>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl TaskStore for MemoryStore {
    fn save(&self, task: &SavedTask) -> Result<()> {
        self.tasks.lock().insert(task.world.clone(), task.clone());
        Ok(())
    }

    fn load(&self, world: &str) -> Result<Option<SavedTask>> {
        Ok(self.tasks.lock().get(world).cloned())
    }

    fn remove(&self, world: &str) -> Result<()> {
        self.tasks.lock().remove(world);
        Ok(())
    }
}

/// Stores every saved task in one JSON file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// original, so a crash mid-write leaves the previous document intact. The
/// lock serializes read-modify-write cycles from concurrent tasks.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, SavedTask>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, tasks: &BTreeMap<String, SavedTask>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, tasks)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TaskStore for JsonFileStore {
    fn save(&self, task: &SavedTask) -> Result<()> {
        let _guard = self.lock.lock();
        let mut tasks = self.read_all()?;
        tasks.insert(task.world.clone(), task.clone());
        self.write_all(&tasks)
    }

    fn load(&self, world: &str) -> Result<Option<SavedTask>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(world))
    }

    fn remove(&self, world: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut tasks = self.read_all()?;
        if tasks.remove(world).is_some() {
            self.write_all(&tasks)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn saved(world: &str, index: u64) -> SavedTask {
        SavedTask {
            world: world.to_string(),
            center: ChunkPos::new(16, -32),
            radius: 8,
            cursor: Cursor::new(index),
        }
    }

    fn exercise(store: &dyn TaskStore) {
        assert_eq!(store.load("overworld").unwrap(), None);

        store.save(&saved("overworld", 10)).unwrap();
        store.save(&saved("nether", 3)).unwrap();
        store.save(&saved("overworld", 42)).unwrap();

        assert_eq!(store.load("overworld").unwrap(), Some(saved("overworld", 42)));
        assert_eq!(store.load("nether").unwrap(), Some(saved("nether", 3)));

        store.remove("overworld").unwrap();
        store.remove("overworld").unwrap();
        assert_eq!(store.load("overworld").unwrap(), None);
        assert_eq!(store.load("nether").unwrap(), Some(saved("nether", 3)));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        exercise(&store);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("tasks.json"));
        exercise(&store);
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");

        JsonFileStore::new(&path).save(&saved("end", 7)).unwrap();
        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.load("end").unwrap(), Some(saved("end", 7)));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn json_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileStore::new(&path).load("end").unwrap_err();
        assert!(matches!(err, Error::Serde(_)));
    }

    #[test]
    fn saved_task_region() {
        let task = saved("overworld", 0);
        assert_eq!(task.region(), Region::new(ChunkPos::new(16, -32), 8));
    }
}
