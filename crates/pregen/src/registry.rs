//! Process-wide index of running tasks, keyed by world.
//!
//! The registry is an explicit service object rather than a global: the
//! command layer creates one for the lifetime of the process and hands clones
//! to whoever needs to start, find or cancel tasks. Tests build their own.

use crate::{Error, GenerationTask, Outcome, Result, RunContext, SystemClock, TimeSource};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tokio::task::JoinHandle;

type Tasks<T> = HashMap<Arc<str>, Arc<GenerationTask<T>>>;

/// Concurrent map from world to its live [`GenerationTask`].
///
/// Cloning is cheap and every clone refers to the same map. A world has at
/// most one entry at any instant: [`Self::insert`] refuses a second task, and
/// a task removes its own entry when its run ends.
pub struct TaskRegistry<T: TimeSource = SystemClock> {
    tasks: Arc<RwLock<Tasks<T>>>,
}

impl<T: TimeSource> Clone for TaskRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
        }
    }
}

impl<T: TimeSource> Default for TaskRegistry<T> {
    fn default() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl TaskRegistry<SystemClock> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: TimeSource> TaskRegistry<T> {
    /// Registers `task` and spawns its run on the current Tokio runtime.
    ///
    /// The returned handle resolves with the run's [`Outcome`] after the task
    /// has left the registry.
    ///
    /// # Errors
    ///
    /// - [`Error::RegionOutOfBounds`] if the task's region reaches past the
    ///   `i32` grid.
    /// - [`Error::InvalidConfig`] if the task's configuration is unusable.
    /// - [`Error::AlreadyRunning`] if the world already has a live task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(
        &self,
        task: Arc<GenerationTask<T>>,
        ctx: RunContext,
    ) -> Result<JoinHandle<Outcome>> {
        task.region().validate()?;
        task.config().validate()?;
        self.insert(Arc::clone(&task))?;
        Ok(tokio::spawn(task.run(ctx, self.clone())))
    }

    /// Adds `task` under its world.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the world already has an entry.
    pub fn insert(&self, task: Arc<GenerationTask<T>>) -> Result<()> {
        let mut tasks = self.tasks.write();
        if tasks.contains_key(task.world()) {
            return Err(Error::AlreadyRunning {
                world: task.world().to_string(),
            });
        }
        tasks.insert(Arc::clone(task.world_id()), task);
        Ok(())
    }

    pub fn get(&self, world: &str) -> Option<Arc<GenerationTask<T>>> {
        self.tasks.read().get(world).cloned()
    }

    pub fn contains(&self, world: &str) -> bool {
        self.tasks.read().contains_key(world)
    }

    pub fn remove(&self, world: &str) -> Option<Arc<GenerationTask<T>>> {
        self.tasks.write().remove(world)
    }

    /// Removes the entry for `task`'s world only if it is `task` itself, so a
    /// finishing run never evicts a newer task for the same world.
    pub fn remove_if(&self, task: &Arc<GenerationTask<T>>) -> bool {
        let mut tasks = self.tasks.write();
        match tasks.get(task.world()) {
            Some(current) if Arc::ptr_eq(current, task) => {
                tasks.remove(task.world());
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// Worlds with a live task, sorted.
    pub fn worlds(&self) -> Vec<Arc<str>> {
        let mut worlds: Vec<_> = self.tasks.read().keys().cloned().collect();
        worlds.sort();
        worlds
    }

    /// Cancels the task for `world`. Returns `false` if there is none.
    pub fn cancel(&self, world: &str) -> bool {
        match self.get(world) {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every live task and returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let tasks: Vec<_> = self.tasks.read().values().cloned().collect();
        for task in &tasks {
            task.cancel();
        }
        tasks.len()
    }
}
