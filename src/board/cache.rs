use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::BoardError;

use super::models::{ProjectId, Task, UserId};

/// Which task collection a view shows. Each scope is its own cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TaskScope {
    Project(ProjectId),
    Company(i64),
    Employee(UserId),
}

impl fmt::Display for TaskScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(id) => write!(f, "project:{}", id),
            Self::Company(id) => write!(f, "company:{}", id),
            Self::Employee(id) => write!(f, "employee:{}", id),
        }
    }
}

impl FromStr for TaskScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid scope '{}': expected kind:id", s))?;
        let id: i64 = id
            .parse()
            .map_err(|_| format!("Invalid scope id in '{}'", s))?;
        match kind {
            "project" => Ok(Self::Project(id)),
            "company" => Ok(Self::Company(id)),
            "employee" => Ok(Self::Employee(id)),
            _ => Err(format!("Invalid scope kind: {}", kind)),
        }
    }
}

#[derive(Debug, Default)]
struct CacheEntry {
    tasks: Vec<Task>,
    stale: bool,
}

/// Shared handle to the cached task collections.
///
/// Cheap to clone; every clone sees the same partitions. Readers get owned
/// snapshots, writers go through [`TaskCache::update`].
#[derive(Clone, Default)]
pub struct TaskCache {
    inner: Arc<Mutex<HashMap<TaskScope, CacheEntry>>>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TaskScope, CacheEntry>>, BoardError> {
        self.inner.lock().map_err(|_| BoardError::LockPoisoned)
    }

    /// Copy of the partition's tasks, or `None` when it was never loaded.
    pub fn snapshot(&self, scope: TaskScope) -> Result<Option<Vec<Task>>, BoardError> {
        Ok(self.lock()?.get(&scope).map(|e| e.tasks.clone()))
    }

    /// Replace a partition with freshly fetched tasks and clear its stale flag.
    pub fn replace(&self, scope: TaskScope, tasks: Vec<Task>) -> Result<(), BoardError> {
        debug!(%scope, count = tasks.len(), "cache partition replaced");
        self.lock()?.insert(scope, CacheEntry { tasks, stale: false });
        Ok(())
    }

    /// Mark one partition as out of date. Other partitions are untouched.
    pub fn invalidate(&self, scope: TaskScope) -> Result<(), BoardError> {
        if let Some(entry) = self.lock()?.get_mut(&scope) {
            entry.stale = true;
            debug!(%scope, "cache partition invalidated");
        }
        Ok(())
    }

    pub fn is_stale(&self, scope: TaskScope) -> Result<bool, BoardError> {
        Ok(self.lock()?.get(&scope).is_some_and(|e| e.stale))
    }

    pub fn scopes(&self) -> Result<Vec<TaskScope>, BoardError> {
        Ok(self.lock()?.keys().copied().collect())
    }

    /// Mutate a loaded partition under the lock.
    pub(crate) fn update<F, R>(&self, scope: TaskScope, f: F) -> Result<R, BoardError>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<R, BoardError>,
    {
        let mut guard = self.lock()?;
        let entry = guard.get_mut(&scope).ok_or_else(|| BoardError::ScopeNotLoaded {
            scope: scope.to_string(),
        })?;
        f(&mut entry.tasks)
    }
}
