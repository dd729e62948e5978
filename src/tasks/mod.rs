//! Unified task list.
//!
//! Merges the remote demo API page with locally persisted tasks into one
//! view. Remote tasks the user has deleted are suppressed client-side; the
//! remote delete call is best-effort telemetry only, since the demo API never
//! persists writes.

mod remote;

pub use remote::{RemoteTaskClient, RemoteTaskSource};

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tracing::warn;

use crate::error::TaskError;
use crate::store::LocalStore;
use crate::types::{Priority, Task, TaskId};

/// Merge remote and local tasks into the unified view.
///
/// Remote tasks whose id is in `deleted` are dropped. Local tasks come first
/// (their sort key falls back to 0), then remote tasks by numeric id; the
/// sort is stable, so insertion order breaks ties. Pure and idempotent.
pub fn reconcile(remote: &[Task], local: &[Task], deleted: &BTreeSet<u32>) -> Vec<Task> {
    let mut merged: Vec<Task> = local.to_vec();
    merged.extend(
        remote
            .iter()
            .filter(|t| match t.id {
                TaskId::Remote(id) => !deleted.contains(&id),
                TaskId::Local(_) => true,
            })
            .cloned(),
    );
    merged.sort_by_key(|t| t.id.sort_key());
    merged
}

/// Outcome of a batch delete or complete, one entry per requested id.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<TaskId>,
    pub failed: Vec<(TaskId, String)>,
}

impl BatchReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, id: TaskId, result: Result<(), TaskError>) {
        match result {
            Ok(()) => self.succeeded.push(id),
            Err(e) => self.failed.push((id, e.to_string())),
        }
    }
}

/// Reconciled task list with a cached view.
///
/// The cache is dropped after every mutation and rebuilt on the next read,
/// so callers never observe a half-applied batch.
pub struct TaskService {
    source: Arc<dyn RemoteTaskSource>,
    store: Arc<LocalStore>,
    cache: Mutex<Option<Vec<Task>>>,
}

impl TaskService {
    pub fn new(source: Arc<dyn RemoteTaskSource>, store: Arc<LocalStore>) -> Self {
        Self {
            source,
            store,
            cache: Mutex::new(None),
        }
    }

    /// The unified view. An empty vec is a valid result, not an error; a
    /// remote fetch failure surfaces as `TaskError::Network` and leaves any
    /// previously cached view untouched.
    pub async fn tasks(&self) -> Result<Vec<Task>, TaskError> {
        if let Ok(cache) = self.cache.lock()
            && let Some(view) = cache.as_ref()
        {
            return Ok(view.clone());
        }

        let remote = self.source.fetch_page().await?;
        let local = self.store.local_tasks()?;
        let deleted = self.store.deleted_remote_ids()?;
        let view = reconcile(&remote, &local, &deleted);

        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(view.clone());
        }
        Ok(view)
    }

    /// Drop the cached view; the next read reconciles from scratch.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    /// Create a local-origin task.
    pub async fn add_task(
        &self,
        todo: impl Into<String>,
        priority: Option<Priority>,
    ) -> Result<Task, TaskError> {
        let task = self.store.add_local_task(todo, priority)?;
        self.invalidate();
        Ok(task)
    }

    /// Delete a batch of tasks.
    ///
    /// Remote deletes are issued concurrently and all awaited before the
    /// report is assembled. A failed remote delete is reported but the id is
    /// suppressed regardless: suppression, not the demo API, is what actually
    /// removes the task. Local ids are removed from the store directly. The
    /// cache is invalidated once, after all writes.
    pub async fn delete_tasks(&self, ids: &[TaskId]) -> Result<BatchReport, TaskError> {
        let mut report = BatchReport::default();

        let remote_ids: Vec<u32> = ids
            .iter()
            .filter_map(|id| match id {
                TaskId::Remote(n) => Some(*n),
                TaskId::Local(_) => None,
            })
            .collect();
        let local_ids: Vec<u64> = ids
            .iter()
            .filter_map(|id| match id {
                TaskId::Local(n) => Some(*n),
                TaskId::Remote(_) => None,
            })
            .collect();

        let deletes = remote_ids.iter().map(|&id| {
            let source = self.source.clone();
            async move { (id, source.delete(id).await) }
        });
        for (id, result) in join_all(deletes).await {
            if let Err(e) = &result {
                warn!(id, error = %e, "remote delete failed; suppressing locally anyway");
            }
            report.record(TaskId::Remote(id), result);
        }

        // Suppression is the source of truth, applied even for failed calls.
        if !remote_ids.is_empty() {
            self.store.suppress_remote_ids(&remote_ids)?;
        }

        if !local_ids.is_empty() {
            match self.store.remove_local_tasks(&local_ids) {
                Ok(()) => report
                    .succeeded
                    .extend(local_ids.iter().map(|&id| TaskId::Local(id))),
                Err(e) => {
                    let msg = e.to_string();
                    report
                        .failed
                        .extend(local_ids.iter().map(|&id| (TaskId::Local(id), msg.clone())));
                }
            }
        }

        self.invalidate();
        Ok(report)
    }

    /// Mark a batch of tasks completed.
    ///
    /// Remote updates are best-effort and issued concurrently; local tasks
    /// are mutated in the store. All calls complete before the report is
    /// returned.
    pub async fn complete_tasks(&self, ids: &[TaskId]) -> Result<BatchReport, TaskError> {
        let mut report = BatchReport::default();

        let updates = ids
            .iter()
            .filter_map(|id| match id {
                TaskId::Remote(n) => Some(*n),
                TaskId::Local(_) => None,
            })
            .map(|id| {
                let source = self.source.clone();
                async move { (id, source.mark_completed(id, true).await) }
            });
        for (id, result) in join_all(updates).await {
            if let Err(e) = &result {
                warn!(id, error = %e, "remote completion update failed");
            }
            report.record(TaskId::Remote(id), result);
        }

        for id in ids {
            if let TaskId::Local(n) = id {
                let result = match self.store.update_local_task(*n, true) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(TaskError::Storage(format!("no local task {}", id))),
                    Err(e) => Err(e),
                };
                report.record(*id, result);
            }
        }

        self.invalidate();
        Ok(report)
    }
}
