//! In-memory background task tracking.
//!
//! A task is registered as in progress, its work is spawned onto the tokio
//! runtime, and the outcome is recorded when the work finishes. Clients poll
//! the task id for the result. Tasks live only as long as the process and
//! are never evicted.

use chrono::{DateTime, Utc};
use convo_core::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// Lifecycle state of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Returns true once the task has finished either way.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// A tracked background task.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Outcome payload; set when the task finishes.
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            status: TaskStatus::InProgress,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn finish(&mut self, status: TaskStatus, result: Value) {
        self.status = status;
        self.result = Some(result);
        self.updated_at = Utc::now();
    }
}

/// Shared registry of background tasks.
///
/// Cloning is cheap; clones share the same tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new in-progress task.
    pub fn start(&self) -> TaskId {
        let task = Task::new();
        let id = task.id;
        self.write().insert(id, task);
        id
    }

    /// Marks a task completed with its result.
    pub fn complete(&self, id: TaskId, result: Value) {
        self.finish(id, TaskStatus::Completed, result);
    }

    /// Marks a task failed with an error payload.
    pub fn fail(&self, id: TaskId, error: Value) {
        self.finish(id, TaskStatus::Failed, error);
    }

    /// Returns a snapshot of the task.
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.read().get(&id).cloned()
    }

    /// Registers a task and runs `work` in the background.
    ///
    /// `Ok` completes the task with the value; `Err` fails it with the value.
    pub fn spawn<F>(&self, work: F) -> TaskId
    where
        F: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        let id = self.start();
        let registry = self.clone();
        tokio::spawn(async move {
            match work.await {
                Ok(result) => {
                    tracing::info!(task_id = %id, "background task completed");
                    registry.complete(id, result);
                }
                Err(error) => {
                    tracing::warn!(task_id = %id, error = %error, "background task failed");
                    registry.fail(id, error);
                }
            }
        });
        id
    }

    fn finish(&self, id: TaskId, status: TaskStatus, result: Value) {
        match self.write().get_mut(&id) {
            Some(task) => task.finish(status, result),
            None => tracing::warn!(task_id = %id, "finished task is not registered"),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TaskId, Task>> {
        self.tasks.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<TaskId, Task>> {
        self.tasks.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    async fn wait_until_finished(registry: &TaskRegistry, id: TaskId) -> Task {
        for _ in 0..100 {
            if let Some(task) = registry.get(id) {
                if task.status.is_finished() {
                    return task;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {id} did not finish");
    }

    #[test]
    fn started_task_is_in_progress() {
        let registry = TaskRegistry::new();
        let id = registry.start();

        let task = registry.get(id).expect("registered");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.result.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn complete_records_result() {
        let registry = TaskRegistry::new();
        let id = registry.start();

        registry.complete(id, json!({"convo_id": 1}));

        let task = registry.get(id).expect("registered");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result, Some(json!({"convo_id": 1})));
        assert!(task.updated_at >= task.created_at);
    }

    #[test]
    fn unknown_task_is_absent() {
        let registry = TaskRegistry::new();
        registry.start();
        assert!(registry.get(TaskId::new()).is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).expect("serialize"),
            json!("in_progress")
        );
    }

    #[tokio::test]
    async fn spawned_work_completes() {
        let registry = TaskRegistry::new();
        let id = registry.spawn(async { Ok(json!({"done": true})) });

        let task = wait_until_finished(&registry, id).await;
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result, Some(json!({"done": true})));
    }

    #[tokio::test]
    async fn spawned_failure_is_recorded() {
        let registry = TaskRegistry::new();
        let id = registry.spawn(async { Err(json!({"detail": "nope"})) });

        let task = wait_until_finished(&registry, id).await;
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.result, Some(json!({"detail": "nope"})));
    }
}
