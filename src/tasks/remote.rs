use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::TaskError;
use crate::types::{Task, TaskId};

/// Page size requested from the demo API.
const PAGE_LIMIT: u32 = 100;

const DEFAULT_BASE_URL: &str = "https://dummyjson.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Read-mostly source of remote-origin tasks.
///
/// Updates and deletes are plain REST calls with no durable write guarantee;
/// the demo API acknowledges them and forgets. Local suppression is the
/// source of truth for deletions.
#[async_trait]
pub trait RemoteTaskSource: Send + Sync {
    async fn fetch_page(&self) -> Result<Vec<Task>, TaskError>;
    async fn mark_completed(&self, id: u32, completed: bool) -> Result<(), TaskError>;
    async fn delete(&self, id: u32) -> Result<(), TaskError>;
}

// Demo API wire types
#[derive(Deserialize)]
struct TodosPage {
    todos: Vec<RemoteTodo>,
}

#[derive(Deserialize)]
struct RemoteTodo {
    id: u32,
    todo: String,
    completed: bool,
}

#[derive(Serialize)]
struct CompletedBody {
    completed: bool,
}

/// Client for the dummyjson-style todo API.
pub struct RemoteTaskClient {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteTaskClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TaskError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TaskError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn public_demo() -> Result<Self, TaskError> {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl RemoteTaskSource for RemoteTaskClient {
    async fn fetch_page(&self) -> Result<Vec<Task>, TaskError> {
        let url = format!("{}/todos?limit={}", self.base_url, PAGE_LIMIT);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TaskError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::Network(format!(
                "todo API returned {}",
                status
            )));
        }

        let page: TodosPage = response
            .json()
            .await
            .map_err(|e| TaskError::Network(format!("bad todo API payload: {}", e)))?;

        debug!(count = page.todos.len(), "fetched remote todos");
        Ok(page
            .todos
            .into_iter()
            .map(|t| Task {
                id: TaskId::Remote(t.id),
                todo: t.todo,
                completed: t.completed,
                priority: None,
                created_at: None,
            })
            .collect())
    }

    async fn mark_completed(&self, id: u32, completed: bool) -> Result<(), TaskError> {
        let url = format!("{}/todos/{}", self.base_url, id);
        let response = self
            .client
            .put(&url)
            .json(&CompletedBody { completed })
            .send()
            .await
            .map_err(|e| TaskError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::Network(format!(
                "failed to update todo {}: {}",
                id, status
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: u32) -> Result<(), TaskError> {
        let url = format!("{}/todos/{}", self.base_url, id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| TaskError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::Network(format!(
                "failed to delete todo {}: {}",
                id, status
            )));
        }
        Ok(())
    }
}
