use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aggregate::FilterState;
use super::cache::TaskScope;
use super::models::{StageKey, Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    pub stage: StageKey,
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order: i32,
}

/// The backend operations the board engine depends on.
/// Real implementation: `HttpTaskApi`. Tests use in-memory doubles.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn update_task_stage(&self, task_id: TaskId, update: &StageUpdate) -> Result<()>;

    async fn update_task_order(&self, task_id: TaskId, update: &OrderUpdate) -> Result<()>;

    async fn fetch_tasks(&self, scope: TaskScope, filters: &FilterState) -> Result<Vec<Task>>;
}

/// List endpoints answer either with a bare array or a `{"data": [...]}` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskListResponse {
    Bare(Vec<Task>),
    Wrapped { data: Vec<Task> },
}

impl TaskListResponse {
    fn into_tasks(self) -> Vec<Task> {
        match self {
            Self::Bare(tasks) | Self::Wrapped { data: tasks } => tasks,
        }
    }
}

/// REST client for the task API.
#[derive(Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTaskApi {
    pub fn new(base_url: &str, timeout: Duration, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn scope_url(&self, scope: TaskScope) -> String {
        match scope {
            TaskScope::Project(id) => format!("{}/projects/{}/tasks", self.base_url, id),
            TaskScope::Company(id) => format!("{}/companies/{}/tasks", self.base_url, id),
            TaskScope::Employee(id) => format!("{}/employees/{}/tasks", self.base_url, id),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Server-side narrowing hints. The aggregator still applies every filter.
fn query_params(filters: &FilterState) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(priority) = filters.priority {
        params.push(("priority", priority.as_str().to_string()));
    }
    if let Some(assignee) = filters.assignee_id {
        params.push(("assignee_id", assignee.to_string()));
    }
    if let Some(month) = filters.month {
        params.push(("month", month.to_string()));
    }
    params
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn update_task_stage(&self, task_id: TaskId, update: &StageUpdate) -> Result<()> {
        let url = format!("{}/tasks/{}/status", self.base_url, task_id);
        debug!(task = task_id, stage = %update.stage, order = update.order, "PATCH {}", url);
        self.authorize(self.client.patch(&url))
            .json(update)
            .send()
            .await
            .with_context(|| format!("Failed to send stage update for task {}", task_id))?
            .error_for_status()
            .with_context(|| format!("Stage update for task {} returned error status", task_id))?;
        Ok(())
    }

    async fn update_task_order(&self, task_id: TaskId, update: &OrderUpdate) -> Result<()> {
        let url = format!("{}/tasks/{}/order", self.base_url, task_id);
        debug!(task = task_id, order = update.order, "PATCH {}", url);
        self.authorize(self.client.patch(&url))
            .json(update)
            .send()
            .await
            .with_context(|| format!("Failed to send order update for task {}", task_id))?
            .error_for_status()
            .with_context(|| format!("Order update for task {} returned error status", task_id))?;
        Ok(())
    }

    async fn fetch_tasks(&self, scope: TaskScope, filters: &FilterState) -> Result<Vec<Task>> {
        let url = self.scope_url(scope);
        debug!(%scope, "GET {}", url);
        let resp = self
            .authorize(self.client.get(&url))
            .query(&query_params(filters))
            .send()
            .await
            .with_context(|| format!("Failed to fetch tasks for {}", scope))?
            .error_for_status()
            .with_context(|| format!("Task list for {} returned error status", scope))?;
        let body = resp
            .json::<TaskListResponse>()
            .await
            .with_context(|| format!("Failed to parse task list for {}", scope))?;
        Ok(body.into_tasks())
    }
}
