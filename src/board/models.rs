use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type TaskId = i64;
pub type UserId = i64;
pub type ProjectId = i64;

/// Identifier of a pipeline stage ("todo", "in-progress", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageKey(String);

impl StageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One column of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub key: StageKey,
    pub title: String,
    #[serde(default)]
    pub requires_elevated_access: bool,
}

impl Stage {
    pub fn open(key: &str, title: &str) -> Self {
        Self {
            key: StageKey::new(key),
            title: title.to_string(),
            requires_elevated_access: false,
        }
    }

    pub fn restricted(key: &str, title: &str) -> Self {
        Self {
            key: StageKey::new(key),
            title: title.to_string(),
            requires_elevated_access: true,
        }
    }
}

/// Wire values are matched in any letter case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Task classification used by the type-visibility filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Task,
    Subtask,
    ExtraTask,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [Self::Task, Self::Subtask, Self::ExtraTask];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Subtask => "subtask",
            Self::ExtraTask => "extra_task",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(Self::Task),
            "subtask" => Ok(Self::Subtask),
            "extra_task" | "extra-task" | "extratask" => Ok(Self::ExtraTask),
            _ => Err(format!("Invalid task kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
}

fn default_active() -> bool {
    true
}

/// A task card on the board.
///
/// `stage` and `order_index` are only readable from outside the crate; the
/// reconciliation engine is their single writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    stage: StageKey,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignees: Vec<UserRef>,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub parent_task: Option<TaskId>,
    #[serde(default)]
    pub extra_task: bool,
    order_index: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl Task {
    pub fn new(id: TaskId, title: &str, stage: impl Into<StageKey>, order_index: i32) -> Self {
        Self {
            id,
            title: title.to_string(),
            stage: stage.into(),
            priority: Priority::default(),
            assignees: Vec::new(),
            project: None,
            parent_task: None,
            extra_task: false,
            order_index,
            active: true,
            due_date: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_assignee(mut self, id: UserId) -> Self {
        if !self.assignees.iter().any(|a| a.id == id) {
            self.assignees.push(UserRef {
                id,
                name: String::new(),
            });
        }
        self
    }

    pub fn with_project(mut self, id: ProjectId) -> Self {
        self.project = Some(ProjectRef {
            id,
            name: String::new(),
        });
        self
    }

    pub fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent_task = Some(parent);
        self
    }

    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn as_extra_task(mut self) -> Self {
        self.extra_task = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn stage(&self) -> &StageKey {
        &self.stage
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_task.is_some()
    }

    pub fn kind(&self) -> TaskKind {
        if self.is_subtask() {
            TaskKind::Subtask
        } else if self.extra_task {
            TaskKind::ExtraTask
        } else {
            TaskKind::Task
        }
    }

    pub fn is_assigned_to(&self, user: UserId) -> bool {
        self.assignees.iter().any(|a| a.id == user)
    }

    pub(crate) fn set_stage(&mut self, stage: StageKey) {
        self.stage = stage;
    }

    pub(crate) fn set_order_index(&mut self, order_index: i32) {
        self.order_index = order_index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_roundtrip() {
        for s in &["low", "medium", "high", "critical"] {
            let parsed: Priority = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
        }
        assert_eq!("High".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_priority_deserializes_capitalized() {
        assert_eq!(
            serde_json::from_str::<Priority>("\"High\"").unwrap(),
            Priority::High
        );
        assert_eq!(
            serde_json::to_string(&Priority::Critical).unwrap(),
            "\"critical\""
        );
    }

    #[test]
    fn test_priority_deserializes_mixed_case() {
        let json = r#"{"id": 1, "title": "T", "stage": "todo", "order_index": 0, "priority": "hIgh"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Priority::High);

        let tasks: Vec<Task> = serde_json::from_str(
            r#"[{"id": 1, "title": "A", "stage": "todo", "order_index": 0, "priority": "cRITICAL"},
                {"id": 2, "title": "B", "stage": "todo", "order_index": 1, "priority": "low"}]"#,
        )
        .unwrap();
        assert_eq!(tasks[0].priority, Priority::Critical);

        let err = serde_json::from_str::<Priority>("\"urgent\"").unwrap_err();
        assert!(err.to_string().contains("Invalid priority"));
    }

    #[test]
    fn test_task_kind_is_derived() {
        let task = Task::new(1, "Plain", "todo", 0);
        assert_eq!(task.kind(), TaskKind::Task);

        let extra = Task::new(2, "Extra", "todo", 1).as_extra_task();
        assert_eq!(extra.kind(), TaskKind::ExtraTask);

        // A parent marks a subtask even when the extra flag is set
        let sub = Task::new(3, "Sub", "todo", 2).as_extra_task().with_parent(1);
        assert_eq!(sub.kind(), TaskKind::Subtask);
        assert!(sub.is_subtask());
    }

    #[test]
    fn test_task_deserialize_defaults() {
        let json = r#"{"id": 9, "title": "Ship it", "stage": "in-progress", "order_index": 4}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.stage().as_str(), "in-progress");
        assert_eq!(task.order_index(), 4);
        assert!(task.active);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.assignees.is_empty());
        assert_eq!(task.kind(), TaskKind::Task);
    }

    #[test]
    fn test_task_deserialize_full() {
        let json = r#"{
            "id": 5,
            "title": "Review copy",
            "stage": "review",
            "priority": "High",
            "assignees": [{"id": 1, "name": "Ana"}, {"id": 2}],
            "project": {"id": 3, "name": "Site"},
            "parent_task": 4,
            "order_index": 0,
            "active": false,
            "due_date": "2026-10-31"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Priority::High);
        assert!(task.is_assigned_to(2));
        assert!(!task.is_assigned_to(3));
        assert_eq!(task.project.as_ref().map(|p| p.id), Some(3));
        assert!(!task.active);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 10, 31));
    }

    #[test]
    fn test_with_assignee_deduplicates() {
        let task = Task::new(1, "T", "todo", 0).with_assignee(4).with_assignee(4);
        assert_eq!(task.assignees.len(), 1);
    }

    #[test]
    fn test_task_kind_parse() {
        assert_eq!("extra-task".parse::<TaskKind>().unwrap(), TaskKind::ExtraTask);
        assert_eq!("subtask".parse::<TaskKind>().unwrap(), TaskKind::Subtask);
        assert!("epic".parse::<TaskKind>().is_err());
    }
}
