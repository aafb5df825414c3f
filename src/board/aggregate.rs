use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::models::{Priority, ProjectId, Stage, StageKey, Task, TaskId, TaskKind, UserId};
use super::pipeline::PipelineDefinition;

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month '{}': expected YYYY-MM", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid year in month '{}'", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month number in '{}'", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("Month out of range in '{}'", s));
        }
        Ok(Self { year, month })
    }
}

/// Active filters of a pipeline view. Every set field is a predicate; a task
/// must satisfy all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub project_id: Option<ProjectId>,
    pub priority: Option<Priority>,
    pub month: Option<Month>,
    pub assignee_id: Option<UserId>,
    pub search: Option<String>,
    pub visible_types: BTreeSet<TaskKind>,
    pub show_subtasks: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            project_id: None,
            priority: None,
            month: None,
            assignee_id: None,
            search: None,
            visible_types: TaskKind::ALL.into_iter().collect(),
            show_subtasks: true,
        }
    }
}

impl FilterState {
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_project(task)
            && self.matches_priority(task)
            && self.matches_month(task)
            && self.matches_assignee(task)
            && self.matches_search(task)
            && self.matches_type(task)
    }

    fn matches_project(&self, task: &Task) -> bool {
        match self.project_id {
            Some(id) => task.project.as_ref().is_some_and(|p| p.id == id),
            None => true,
        }
    }

    fn matches_priority(&self, task: &Task) -> bool {
        self.priority.is_none_or(|p| task.priority == p)
    }

    fn matches_month(&self, task: &Task) -> bool {
        match self.month {
            Some(m) => task
                .due_date
                .is_some_and(|d| d.year() == m.year && d.month() == m.month),
            None => true,
        }
    }

    fn matches_assignee(&self, task: &Task) -> bool {
        self.assignee_id.is_none_or(|id| task.is_assigned_to(id))
    }

    fn matches_search(&self, task: &Task) -> bool {
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => task
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }

    /// Subtasks hidden here are excluded from the buckets entirely, so stage
    /// counts match what the policy layer sees.
    fn matches_type(&self, task: &Task) -> bool {
        if task.is_subtask() && !self.show_subtasks {
            return false;
        }
        self.visible_types.contains(&task.kind())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageColumn {
    pub stage: Stage,
    pub tasks: Vec<Task>,
}

/// Per-stage ordered task lists, in pipeline display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageBuckets {
    pub columns: Vec<StageColumn>,
}

impl StageBuckets {
    pub fn get(&self, key: &StageKey) -> Option<&[Task]> {
        self.columns
            .iter()
            .find(|c| &c.stage.key == key)
            .map(|c| c.tasks.as_slice())
    }

    /// Stage and position of a task, if it is visible in some bucket.
    pub fn locate(&self, task_id: TaskId) -> Option<(&StageKey, usize)> {
        self.columns.iter().find_map(|c| {
            c.tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|idx| (&c.stage.key, idx))
        })
    }

    pub fn find(&self, task_id: TaskId) -> Option<&Task> {
        self.columns
            .iter()
            .flat_map(|c| c.tasks.iter())
            .find(|t| t.id == task_id)
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }
}

/// Group `tasks` into one ordered bucket per pipeline stage.
pub fn group_by_stage(
    pipeline: &PipelineDefinition,
    tasks: &[Task],
    filters: &FilterState,
) -> StageBuckets {
    let mut columns: Vec<StageColumn> = pipeline
        .stages()
        .iter()
        .map(|stage| StageColumn {
            stage: stage.clone(),
            tasks: Vec::new(),
        })
        .collect();

    for task in tasks {
        if !task.active || !filters.matches(task) {
            continue;
        }
        match pipeline.position(task.stage()) {
            Some(idx) => columns[idx].tasks.push(task.clone()),
            None => warn!(task = task.id, stage = %task.stage(), "task in unknown stage skipped"),
        }
    }

    // Stable: ties keep source order
    for column in &mut columns {
        column.tasks.sort_by_key(|t| t.order_index());
    }

    StageBuckets { columns }
}
