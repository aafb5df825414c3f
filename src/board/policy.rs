//! Permission policy for pipeline moves.
//!
//! Both checks are pure: they read an explicit [`Actor`] value and never fail.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::models::{Stage, Task, TaskId, UserId};

/// Generic capability that lets an actor move any task into any stage.
pub const EDIT_TASKS: (&str, &str) = ("tasks", "edit");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Company-admin equivalent; bypasses every stage restriction.
    Elevated,
    #[default]
    Standard,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Elevated => write!(f, "elevated"),
            Role::Standard => write!(f, "standard"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elevated" | "admin" => Ok(Role::Elevated),
            "standard" | "employee" => Ok(Role::Standard),
            _ => anyhow::bail!("Invalid role '{}'. Valid values: elevated, standard", s),
        }
    }
}

/// A `(category, action)` capability, written `category:action`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub category: String,
    pub action: String,
}

impl Permission {
    pub fn new(category: &str, action: &str) -> Self {
        Self {
            category: category.to_string(),
            action: action.to_string(),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.action)
    }
}

impl FromStr for Permission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((category, action)) if !category.is_empty() && !action.is_empty() => {
                Ok(Permission::new(category, action))
            }
            _ => anyhow::bail!("Invalid permission '{}'. Expected 'category:action'", s),
        }
    }
}

/// The acting user, already resolved by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub permissions: HashSet<Permission>,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            permissions: HashSet::new(),
        }
    }

    pub fn with_permission(mut self, category: &str, action: &str) -> Self {
        self.permissions.insert(Permission::new(category, action));
        self
    }

    pub fn has_permission(&self, category: &str, action: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p.category == category && p.action == action)
    }

    pub fn is_elevated(&self) -> bool {
        self.role == Role::Elevated
    }

    pub fn can_edit_tasks(&self) -> bool {
        self.has_permission(EDIT_TASKS.0, EDIT_TASKS.1)
    }

    /// Ids of the tasks in `tasks` this actor is assigned to.
    pub fn assigned_task_ids(&self, tasks: &[Task]) -> BTreeSet<TaskId> {
        tasks
            .iter()
            .filter(|t| t.is_assigned_to(self.id))
            .map(|t| t.id)
            .collect()
    }
}

/// Whether `actor` may start dragging `task`.
pub fn can_pick_up(actor: &Actor, task: &Task) -> bool {
    let allowed = actor.is_elevated() || actor.can_edit_tasks() || task.is_assigned_to(actor.id);
    if !allowed {
        debug!(actor = actor.id, task = task.id, "pick-up denied");
    }
    allowed
}

/// Whether `actor` may place a task into `stage`.
pub fn can_drop_into(actor: &Actor, stage: &Stage) -> bool {
    actor.is_elevated() || actor.can_edit_tasks() || !stage.requires_elevated_access
}
