//! Typed error hierarchy for the task board engine.
//!
//! `BoardError` covers every failure class of the pipeline:
//! - authorization (`AuthorizationDenied`), resolved locally and never notified
//! - backend rejections (`TransitionRejected`, `OrderUpdateFailed`)
//! - gesture problems (`MalformedDragPayload`, `NoActiveDrag`, `UnknownStage`)
//! - local state problems (`TaskNotFound`, `MoveInFlight`, `ScopeNotLoaded`)

use std::fmt;

use thiserror::Error;

use crate::board::models::{StageKey, TaskId, UserId};

/// The gesture step that the permission policy refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeniedAction {
    PickUp { task_id: TaskId },
    DropInto { task_id: TaskId, stage: StageKey },
}

impl fmt::Display for DeniedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PickUp { task_id } => write!(f, "pick up task {}", task_id),
            Self::DropInto { task_id, stage } => {
                write!(f, "drop task {} into stage '{}'", task_id, stage)
            }
        }
    }
}

/// Errors from the pipeline board engine.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Actor {actor_id} is not allowed to {action}")]
    AuthorizationDenied {
        actor_id: UserId,
        action: DeniedAction,
    },

    #[error("Failed to update task status for task {task_id} (target '{target_stage}'): {source}")]
    TransitionRejected {
        task_id: TaskId,
        target_stage: StageKey,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to update order of {} task(s) in stage '{stage}'", .failed.len())]
    OrderUpdateFailed { stage: StageKey, failed: Vec<TaskId> },

    #[error("Malformed drag payload: {0}")]
    MalformedDragPayload(String),

    #[error("No drag in progress")]
    NoActiveDrag,

    #[error("Unknown stage '{0}'")]
    UnknownStage(String),

    #[error("Task {id} not found")]
    TaskNotFound { id: TaskId },

    #[error("Task {task_id} already has a move in flight")]
    MoveInFlight { task_id: TaskId },

    #[error("Tasks for scope {scope} are not loaded")]
    ScopeNotLoaded { scope: String },

    #[error("Invalid pipeline definition: {0}")]
    InvalidPipeline(String),

    #[error("Task cache lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    /// True for errors the backend produced, which are the only ones that
    /// reach the notice channel.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::TransitionRejected { .. } | Self::OrderUpdateFailed { .. }
        )
    }
}
