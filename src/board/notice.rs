use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::models::{StageKey, TaskId};

/// Capacity of the notice channel created by [`notice_channel`].
pub const NOTICE_CAPACITY: usize = 64;

/// User-visible failure notices. Authorization refusals never produce one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Notice {
    TaskStatusUpdateFailed {
        task_id: TaskId,
        stage: StageKey,
        detail: String,
    },
    TaskOrderUpdateFailed {
        stage: StageKey,
        failed_task_ids: Vec<TaskId>,
    },
    RefreshFailed {
        detail: String,
    },
}

impl Notice {
    /// Short text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::TaskStatusUpdateFailed { .. } => "Failed to update task status".to_string(),
            Self::TaskOrderUpdateFailed {
                failed_task_ids, ..
            } => format!(
                "Failed to save the new order for {} task(s); the board will refresh",
                failed_task_ids.len()
            ),
            Self::RefreshFailed { .. } => "Failed to refresh tasks".to_string(),
        }
    }
}

pub fn notice_channel() -> (broadcast::Sender<Notice>, broadcast::Receiver<Notice>) {
    broadcast::channel(NOTICE_CAPACITY)
}

pub fn publish_notice(tx: &broadcast::Sender<Notice>, notice: Notice) {
    warn!(message = %notice.message(), ?notice, "notice");
    if tx.send(notice).is_err() {
        debug!("no notice subscribers");
    }
}
