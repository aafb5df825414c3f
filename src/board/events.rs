use serde::{Deserialize, Serialize};

use super::models::{StageKey, TaskId};

/// Server-initiated change notifications (another user moved or edited a
/// task). They are merged by invalidating and refetching the cache, never
/// field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RemoteEvent {
    TaskCreated {
        task_id: TaskId,
    },
    TaskUpdated {
        task_id: TaskId,
    },
    TaskMoved {
        task_id: TaskId,
        from_stage: StageKey,
        to_stage: StageKey,
        position: i32,
    },
    TaskDeleted {
        task_id: TaskId,
    },
}

impl RemoteEvent {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            Self::TaskCreated { task_id }
            | Self::TaskUpdated { task_id }
            | Self::TaskMoved { task_id, .. }
            | Self::TaskDeleted { task_id } => *task_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_moved() {
        let raw = r#"{"type": "TaskMoved", "data": {"task_id": 4, "from_stage": "todo", "to_stage": "review", "position": 2}}"#;
        let event = RemoteEvent::parse(raw).unwrap();
        assert_eq!(event.task_id(), 4);
        match event {
            RemoteEvent::TaskMoved { to_stage, .. } => assert_eq!(to_stage.as_str(), "review"),
            other => panic!("Expected TaskMoved, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(RemoteEvent::parse(r#"{"type": "Nope", "data": {}}"#).is_err());
        assert!(RemoteEvent::parse("garbage").is_err());
    }
}
