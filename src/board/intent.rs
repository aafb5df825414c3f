//! Drag gesture → [`MoveIntent`] translation.
//!
//! The translator is the only place that sees drag gestures. It checks the
//! permission policy at pick-up, on hover (advisory) and again at drop, and
//! resolves positions against the buckets current at drop time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{BoardError, DeniedAction};

use super::aggregate::StageBuckets;
use super::models::{StageKey, Task, TaskId};
use super::pipeline::PipelineDefinition;
use super::policy::{Actor, can_drop_into, can_pick_up};

/// A validated relocation request. Consumed once by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub task_id: TaskId,
    pub source_stage: StageKey,
    pub source_index: usize,
    pub target_stage: StageKey,
    pub target_index: usize,
    /// Task the moved card is inserted before; `None` means end of column.
    pub anchor: Option<TaskId>,
}

impl MoveIntent {
    pub fn is_same_stage(&self) -> bool {
        self.source_stage == self.target_stage
    }
}

/// Platform transfer data carried by a drag gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload {
    pub task_id: TaskId,
    pub source_stage: StageKey,
    pub source_index: usize,
}

impl DragPayload {
    pub fn encode(&self) -> String {
        // Plain struct of ints and strings; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn parse(raw: &str) -> Result<Self, BoardError> {
        serde_json::from_str(raw).map_err(|e| BoardError::MalformedDragPayload(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropIndicator {
    Allowed,
    Blocked,
}

#[derive(Debug, Clone)]
struct DragSession {
    task_id: TaskId,
    hovered: Option<StageKey>,
}

pub struct MoveIntentTranslator {
    pipeline: Arc<PipelineDefinition>,
    actor: Actor,
    session: Option<DragSession>,
}

impl MoveIntentTranslator {
    pub fn new(pipeline: Arc<PipelineDefinition>, actor: Actor) -> Self {
        Self {
            pipeline,
            actor,
            session: None,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn active_task(&self) -> Option<TaskId> {
        self.session.as_ref().map(|s| s.task_id)
    }

    pub fn hovered_stage(&self) -> Option<&StageKey> {
        self.session.as_ref().and_then(|s| s.hovered.as_ref())
    }

    /// Start a drag. Refused pick-ups leave no session behind.
    pub fn on_drag_start(
        &mut self,
        task: &Task,
        source_index: usize,
    ) -> Result<DragPayload, BoardError> {
        self.session = None;
        if !can_pick_up(&self.actor, task) {
            return Err(self.denied(DeniedAction::PickUp { task_id: task.id }));
        }
        self.session = Some(DragSession {
            task_id: task.id,
            hovered: None,
        });
        debug!(task = task.id, stage = %task.stage(), "drag started");
        Ok(DragPayload {
            task_id: task.id,
            source_stage: task.stage().clone(),
            source_index,
        })
    }

    /// Advisory hover check. Re-checked at drop.
    pub fn on_drag_over_stage(&mut self, stage: &StageKey) -> DropIndicator {
        let Some(session) = self.session.as_mut() else {
            return DropIndicator::Blocked;
        };
        session.hovered = Some(stage.clone());
        match self.pipeline.stage(stage) {
            Some(s) if can_drop_into(&self.actor, s) => DropIndicator::Allowed,
            _ => DropIndicator::Blocked,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(task = session.task_id, "drag cancelled");
        }
    }

    /// Finish the drag. `Ok(None)` means the card was dropped onto its own
    /// slot and nothing has to happen.
    pub fn on_drop(
        &mut self,
        target_stage: &StageKey,
        position: usize,
        buckets: &StageBuckets,
    ) -> Result<Option<MoveIntent>, BoardError> {
        let session = self.session.take().ok_or(BoardError::NoActiveDrag)?;
        self.resolve(session.task_id, target_stage, position, buckets)
    }

    /// Finish the drag from raw platform transfer data.
    pub fn on_drop_payload(
        &mut self,
        raw: &str,
        target_stage: &StageKey,
        position: usize,
        buckets: &StageBuckets,
    ) -> Result<Option<MoveIntent>, BoardError> {
        let session = self.session.take().ok_or(BoardError::NoActiveDrag)?;
        let payload = match DragPayload::parse(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(task = session.task_id, error = %e, "discarding drop with unreadable payload");
                return Err(e);
            }
        };
        if payload.task_id != session.task_id {
            warn!(
                session_task = session.task_id,
                payload_task = payload.task_id,
                "discarding drop whose payload does not match the drag"
            );
            return Err(BoardError::MalformedDragPayload(format!(
                "payload task {} does not match dragged task {}",
                payload.task_id, session.task_id
            )));
        }
        self.resolve(payload.task_id, target_stage, position, buckets)
    }

    fn resolve(
        &self,
        task_id: TaskId,
        target_stage: &StageKey,
        position: usize,
        buckets: &StageBuckets,
    ) -> Result<Option<MoveIntent>, BoardError> {
        let stage = self
            .pipeline
            .stage(target_stage)
            .ok_or_else(|| BoardError::UnknownStage(target_stage.to_string()))?;
        let task = buckets
            .find(task_id)
            .ok_or(BoardError::TaskNotFound { id: task_id })?;

        // Assignment or permissions may have changed since pick-up.
        if !can_pick_up(&self.actor, task) {
            return Err(self.denied(DeniedAction::PickUp { task_id }));
        }
        if !can_drop_into(&self.actor, stage) {
            return Err(self.denied(DeniedAction::DropInto {
                task_id,
                stage: target_stage.clone(),
            }));
        }

        let (source_stage, source_index) = buckets
            .locate(task_id)
            .map(|(stage, idx)| (stage.clone(), idx))
            .ok_or(BoardError::TaskNotFound { id: task_id })?;
        let column = buckets.get(target_stage).unwrap_or(&[]);
        let target_index = position.min(column.len());

        if &source_stage == target_stage
            && (target_index == source_index || target_index == source_index + 1)
        {
            debug!(task = task_id, "dropped onto own slot");
            return Ok(None);
        }

        let anchor = column
            .get(target_index)
            .map(|t| t.id)
            .filter(|id| *id != task_id);

        Ok(Some(MoveIntent {
            task_id,
            source_stage,
            source_index,
            target_stage: target_stage.clone(),
            target_index,
            anchor,
        }))
    }

    fn denied(&self, action: DeniedAction) -> BoardError {
        debug!(actor = self.actor.id, %action, "gesture blocked by policy");
        BoardError::AuthorizationDenied {
            actor_id: self.actor.id,
            action,
        }
    }
}
