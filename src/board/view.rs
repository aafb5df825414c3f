//! A pipeline view: one scope, one actor, one active filter set.
//!
//! Wires the aggregator, the move translator and the reconciliation engine
//! together and turns their results into [`DropResult`]s for the caller.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::errors::{BoardError, DeniedAction};

use super::aggregate::{FilterState, StageBuckets, group_by_stage};
use super::api::TaskApi;
use super::cache::{TaskCache, TaskScope};
use super::events::RemoteEvent;
use super::intent::{DragPayload, DropIndicator, MoveIntent, MoveIntentTranslator};
use super::models::{StageKey, TaskId};
use super::notice::{Notice, notice_channel};
use super::pipeline::PipelineDefinition;
use super::policy::Actor;
use super::reconcile::{MoveOutcome, ReconciliationEngine};

/// What became of a drop gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropResult {
    Moved(MoveOutcome),
    /// Dropped onto its own slot.
    Unchanged,
    /// Refused by the permission policy. No notice is published.
    Blocked(DeniedAction),
    /// The gesture could not be resolved (no drag, bad payload, unknown
    /// target or task).
    Cancelled,
}

pub struct PipelineView {
    pipeline: Arc<PipelineDefinition>,
    filters: FilterState,
    translator: MoveIntentTranslator,
    engine: ReconciliationEngine,
    notices: broadcast::Sender<Notice>,
}

impl PipelineView {
    pub fn new(
        pipeline: Arc<PipelineDefinition>,
        actor: Actor,
        api: Arc<dyn TaskApi>,
        cache: TaskCache,
        scope: TaskScope,
    ) -> Self {
        let (notices, _) = notice_channel();
        Self {
            translator: MoveIntentTranslator::new(Arc::clone(&pipeline), actor),
            engine: ReconciliationEngine::new(api, cache, scope, notices.clone()),
            pipeline,
            filters: FilterState::default(),
            notices,
        }
    }

    pub fn scope(&self) -> TaskScope {
        self.engine.scope()
    }

    pub fn actor(&self) -> &Actor {
        self.translator.actor()
    }

    pub fn pipeline(&self) -> &PipelineDefinition {
        &self.pipeline
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        debug!(?filters, "filters changed");
        self.filters = filters;
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Fetch the scope's tasks into the cache.
    pub async fn load(&self) -> Result<usize, BoardError> {
        self.engine.refetch().await
    }

    /// Bucket the cached tasks of this view's scope under `filters`.
    pub fn get_stage_buckets(&self, filters: &FilterState) -> Result<StageBuckets, BoardError> {
        let scope = self.scope();
        let tasks = self
            .engine
            .cache()
            .snapshot(scope)?
            .ok_or_else(|| BoardError::ScopeNotLoaded {
                scope: scope.to_string(),
            })?;
        Ok(group_by_stage(&self.pipeline, &tasks, filters))
    }

    /// Buckets under the view's own filters.
    pub fn buckets(&self) -> Result<StageBuckets, BoardError> {
        self.get_stage_buckets(&self.filters)
    }

    /// Pick up a visible task.
    pub fn on_drag_start(&mut self, task_id: TaskId) -> Result<DragPayload, BoardError> {
        if self.engine.is_in_flight(task_id) {
            return Err(BoardError::MoveInFlight { task_id });
        }
        let buckets = self.buckets()?;
        let index = buckets
            .locate(task_id)
            .map(|(_, idx)| idx)
            .ok_or(BoardError::TaskNotFound { id: task_id })?;
        let task = buckets
            .find(task_id)
            .ok_or(BoardError::TaskNotFound { id: task_id })?;
        self.translator.on_drag_start(task, index)
    }

    pub fn on_drag_over_stage(&mut self, stage: &StageKey) -> DropIndicator {
        self.translator.on_drag_over_stage(stage)
    }

    pub fn cancel_drag(&mut self) {
        self.translator.cancel();
    }

    pub async fn on_drop(
        &mut self,
        stage: &StageKey,
        position: usize,
    ) -> Result<DropResult, BoardError> {
        let buckets = self.buckets()?;
        let resolved = self.translator.on_drop(stage, position, &buckets);
        self.settle(resolved).await
    }

    pub async fn on_drop_payload(
        &mut self,
        raw: &str,
        stage: &StageKey,
        position: usize,
    ) -> Result<DropResult, BoardError> {
        let buckets = self.buckets()?;
        let resolved = self
            .translator
            .on_drop_payload(raw, stage, position, &buckets);
        self.settle(resolved).await
    }

    async fn settle(
        &self,
        resolved: Result<Option<MoveIntent>, BoardError>,
    ) -> Result<DropResult, BoardError> {
        match resolved {
            Ok(Some(intent)) => self.engine.apply(intent).await.map(DropResult::Moved),
            Ok(None) => Ok(DropResult::Unchanged),
            Err(BoardError::AuthorizationDenied { action, .. }) => Ok(DropResult::Blocked(action)),
            Err(
                e @ (BoardError::MalformedDragPayload(_)
                | BoardError::NoActiveDrag
                | BoardError::UnknownStage(_)
                | BoardError::TaskNotFound { .. }),
            ) => {
                warn!(error = %e, "drop cancelled");
                Ok(DropResult::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn on_remote_event(&self, event: &RemoteEvent) -> Result<(), BoardError> {
        self.engine.handle_remote_event(event).await
    }
}
