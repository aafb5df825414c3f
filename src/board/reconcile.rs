//! Optimistic move application and backend reconciliation.
//!
//! Two move classes with different server contracts:
//!
//! - **cross-stage**: flip `stage` locally, send one stage update, roll the
//!   stage back and refetch the scope if the backend rejects it;
//! - **same-stage**: renumber the stage densely, send one order update per
//!   task whose index changed, report (never roll back) partial failures and
//!   refetch.
//!
//! The engine is the only writer of `Task::stage` and `Task::order_index`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::errors::BoardError;

use super::aggregate::FilterState;
use super::api::{OrderUpdate, StageUpdate, TaskApi};
use super::cache::{TaskCache, TaskScope};
use super::events::RemoteEvent;
use super::intent::MoveIntent;
use super::models::{StageKey, Task, TaskId};
use super::notice::{Notice, publish_notice};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveOutcome {
    StageChanged {
        task_id: TaskId,
        from: StageKey,
        to: StageKey,
    },
    Reordered {
        stage: StageKey,
        /// Ids of the tasks whose order was sent to the backend.
        updated: Vec<TaskId>,
    },
}

/// Remove the element at `source` and re-insert it so that it lands before
/// whatever sat at `target` prior to the removal.
pub fn move_within<T>(items: &mut Vec<T>, source: usize, target: usize) {
    if source >= items.len() {
        return;
    }
    let item = items.remove(source);
    let insert_at = if target > source { target - 1 } else { target };
    items.insert(insert_at.min(items.len()), item);
}

fn to_order(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

type InFlight = Arc<Mutex<HashSet<TaskId>>>;

/// Releases a task's in-flight claim when the move settles.
struct InFlightGuard {
    set: InFlight,
    task_id: TaskId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.task_id);
        }
    }
}

/// Applies moves for one scope against the backend.
///
/// Moves of different tasks may run concurrently through a shared `&self`.
/// Corrective and remote-event refetches wait until none is in flight.
pub struct ReconciliationEngine {
    api: Arc<dyn TaskApi>,
    cache: TaskCache,
    scope: TaskScope,
    notices: broadcast::Sender<Notice>,
    in_flight: InFlight,
}

impl ReconciliationEngine {
    pub fn new(
        api: Arc<dyn TaskApi>,
        cache: TaskCache,
        scope: TaskScope,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        Self {
            api,
            cache,
            scope,
            notices,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn scope(&self) -> TaskScope {
        self.scope
    }

    pub fn cache(&self) -> &TaskCache {
        &self.cache
    }

    pub fn is_in_flight(&self, task_id: TaskId) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(&task_id))
            .unwrap_or(false)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or(0)
    }

    fn claim(&self, task_id: TaskId) -> Result<InFlightGuard, BoardError> {
        let mut set = self.in_flight.lock().map_err(|_| BoardError::LockPoisoned)?;
        if !set.insert(task_id) {
            return Err(BoardError::MoveInFlight { task_id });
        }
        Ok(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            task_id,
        })
    }

    /// Apply a move optimistically and reconcile it with the backend.
    pub async fn apply(&self, intent: MoveIntent) -> Result<MoveOutcome, BoardError> {
        let guard = self.claim(intent.task_id)?;
        let result = if intent.is_same_stage() {
            self.reorder_within_stage(&intent).await
        } else {
            self.move_across_stages(&intent).await
        };
        drop(guard);
        self.refetch_if_stale().await;
        result
    }

    async fn move_across_stages(&self, intent: &MoveIntent) -> Result<MoveOutcome, BoardError> {
        let task_id = intent.task_id;
        let target = intent.target_stage.clone();

        let previous = self.cache.update(self.scope, |tasks| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or(BoardError::TaskNotFound { id: task_id })?;
            let previous = task.stage().clone();
            task.set_stage(target.clone());
            Ok(previous)
        })?;
        debug!(task = task_id, from = %previous, to = %target, "stage changed locally");

        let update = StageUpdate {
            stage: target.clone(),
            order: to_order(intent.target_index),
        };
        match self.api.update_task_stage(task_id, &update).await {
            Ok(()) => {
                info!(task = task_id, from = %previous, to = %target, "task moved");
                Ok(MoveOutcome::StageChanged {
                    task_id,
                    from: previous,
                    to: target,
                })
            }
            Err(e) => {
                warn!(task = task_id, to = %target, error = %e, "stage update rejected, rolling back");
                let reverted = self.cache.update(self.scope, |tasks| {
                    // A refetch may already have replaced our optimistic write.
                    if let Some(task) = tasks
                        .iter_mut()
                        .find(|t| t.id == task_id && t.stage() == &target)
                    {
                        task.set_stage(previous.clone());
                    }
                    Ok(())
                });
                if let Err(revert_err) = reverted {
                    warn!(task = task_id, error = %revert_err, "local rollback failed");
                }
                publish_notice(
                    &self.notices,
                    Notice::TaskStatusUpdateFailed {
                        task_id,
                        stage: target.clone(),
                        detail: format!("{:#}", e),
                    },
                );
                self.mark_stale();
                Err(BoardError::TransitionRejected {
                    task_id,
                    target_stage: target,
                    source: e,
                })
            }
        }
    }

    async fn reorder_within_stage(&self, intent: &MoveIntent) -> Result<MoveOutcome, BoardError> {
        let task_id = intent.task_id;
        let stage = intent.target_stage.clone();

        // Positions come from the cache as it is now, not from the drag start.
        let changed: Vec<(TaskId, i32)> = self.cache.update(self.scope, |tasks| {
            let mut lane: Vec<usize> = tasks
                .iter()
                .enumerate()
                .filter(|(_, t)| t.active && t.stage() == &stage)
                .map(|(i, _)| i)
                .collect();
            lane.sort_by_key(|&i| tasks[i].order_index());

            let source = lane
                .iter()
                .position(|&i| tasks[i].id == task_id)
                .ok_or(BoardError::TaskNotFound { id: task_id })?;
            let target = intent
                .anchor
                .and_then(|anchor| lane.iter().position(|&i| tasks[i].id == anchor))
                .unwrap_or(lane.len());
            move_within(&mut lane, source, target);

            let mut changed = Vec::new();
            for (position, &i) in lane.iter().enumerate() {
                let order = to_order(position);
                if tasks[i].order_index() != order {
                    tasks[i].set_order_index(order);
                    changed.push((tasks[i].id, order));
                }
            }
            Ok(changed)
        })?;

        if changed.is_empty() {
            debug!(task = task_id, %stage, "reorder left the stage unchanged");
            return Ok(MoveOutcome::Reordered {
                stage,
                updated: Vec::new(),
            });
        }

        let api = &self.api;
        let calls = changed.iter().map(|&(id, order)| async move {
            (id, api.update_task_order(id, &OrderUpdate { order }).await)
        });
        let failed: Vec<TaskId> = join_all(calls)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    warn!(task = id, error = %e, "order update failed");
                    Some(id)
                }
            })
            .collect();

        if failed.is_empty() {
            info!(task = task_id, %stage, updated = changed.len(), "stage reordered");
            return Ok(MoveOutcome::Reordered {
                stage,
                updated: changed.into_iter().map(|(id, _)| id).collect(),
            });
        }

        publish_notice(
            &self.notices,
            Notice::TaskOrderUpdateFailed {
                stage: stage.clone(),
                failed_task_ids: failed.clone(),
            },
        );
        self.mark_stale();
        Err(BoardError::OrderUpdateFailed { stage, failed })
    }

    /// Replace the scope's cache partition with the server's view.
    ///
    /// Unconditional: callers sharing the engine across concurrent moves
    /// should prefer [`Self::handle_remote_event`], which waits for them.
    pub async fn refetch(&self) -> Result<usize, BoardError> {
        let tasks = self.fetch().await?;
        let count = tasks.len();
        self.cache.replace(self.scope, tasks)?;
        Ok(count)
    }

    async fn fetch(&self) -> Result<Vec<Task>, BoardError> {
        match self.api.fetch_tasks(self.scope, &FilterState::default()).await {
            Ok(tasks) => Ok(tasks),
            Err(e) => {
                publish_notice(
                    &self.notices,
                    Notice::RefreshFailed {
                        detail: format!("{:#}", e),
                    },
                );
                Err(BoardError::Other(
                    e.context(format!("Failed to refetch tasks for {}", self.scope)),
                ))
            }
        }
    }

    fn mark_stale(&self) {
        if let Err(e) = self.cache.invalidate(self.scope) {
            warn!(error = %e, "could not mark cache stale");
        }
    }

    /// Refetch a stale partition once no move is in flight. The last move to
    /// settle performs it, so no optimistic write is overwritten.
    async fn refetch_if_stale(&self) {
        if self.in_flight_count() > 0 {
            return;
        }
        match self.cache.is_stale(self.scope) {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                warn!(error = %e, "could not read cache state");
                return;
            }
        }
        match self.fetch().await {
            // Stays stale; the move that started meanwhile refetches when it settles
            Ok(_) if self.in_flight_count() > 0 => {
                debug!(in_flight = self.in_flight_count(), "refetch result dropped, moves in flight");
            }
            Ok(tasks) => {
                if let Err(e) = self.cache.replace(self.scope, tasks) {
                    warn!(error = %e, "could not install refetched tasks");
                }
            }
            Err(e) => warn!(error = %e, "deferred refetch failed"),
        }
    }

    /// Merge a server push by invalidation. The refetch waits while any move
    /// of this engine is still in flight.
    pub async fn handle_remote_event(&self, event: &RemoteEvent) -> Result<(), BoardError> {
        debug!(task = event.task_id(), scope = %self.scope, "remote change received");
        self.cache.invalidate(self.scope)?;
        if self.in_flight_count() > 0 {
            debug!(in_flight = self.in_flight_count(), "refetch deferred until moves settle");
            return Ok(());
        }
        self.refetch().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::models::Task;
    use crate::board::notice::notice_channel;
    use anyhow::Result;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingApi {
        fail_stage: bool,
        fail_order_for: Vec<TaskId>,
        server: Vec<Task>,
        stage_calls: Mutex<Vec<(TaskId, StageUpdate)>>,
        order_calls: Mutex<Vec<(TaskId, i32)>>,
        fetches: Mutex<usize>,
    }

    #[async_trait]
    impl TaskApi for RecordingApi {
        async fn update_task_stage(&self, task_id: TaskId, update: &StageUpdate) -> Result<()> {
            self.stage_calls.lock().unwrap().push((task_id, update.clone()));
            if self.fail_stage {
                anyhow::bail!("network error");
            }
            Ok(())
        }

        async fn update_task_order(&self, task_id: TaskId, update: &OrderUpdate) -> Result<()> {
            self.order_calls.lock().unwrap().push((task_id, update.order));
            if self.fail_order_for.contains(&task_id) {
                anyhow::bail!("conflict");
            }
            Ok(())
        }

        async fn fetch_tasks(&self, _scope: TaskScope, _filters: &FilterState) -> Result<Vec<Task>> {
            *self.fetches.lock().unwrap() += 1;
            Ok(self.server.clone())
        }
    }

    const SCOPE: TaskScope = TaskScope::Project(1);

    fn todo_tasks() -> Vec<Task> {
        vec![
            Task::new(1, "A", "todo", 0),
            Task::new(2, "B", "todo", 1),
            Task::new(3, "C", "todo", 2),
        ]
    }

    fn engine(api: Arc<RecordingApi>, tasks: Vec<Task>) -> (ReconciliationEngine, broadcast::Receiver<Notice>) {
        let cache = TaskCache::new();
        cache.replace(SCOPE, tasks).unwrap();
        let (tx, rx) = notice_channel();
        (ReconciliationEngine::new(api, cache, SCOPE, tx), rx)
    }

    fn orders(engine: &ReconciliationEngine) -> Vec<(TaskId, i32)> {
        let mut tasks = engine.cache().snapshot(SCOPE).unwrap().unwrap();
        tasks.sort_by_key(|t| t.order_index());
        tasks.iter().map(|t| (t.id, t.order_index())).collect()
    }

    fn intent(task_id: TaskId, from: &str, source: usize, to: &str, target: usize, anchor: Option<TaskId>) -> MoveIntent {
        MoveIntent {
            task_id,
            source_stage: StageKey::new(from),
            source_index: source,
            target_stage: StageKey::new(to),
            target_index: target,
            anchor,
        }
    }

    #[test]
    fn test_move_within_index_adjustment() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        move_within(&mut items, 0, 3);
        assert_eq!(items, vec!['b', 'c', 'a', 'd']);

        let mut items = vec!['a', 'b', 'c', 'd'];
        move_within(&mut items, 3, 1);
        assert_eq!(items, vec!['a', 'd', 'b', 'c']);

        let mut items = vec!['a', 'b', 'c'];
        move_within(&mut items, 0, 3);
        assert_eq!(items, vec!['b', 'c', 'a']);

        let mut items = vec!['a', 'b'];
        move_within(&mut items, 5, 0);
        assert_eq!(items, vec!['a', 'b']);
    }

    #[tokio::test]
    async fn test_reorder_to_front_renumbers_densely() {
        let api = Arc::new(RecordingApi::default());
        let (engine, _rx) = engine(api.clone(), todo_tasks());

        let outcome = engine
            .apply(intent(3, "todo", 2, "todo", 0, Some(1)))
            .await
            .unwrap();

        assert_eq!(orders(&engine), vec![(3, 0), (1, 1), (2, 2)]);
        let mut calls = api.order_calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec![(1, 1), (2, 2), (3, 0)]);
        assert!(matches!(outcome, MoveOutcome::Reordered { ref updated, .. } if updated.len() == 3));
        assert!(api.stage_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reorder_only_sends_changed_tasks() {
        let api = Arc::new(RecordingApi::default());
        let mut tasks = todo_tasks();
        tasks.push(Task::new(4, "D", "todo", 3));
        let (engine, _rx) = engine(api.clone(), tasks);

        // D before C
        engine
            .apply(intent(4, "todo", 3, "todo", 2, Some(3)))
            .await
            .unwrap();

        assert_eq!(orders(&engine), vec![(1, 0), (2, 1), (4, 2), (3, 3)]);
        let mut calls = api.order_calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec![(3, 3), (4, 2)]);
    }

    #[tokio::test]
    async fn test_reorder_closes_gaps() {
        let api = Arc::new(RecordingApi::default());
        let tasks = vec![
            Task::new(1, "A", "todo", 0),
            Task::new(2, "B", "todo", 5),
            Task::new(3, "C", "todo", 9),
        ];
        let (engine, _rx) = engine(api.clone(), tasks);

        engine
            .apply(intent(1, "todo", 0, "todo", 3, None))
            .await
            .unwrap();

        assert_eq!(orders(&engine), vec![(2, 0), (3, 1), (1, 2)]);
    }

    #[tokio::test]
    async fn test_reorder_ignores_other_stages_and_inactive() {
        let api = Arc::new(RecordingApi::default());
        let mut tasks = todo_tasks();
        tasks.push(Task::new(7, "Elsewhere", "review", 0));
        tasks.push(Task::new(8, "Archived", "todo", 1).inactive());
        let (engine, _rx) = engine(api.clone(), tasks);

        engine
            .apply(intent(1, "todo", 0, "todo", 3, None))
            .await
            .unwrap();

        let calls: Vec<TaskId> = api.order_calls.lock().unwrap().iter().map(|c| c.0).collect();
        assert!(!calls.contains(&7));
        assert!(!calls.contains(&8));
    }

    #[tokio::test]
    async fn test_partial_order_failure_is_reported_not_rolled_back() {
        let server = vec![
            Task::new(1, "A", "todo", 0),
            Task::new(2, "B", "todo", 1),
            Task::new(3, "C", "todo", 2),
        ];
        let api = Arc::new(RecordingApi {
            fail_order_for: vec![2],
            server: server.clone(),
            ..RecordingApi::default()
        });
        let (engine, mut rx) = engine(api.clone(), todo_tasks());

        let result = engine.apply(intent(3, "todo", 2, "todo", 0, Some(1))).await;

        match result {
            Err(BoardError::OrderUpdateFailed { stage, failed }) => {
                assert_eq!(stage.as_str(), "todo");
                assert_eq!(failed, vec![2]);
            }
            other => panic!("Expected OrderUpdateFailed, got {:?}", other),
        }
        // Every call was still attempted
        assert_eq!(api.order_calls.lock().unwrap().len(), 3);
        assert!(matches!(rx.try_recv().unwrap(), Notice::TaskOrderUpdateFailed { .. }));
        // The corrective refetch installed the server's order
        assert_eq!(*api.fetches.lock().unwrap(), 1);
        assert_eq!(orders(&engine), vec![(1, 0), (2, 1), (3, 2)]);
    }

    #[tokio::test]
    async fn test_cross_stage_move_keeps_order_and_calls_once() {
        let api = Arc::new(RecordingApi::default());
        let mut tasks = todo_tasks();
        tasks.push(Task::new(4, "D", "todo", 3));
        tasks.push(Task::new(5, "E", "in-progress", 0));
        let (engine, _rx) = engine(api.clone(), tasks);

        let outcome = engine
            .apply(intent(4, "todo", 3, "in-progress", 1, None))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            MoveOutcome::StageChanged {
                task_id: 4,
                from: StageKey::new("todo"),
                to: StageKey::new("in-progress"),
            }
        );
        let calls = api.stage_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                4,
                StageUpdate {
                    stage: StageKey::new("in-progress"),
                    order: 1
                }
            )]
        );
        assert!(api.order_calls.lock().unwrap().is_empty());

        let tasks = engine.cache().snapshot(SCOPE).unwrap().unwrap();
        let moved = tasks.iter().find(|t| t.id == 4).unwrap();
        assert_eq!(moved.stage().as_str(), "in-progress");
        assert_eq!(moved.order_index(), 3);
        // Source stage is not renumbered
        let todo: Vec<(TaskId, i32)> = tasks
            .iter()
            .filter(|t| t.stage().as_str() == "todo")
            .map(|t| (t.id, t.order_index()))
            .collect();
        assert_eq!(todo, vec![(1, 0), (2, 1), (3, 2)]);
    }

    #[tokio::test]
    async fn test_rejected_stage_change_rolls_back() {
        let api = Arc::new(RecordingApi {
            fail_stage: true,
            server: todo_tasks(),
            ..RecordingApi::default()
        });
        let (engine, mut rx) = engine(api.clone(), todo_tasks());

        let result = engine
            .apply(intent(2, "todo", 1, "review", 0, None))
            .await;

        assert!(matches!(
            result,
            Err(BoardError::TransitionRejected { task_id: 2, .. })
        ));
        let tasks = engine.cache().snapshot(SCOPE).unwrap().unwrap();
        assert_eq!(tasks.iter().find(|t| t.id == 2).unwrap().stage().as_str(), "todo");
        assert_eq!(*api.fetches.lock().unwrap(), 1);
        match rx.try_recv().unwrap() {
            Notice::TaskStatusUpdateFailed { task_id, .. } => assert_eq!(task_id, 2),
            other => panic!("Expected TaskStatusUpdateFailed, got {:?}", other),
        }
        assert!(!engine.is_in_flight(2));
    }

    #[tokio::test]
    async fn test_unknown_task_makes_no_call() {
        let api = Arc::new(RecordingApi::default());
        let (engine, _rx) = engine(api.clone(), todo_tasks());
        let result = engine.apply(intent(99, "todo", 0, "review", 0, None)).await;
        assert!(matches!(result, Err(BoardError::TaskNotFound { id: 99 })));
        assert!(api.stage_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_rejects_second_move_of_same_task() {
        let api = Arc::new(RecordingApi::default());
        let (engine, _rx) = engine(api.clone(), todo_tasks());
        let guard = engine.claim(1).unwrap();
        assert!(engine.is_in_flight(1));

        let result = engine.apply(intent(1, "todo", 0, "review", 0, None)).await;
        assert!(matches!(result, Err(BoardError::MoveInFlight { task_id: 1 })));
        assert!(api.stage_calls.lock().unwrap().is_empty());

        drop(guard);
        assert!(!engine.is_in_flight(1));
        assert_eq!(engine.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_event_refetches_when_idle() {
        let api = Arc::new(RecordingApi {
            server: vec![Task::new(1, "A", "completed", 0)],
            ..RecordingApi::default()
        });
        let (engine, _rx) = engine(api.clone(), todo_tasks());

        engine
            .handle_remote_event(&RemoteEvent::TaskUpdated { task_id: 1 })
            .await
            .unwrap();

        let tasks = engine.cache().snapshot(SCOPE).unwrap().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].stage().as_str(), "completed");
        assert!(!engine.cache().is_stale(SCOPE).unwrap());
    }

    #[tokio::test]
    async fn test_remote_event_deferred_while_move_in_flight() {
        let api = Arc::new(RecordingApi {
            server: todo_tasks(),
            ..RecordingApi::default()
        });
        let (engine, _rx) = engine(api.clone(), todo_tasks());

        let guard = engine.claim(3).unwrap();
        engine
            .handle_remote_event(&RemoteEvent::TaskDeleted { task_id: 2 })
            .await
            .unwrap();
        assert_eq!(*api.fetches.lock().unwrap(), 0);
        assert!(engine.cache().is_stale(SCOPE).unwrap());
        drop(guard);

        // The next settled move picks up the pending refetch
        engine
            .apply(intent(1, "todo", 0, "review", 0, None))
            .await
            .unwrap();
        assert_eq!(*api.fetches.lock().unwrap(), 1);
        assert!(!engine.cache().is_stale(SCOPE).unwrap());
    }

    #[tokio::test]
    async fn test_failed_move_waits_for_other_moves_before_refetch() {
        let api = Arc::new(RecordingApi {
            fail_stage: true,
            server: todo_tasks(),
            ..RecordingApi::default()
        });
        let (engine, mut rx) = engine(api.clone(), todo_tasks());

        // Another move of task 1 is mid-flight with its optimistic write applied
        let other = engine.claim(1).unwrap();
        engine
            .cache()
            .update(SCOPE, |tasks| {
                tasks[0].set_stage(StageKey::new("in-progress"));
                Ok(())
            })
            .unwrap();

        let result = engine.apply(intent(2, "todo", 1, "review", 0, None)).await;
        assert!(matches!(result, Err(BoardError::TransitionRejected { task_id: 2, .. })));
        assert!(matches!(rx.try_recv().unwrap(), Notice::TaskStatusUpdateFailed { .. }));

        // Rolled back locally, but the refetch is held back
        assert_eq!(*api.fetches.lock().unwrap(), 0);
        assert!(engine.cache().is_stale(SCOPE).unwrap());
        let tasks = engine.cache().snapshot(SCOPE).unwrap().unwrap();
        assert_eq!(tasks[0].stage().as_str(), "in-progress");
        assert_eq!(tasks[1].stage().as_str(), "todo");

        // Settling the other move runs the pending refetch
        drop(other);
        engine.refetch_if_stale().await;
        assert_eq!(*api.fetches.lock().unwrap(), 1);
        assert!(!engine.cache().is_stale(SCOPE).unwrap());
    }

    #[tokio::test]
    async fn test_other_partitions_untouched() {
        let api = Arc::new(RecordingApi::default());
        let (engine, _rx) = engine(api.clone(), todo_tasks());
        let other = TaskScope::Company(1);
        engine
            .cache()
            .replace(other, vec![Task::new(2, "B", "todo", 1)])
            .unwrap();

        engine
            .apply(intent(2, "todo", 1, "review", 0, None))
            .await
            .unwrap();

        let untouched = engine.cache().snapshot(other).unwrap().unwrap();
        assert_eq!(untouched[0].stage().as_str(), "todo");
    }
}
