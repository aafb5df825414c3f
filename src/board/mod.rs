//! Task pipeline board: ordering and stage transitions.
//!
//! ## Module Map
//!
//! ```text
//!  drag gestures                                  backend
//!       │                                            ^
//!       v                                            │ TaskApi
//! ┌──────────────────────────────────────────────────┴────────┐
//! │  view.rs       (PipelineView, DropResult)                 │
//! │    ├─ intent.rs     (MoveIntentTranslator → MoveIntent)   │
//! │    │     └─ policy.rs  (can_pick_up, can_drop_into)       │
//! │    ├─ reconcile.rs  (ReconciliationEngine, MoveOutcome)   │
//! │    │     ├─ cache.rs   (TaskCache, per-scope partitions)  │
//! │    │     └─ notice.rs  (Notice broadcast)                 │
//! │    └─ aggregate.rs  (FilterState → StageBuckets)          │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | `models`   | `Task`, `Stage`, `StageKey`, `Priority`, `TaskKind`     |
//! | `pipeline` | Ordered stage list (`PipelineDefinition`)               |
//! | `api`      | `TaskApi` trait and its REST client `HttpTaskApi`       |
//! | `events`   | `RemoteEvent` server push messages                      |

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod events;
pub mod intent;
pub mod models;
pub mod notice;
pub mod pipeline;
pub mod policy;
pub mod reconcile;
pub mod view;

pub use aggregate::{FilterState, Month, StageBuckets, StageColumn, group_by_stage};
pub use api::{HttpTaskApi, OrderUpdate, StageUpdate, TaskApi};
pub use cache::{TaskCache, TaskScope};
pub use events::RemoteEvent;
pub use intent::{DragPayload, DropIndicator, MoveIntent, MoveIntentTranslator};
pub use models::{Priority, Stage, StageKey, Task, TaskId, TaskKind};
pub use notice::Notice;
pub use pipeline::PipelineDefinition;
pub use policy::{Actor, Permission, Role};
pub use reconcile::{MoveOutcome, ReconciliationEngine};
pub use view::{DropResult, PipelineView};
