//! Board commands: `taskboard board` and `taskboard move`.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use taskboard::board::{
    Actor, DropIndicator, DropResult, FilterState, MoveOutcome, Permission, PipelineView, Role,
    StageBuckets, StageKey, Task, TaskApi, TaskCache, TaskId, TaskScope, group_by_stage,
};
use taskboard::config::BoardConfig;

use crate::FilterArgs;

pub struct MoveArgs {
    pub task_id: TaskId,
    pub to: String,
    pub position: usize,
    pub scope: Option<TaskScope>,
    pub actor_id: i64,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

fn filter_state(args: &FilterArgs) -> FilterState {
    let mut filters = FilterState {
        project_id: args.project,
        priority: args.priority,
        month: args.month,
        assignee_id: args.assignee,
        search: args.search.clone(),
        show_subtasks: !args.hide_subtasks,
        ..FilterState::default()
    };
    if !args.types.is_empty() {
        filters.visible_types = args.types.iter().copied().collect::<BTreeSet<_>>();
    }
    filters
}

fn describe(task: &Task) -> String {
    let mut line = format!("#{:<5} {}", task.id, task.title);
    line.push_str(&format!(
        " {}",
        console::style(format!("[{}]", task.priority)).dim()
    ));
    if !task.assignees.is_empty() {
        let ids: Vec<String> = task.assignees.iter().map(|a| a.id.to_string()).collect();
        line.push_str(&format!(" @{}", ids.join(",")));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due));
    }
    if task.is_subtask() {
        line.push_str(&format!(" {}", console::style("(subtask)").dim()));
    }
    line
}

fn print_buckets(scope: TaskScope, buckets: &StageBuckets) {
    println!();
    println!(
        "{}",
        console::style(format!("Board for {}", scope)).bold().cyan()
    );
    println!("─────────────────────────");
    for column in &buckets.columns {
        let lock = if column.stage.requires_elevated_access {
            format!(" {}", console::style("[elevated]").yellow())
        } else {
            String::new()
        };
        println!();
        println!(
            "{} ({}){}",
            console::style(&column.stage.title).bold(),
            column.tasks.len(),
            lock
        );
        for task in &column.tasks {
            println!("  {}", describe(task));
        }
    }
    println!();
    println!("{} tasks shown", buckets.total());
}

pub async fn cmd_board(
    project_dir: &std::path::Path,
    scope: Option<TaskScope>,
    args: &FilterArgs,
) -> Result<()> {
    let config = BoardConfig::new(project_dir.to_path_buf())?;
    let scope = config.resolve_scope(scope)?;
    let pipeline = config.toml.pipeline()?;
    let api = config.toml.http_api()?;
    let filters = filter_state(args);

    let tasks = api
        .fetch_tasks(scope, &filters)
        .await
        .with_context(|| format!("Failed to load board for {}", scope))?;
    debug!(%scope, count = tasks.len(), "tasks fetched");

    let buckets = group_by_stage(&pipeline, &tasks, &filters);
    print_buckets(scope, &buckets);
    Ok(())
}

pub async fn cmd_move(project_dir: &std::path::Path, args: MoveArgs) -> Result<()> {
    let config = BoardConfig::new(project_dir.to_path_buf())?;
    let scope = config.resolve_scope(args.scope)?;
    let pipeline = Arc::new(config.toml.pipeline()?);
    let api: Arc<dyn TaskApi> = Arc::new(config.toml.http_api()?);

    let actor = args
        .permissions
        .iter()
        .fold(Actor::new(args.actor_id, args.role), |actor, p| {
            actor.with_permission(&p.category, &p.action)
        });

    let mut view = PipelineView::new(pipeline, actor, api, TaskCache::new(), scope);
    let mut notices = view.subscribe_notices();
    view.load()
        .await
        .with_context(|| format!("Failed to load tasks for {}", scope))?;

    let target = StageKey::new(args.to.as_str());
    view.on_drag_start(args.task_id)?;
    if view.on_drag_over_stage(&target) == DropIndicator::Blocked {
        debug!(stage = %target, "drop target reported blocked");
    }
    let result = view.on_drop(&target, args.position).await;

    while let Ok(notice) = notices.try_recv() {
        eprintln!("{} {}", console::style("⚠").yellow(), notice.message());
    }

    match result? {
        DropResult::Moved(MoveOutcome::StageChanged { task_id, from, to }) => {
            println!(
                "{} Task #{} moved: {} → {}",
                console::style("✓").green(),
                task_id,
                from,
                to
            );
        }
        DropResult::Moved(MoveOutcome::Reordered { stage, updated }) => {
            println!(
                "{} Stage '{}' reordered ({} task(s) updated)",
                console::style("✓").green(),
                stage,
                updated.len()
            );
        }
        DropResult::Unchanged => {
            println!("Task #{} is already at that position.", args.task_id);
        }
        DropResult::Blocked(action) => {
            anyhow::bail!("Not allowed to {}", action);
        }
        DropResult::Cancelled => {
            anyhow::bail!("Move of task #{} was cancelled", args.task_id);
        }
    }

    Ok(())
}
