use std::collections::HashSet;

use crate::errors::BoardError;

use super::models::{Stage, StageKey};

/// Ordered, immutable set of pipeline stages. Insertion order is the column
/// display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefinition {
    stages: Vec<Stage>,
}

impl PipelineDefinition {
    /// Build a definition from configured stages, rejecting empty lists,
    /// blank keys and duplicate keys.
    pub fn new(stages: Vec<Stage>) -> Result<Self, BoardError> {
        if stages.is_empty() {
            return Err(BoardError::InvalidPipeline(
                "at least one stage is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for stage in &stages {
            if stage.key.as_str().trim().is_empty() {
                return Err(BoardError::InvalidPipeline(format!(
                    "stage '{}' has an empty key",
                    stage.title
                )));
            }
            if !seen.insert(stage.key.as_str()) {
                return Err(BoardError::InvalidPipeline(format!(
                    "duplicate stage key '{}'",
                    stage.key
                )));
            }
        }
        Ok(Self { stages })
    }

    /// The stock board: four open stages and two that need elevated access.
    pub fn standard() -> Self {
        Self {
            stages: standard_stages(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, key: &StageKey) -> Option<&Stage> {
        self.stages.iter().find(|s| &s.key == key)
    }

    pub fn position(&self, key: &StageKey) -> Option<usize> {
        self.stages.iter().position(|s| &s.key == key)
    }

    pub fn contains(&self, key: &StageKey) -> bool {
        self.stage(key).is_some()
    }
}

impl Default for PipelineDefinition {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn standard_stages() -> Vec<Stage> {
    vec![
        Stage::open("todo", "To Do"),
        Stage::open("in-progress", "In Progress"),
        Stage::open("review", "In Review"),
        Stage::open("completed", "Completed"),
        Stage::restricted("on-hold", "On Hold"),
        Stage::restricted("cancelled", "Cancelled"),
    ]
}
