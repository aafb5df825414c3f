//! Board configuration read from `.taskboard/taskboard.toml`.
//!
//! Layering is file → environment → CLI:
//! - the file provides the API endpoint, default view scope and stage list;
//! - `TASKBOARD_API_URL` overrides `api.base_url`;
//! - the API token is never stored in the file, only the name of the
//!   environment variable that holds it.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000/api"
//! timeout_secs = 15
//! token_env = "TASKBOARD_API_TOKEN"
//!
//! [view]
//! scope = "project:1"
//!
//! [[stages]]
//! key = "todo"
//! title = "To Do"
//!
//! [[stages]]
//! key = "on-hold"
//! title = "On Hold"
//! requires_elevated_access = true
//! ```
//!
//! Without a `[[stages]]` list the standard pipeline is used.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::board::api::HttpTaskApi;
use crate::board::cache::TaskScope;
use crate::board::models::Stage;
use crate::board::pipeline::{PipelineDefinition, standard_stages};

pub const CONFIG_DIR: &str = ".taskboard";
pub const CONFIG_FILE: &str = "taskboard.toml";
pub const API_URL_ENV: &str = "TASKBOARD_API_URL";

/// Directory holding the board configuration for a project.
pub fn config_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_token_env() -> String {
    "TASKBOARD_API_TOKEN".to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewSection {
    /// Default scope for `board` and `move`, e.g. `project:1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// The complete taskboard.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub view: ViewSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
}

impl BoardToml {
    /// Default file contents with the standard stages spelled out.
    pub fn starter() -> Self {
        Self {
            stages: standard_stages(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse taskboard.toml")
    }

    /// Load `taskboard.toml` from `config_dir`, or defaults when it is missing.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize taskboard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// API base URL (env → file).
    pub fn base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.api.base_url.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn token(&self) -> Option<String> {
        std::env::var(&self.api.token_env)
            .ok()
            .filter(|v| !v.is_empty())
    }

    pub fn pipeline(&self) -> Result<PipelineDefinition> {
        if self.stages.is_empty() {
            return Ok(PipelineDefinition::standard());
        }
        Ok(PipelineDefinition::new(self.stages.clone())?)
    }

    pub fn scope(&self) -> Result<Option<TaskScope>> {
        self.view
            .scope
            .as_deref()
            .map(|s| s.parse::<TaskScope>().map_err(anyhow::Error::msg))
            .transpose()
    }

    pub fn http_api(&self) -> Result<HttpTaskApi> {
        HttpTaskApi::new(&self.base_url(), self.timeout(), self.token())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            warnings.push("api.base_url is empty".to_string());
        } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            warnings.push(format!(
                "Invalid api.base_url '{}': must start with http:// or https://",
                base_url
            ));
        }

        if self.api.timeout_secs == 0 {
            warnings.push("api.timeout_secs must be greater than 0".to_string());
        }

        if let Err(e) = self.scope() {
            warnings.push(format!("Invalid view.scope: {}", e));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.key.as_str().trim().is_empty() {
                warnings.push(format!("Stage '{}' has an empty key", stage.title));
            } else if !seen.insert(stage.key.as_str()) {
                warnings.push(format!("Duplicate stage key '{}'", stage.key));
            }
        }
        if !self.stages.is_empty() && self.stages.iter().all(|s| s.requires_elevated_access) {
            warnings.push(
                "Every stage requires elevated access; standard users cannot move any task"
                    .to_string(),
            );
        }

        warnings
    }
}

/// Resolved configuration for one project directory.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: BoardToml,
}

impl BoardConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = config_dir(&project_dir);
        let toml = BoardToml::load_or_default(&config_dir)?;
        Ok(Self {
            project_dir,
            config_dir,
            toml,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Scope to use: CLI value first, then `[view] scope`.
    pub fn resolve_scope(&self, cli_scope: Option<TaskScope>) -> Result<TaskScope> {
        match cli_scope {
            Some(scope) => Ok(scope),
            None => self.toml.scope()?.context(
                "No scope given. Pass --scope (e.g. project:1) or set [view] scope in taskboard.toml",
            ),
        }
    }
}
