//! Configuration view and validation commands: `taskboard config`.

use anyhow::Result;

use taskboard::config::{BoardToml, CONFIG_FILE, config_dir};

use super::super::ConfigCommands;

fn print_settings(toml: &BoardToml) -> Result<()> {
    println!("[api]");
    println!("  base_url = \"{}\"", toml.api.base_url);
    println!("  timeout_secs = {}", toml.api.timeout_secs);
    println!("  token_env = \"{}\"", toml.api.token_env);
    println!();

    if let Some(scope) = &toml.view.scope {
        println!("[view]");
        println!("  scope = \"{}\"", scope);
        println!();
    }

    let pipeline = toml.pipeline()?;
    let source = if toml.stages.is_empty() {
        " (standard)"
    } else {
        ""
    };
    println!("[stages]{}", source);
    for stage in pipeline.stages() {
        let access = if stage.requires_elevated_access {
            " (elevated)"
        } else {
            ""
        };
        println!("  {} = \"{}\"{}", stage.key, stage.title, access);
    }
    println!();
    Ok(())
}

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_dir = config_dir(project_dir);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Taskboard Configuration");
            println!("=======================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                BoardToml::load(&config_path)?
            } else {
                println!("No taskboard.toml found at {}", config_path.display());
                println!("Using default configuration.");
                println!();
                BoardToml::default()
            };
            print_settings(&toml)?;

            println!("Effective values (with env overrides):");
            println!("  base_url = \"{}\"", toml.base_url());
            let token = if toml.token().is_some() {
                "set"
            } else {
                "not set"
            };
            println!("  token ({}) = {}", toml.api.token_env, token);
            println!();

            if !config_path.exists() {
                println!("Run 'taskboard config init' to create a taskboard.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No taskboard.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = BoardToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("taskboard.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)?;
            }

            BoardToml::starter().save(&config_path)?;

            println!("Created taskboard.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] base_url, timeout_secs, token_env");
            println!("  - [view] scope (e.g. \"project:1\")");
            println!("  - [[stages]] key, title, requires_elevated_access");
            println!();
        }
    }

    Ok(())
}
