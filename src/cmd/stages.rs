//! Pipeline listing: `taskboard stages`.

use anyhow::Result;

use taskboard::config::BoardConfig;

pub fn cmd_stages(project_dir: &std::path::Path) -> Result<()> {
    let config = BoardConfig::new(project_dir.to_path_buf())?;
    let pipeline = config.toml.pipeline()?;

    println!();
    println!(
        "{:<4} {:<16} {:<20} {}",
        "#", "Key", "Title", "Access"
    );
    println!(
        "{:<4} {:<16} {:<20} {}",
        "----", "----------------", "--------------------", "--------"
    );
    for (idx, stage) in pipeline.stages().iter().enumerate() {
        let access = if stage.requires_elevated_access {
            console::style("elevated").yellow().to_string()
        } else {
            "open".to_string()
        };
        println!(
            "{:<4} {:<16} {:<20} {}",
            idx, stage.key, stage.title, access
        );
    }
    println!();
    println!("{} stages", pipeline.stages().len());

    Ok(())
}
