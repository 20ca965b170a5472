//! Disable partio in the current repository

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use partio_core::VersionControl;
use std::fs;

/// Remove the hooks; with `remove_data`, also delete `.partio/`
///
/// The checkpoint branch is left alone.
pub async fn run(remove_data: bool) -> Result<()> {
    let repo = util::open_repo()?;
    partio_git::uninstall_hooks(&repo).context("Failed to remove git hooks")?;
    println!("{} Removed git hooks", "✓".green());

    if remove_data {
        let dir = util::partio_dir(repo.root());
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
            println!("{} Removed {}", "✓".green(), ".partio/".cyan());
        }
    }

    println!(
        "{}",
        "partio is disabled. Checkpoint history is kept on its branch.".dimmed()
    );
    Ok(())
}
