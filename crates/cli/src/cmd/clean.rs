//! Report checkpoint data held in the repository

use crate::config::Settings;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

/// Checkpoints cannot be removed one at a time; point at `reset`
pub async fn run(settings: &Settings) -> Result<()> {
    let repo = util::open_repo()?;
    let store = util::store(&repo, settings);

    if !store.exists()? {
        println!("{}", "No checkpoint data found.".dimmed());
        return Ok(());
    }

    let count = store.count()?;
    println!(
        "Branch {} holds {count} checkpoint(s) across {} shard(s).",
        store.branch().cyan(),
        store.list_shards()?.len()
    );
    println!(
        "{}",
        "Checkpoints cannot be removed individually. Run 'partio reset' to clear them all."
            .dimmed()
    );
    Ok(())
}
