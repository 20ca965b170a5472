//! Delete and recreate the checkpoint branch

use crate::config::Settings;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub async fn run(settings: &Settings, yes: bool) -> Result<()> {
    let repo = util::open_repo()?;
    let store = util::store(&repo, settings);

    let count = if store.exists()? { store.count()? } else { 0 };
    if !yes {
        let prompt = format!(
            "This permanently removes {count} checkpoint(s) from {}. Continue?",
            store.branch()
        );
        if !util::confirm(&prompt)? {
            println!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }

    store.reset().context("Failed to reset checkpoint branch")?;
    println!(
        "{} Reset {} ({count} checkpoint(s) removed)",
        "✓".green(),
        store.branch().cyan()
    );
    Ok(())
}
