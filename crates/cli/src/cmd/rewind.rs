//! List checkpoints or branch off at one

use crate::config::Settings;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use partio_store::SessionFile;
use tracing::warn;

/// Print every checkpoint on the branch
pub async fn run_list(settings: &Settings) -> Result<()> {
    let repo = util::open_repo()?;
    let store = util::store(&repo, settings);
    util::require_branch(&store)?;

    let entries = store.list()?;
    if entries.is_empty() {
        println!("No checkpoints found.");
        return Ok(());
    }

    println!("{}", "Checkpoints:".bold());
    for entry in entries {
        match &entry.metadata {
            Ok(meta) => println!(
                "  {}  branch={}  agent={}%  created={}",
                entry.id.yellow(),
                meta.branch,
                meta.agent_percent,
                util::format_timestamp(&meta.created_at)
            ),
            Err(err) => {
                warn!(id = %entry.id, error = %err, "checkpoint metadata unreadable");
                println!("  {}  {}", entry.id.yellow(), "(metadata unavailable)".dimmed());
            }
        }
    }
    Ok(())
}

/// Check out `partio/rewind/<id>` at the checkpoint's commit
pub async fn run_to(settings: &Settings, id: &str) -> Result<()> {
    let repo = util::open_repo()?;
    let store = util::store(&repo, settings);
    util::require_branch(&store)?;

    let meta = store
        .read_metadata(id)
        .with_context(|| format!("Checkpoint not found: {id}"))?;
    let context = store
        .read_session_file(id, SessionFile::Context)
        .unwrap_or_default();

    println!("Rewinding to checkpoint {}", id.yellow());
    println!("  Commit:  {}", meta.commit_hash);
    println!("  Branch:  {}", meta.branch);
    if !context.is_empty() {
        println!("  Context: {context}");
    }

    let branch = format!("partio/rewind/{id}");
    repo.checkout_new_branch(&branch, &meta.commit_hash)
        .with_context(|| format!("Failed to check out {}", meta.commit_hash))?;

    println!();
    println!("{} Checked out {}", "✓".green(), branch.cyan());
    Ok(())
}
