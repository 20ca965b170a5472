//! Show one checkpoint

use crate::config::Settings;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use partio_store::SessionFile;

/// Print the checkpoint's metadata, or the raw contents of one session file
pub async fn run(settings: &Settings, id: &str, file: Option<&str>) -> Result<()> {
    let repo = util::open_repo()?;
    let store = util::store(&repo, settings);
    util::require_branch(&store)?;

    if let Some(name) = file {
        let file: SessionFile = name.parse().map_err(anyhow::Error::msg)?;
        let content = store
            .read_session_file(id, file)
            .with_context(|| format!("Failed to read {file} for checkpoint {id}"))?;
        print!("{content}");
        return Ok(());
    }

    let data = store
        .read_checkpoint(id)
        .with_context(|| format!("Checkpoint not found: {id}"))?;
    let meta = &data.metadata;
    let session = &data.session.metadata;

    println!("{} {}", "Checkpoint".bold(), meta.id.yellow());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Commit:      {}", meta.commit_hash);
    println!("  Branch:      {}", meta.branch);
    println!("  Created:     {}", util::format_timestamp(&meta.created_at));
    println!("  Agent:       {} ({}%)", meta.agent, meta.agent_percent);
    if !meta.session_id.is_empty() {
        println!("  Session:     {}", meta.session_id);
    }
    if let Some(slug) = &meta.plan_slug {
        println!("  Plan:        {slug}");
    }
    println!("  Tokens:      {}", session.total_tokens);
    println!("  Duration:    {}", session.duration);

    if !data.session.context.is_empty() {
        println!();
        println!("{}", "Context:".bold());
        println!("  {}", data.session.context);
    }

    println!();
    println!(
        "{}",
        format!("Files: {}", file_names().join(", ")).dimmed()
    );
    Ok(())
}

fn file_names() -> Vec<&'static str> {
    SessionFile::ALL.iter().map(SessionFile::file_name).collect()
}
