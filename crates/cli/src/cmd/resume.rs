//! Continue a previous session from a checkpoint

use crate::config::Settings;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use partio_agent::ClaudeDetector;
use partio_store::CheckpointData;
use std::fs;
use std::process::Command;
use tracing::{debug, warn};

const CLAUDE_BIN: &str = "claude";

pub async fn run(settings: &Settings, id: &str, print_only: bool, branch: bool) -> Result<()> {
    let repo = util::open_repo()?;
    let store = util::store(&repo, settings);
    util::require_branch(&store)?;

    let data = store
        .read_checkpoint(id)
        .with_context(|| format!("Checkpoint not found: {id}"))?;

    let plan = match &data.metadata.plan_slug {
        Some(slug) => ClaudeDetector::new()
            .and_then(|detector| detector.read_plan(slug))
            .unwrap_or_else(|err| {
                warn!(slug = %slug, error = %err, "could not read plan");
                String::new()
            }),
        None => String::new(),
    };
    let prompt = compose_prompt(id, &data, &plan);

    if branch {
        let name = format!("partio/resume/{id}");
        repo.checkout_new_branch(&name, &data.metadata.commit_hash)
            .with_context(|| format!("Failed to create {name}"))?;
        println!("{} Checked out {}", "✓".green(), name.cyan());
    }

    if print_only {
        print!("{prompt}");
        return Ok(());
    }
    launch_claude(id, &prompt)
}

/// Markdown briefing handed to the agent
pub fn compose_prompt(id: &str, data: &CheckpointData, plan: &str) -> String {
    let meta = &data.metadata;
    let session = &data.session;

    let request = [session.prompt.as_str(), session.context.as_str()]
        .into_iter()
        .find(|text| !text.trim().is_empty())
        .unwrap_or("(No prompt was recorded.)");
    let plan = if plan.trim().is_empty() {
        "No plan was recorded."
    } else {
        plan
    };
    let diff = if session.diff.trim().is_empty() {
        "No diff was recorded.".to_string()
    } else {
        format!("```diff\n{}\n```", session.diff.trim_end())
    };

    format!(
        "# Previous Session Context\n\n\
         You are continuing work from a previous Partio session (checkpoint {id}).\n\n\
         ## Original Request\n\n{request}\n\n\
         ## Plan\n\n{plan}\n\n\
         ## Changes Made\n\n{diff}\n\n\
         ## Session Info\n\n\
         - **Branch:** {branch}\n\
         - **Commit:** {commit}\n\
         - **Date:** {date}\n\
         - **Agent:** {agent} ({percent}%)\n\n\
         ---\n\n\
         Please review the current state of the repository and continue this work.\n",
        branch = meta.branch,
        commit = meta.commit_hash,
        date = util::format_timestamp(&meta.created_at),
        agent = meta.agent,
        percent = meta.agent_percent,
    )
}

/// Hand the briefing to Claude Code, or print it when Claude is missing
fn launch_claude(id: &str, prompt: &str) -> Result<()> {
    let claude = match which::which(CLAUDE_BIN) {
        Ok(path) => path,
        Err(err) => {
            debug!(error = %err, "claude lookup failed");
            println!("Claude Code not found in PATH. Printing context instead:");
            println!();
            print!("{prompt}");
            return Ok(());
        }
    };

    let path = std::env::temp_dir().join(format!("partio-resume-{id}.md"));
    fs::write(&path, prompt).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "wrote resume context");

    let status = Command::new(&claude)
        .arg(format!(
            "Read {} for full context on a previous session, then continue that work.",
            path.display()
        ))
        .status()
        .context("Failed to launch Claude Code")?;
    if !status.success() {
        anyhow::bail!("Claude Code exited with {status}");
    }
    Ok(())
}
