//! Git hook runner behind `partio _hook <name>`
//!
//! Hook failures never block the user's git operation: every error is
//! logged and the hook exits successfully.

use crate::config::Settings;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::ValueEnum;
use partio_agent::{
    attribution, format_duration, ClaudeDetector, Detector, PreCommitState, SessionData,
};
use partio_core::VersionControl;
use partio_git::GitRepo;
use partio_store::{
    Checkpoint, CheckpointId, CheckpointStore, SessionFiles, SessionMetadata, WriteReceipt,
    CHECKPOINT_BRANCH,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const PUSH_REMOTE: &str = "origin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookName {
    PreCommit,
    PostCommit,
    PrePush,
}

/// Run one hook, logging instead of returning errors
pub async fn run(hook: HookName, settings: &Settings) -> Result<()> {
    if !settings.enabled {
        debug!(?hook, "partio disabled, skipping hook");
        return Ok(());
    }

    let outcome = match hook {
        HookName::PreCommit => pre_commit(settings),
        HookName::PostCommit => post_commit(settings).await,
        HookName::PrePush => pre_push(settings),
    };
    if let Err(err) = outcome {
        let message = format!("{err:#}");
        warn!(?hook, error = %message, "partio hook failed");
    }
    Ok(())
}

fn pre_commit(settings: &Settings) -> Result<()> {
    let repo = crate::util::open_repo()?;
    let root = repo.root().to_path_buf();
    let detector = ClaudeDetector::new()?;

    let running = detector.is_running().unwrap_or_else(|err| {
        warn!(error = %err, "could not check for a running agent");
        false
    });
    let session_path = if running {
        match detector.find_latest_session(&root) {
            Ok((path, _)) => Some(path),
            Err(err) => {
                debug!(error = %err, "no session found for running agent");
                None
            }
        }
    } else {
        None
    };

    let state = PreCommitState {
        agent_active: session_path.is_some(),
        session_path,
        pre_commit_hash: repo.head_commit()?.map(|id| id.to_hex()),
        branch: repo.current_branch()?.unwrap_or_default(),
    };
    state.save(&root)?;
    debug!(agent = %settings.agent, active = state.agent_active, "recorded pre-commit state");
    Ok(())
}

async fn post_commit(settings: &Settings) -> Result<()> {
    let repo = crate::util::open_repo()?;
    let root = repo.root().to_path_buf();

    let Some(state) = PreCommitState::take(&root)? else {
        debug!("no pre-commit state, skipping checkpoint");
        return Ok(());
    };
    if !state.agent_active {
        debug!("no agent session was active, skipping checkpoint");
        return Ok(());
    }
    let Some(head) = repo.head_commit()? else {
        return Ok(());
    };

    let agent_percent = match repo.commit_numstat(&head) {
        Ok(stats) => {
            attribution::calculate(stats.iter().map(|s| s.added), state.agent_active).agent_percent
        }
        Err(err) => {
            warn!(error = %err, "attribution failed, assuming agent authored the commit");
            100
        }
    };

    let detector = ClaudeDetector::new()?;
    let (session_path, session) = load_session(&detector, &root, state.session_path.as_deref());
    let diff = repo.commit_diff(&head).unwrap_or_else(|err| {
        warn!(error = %err, "could not render commit diff");
        String::new()
    });

    let commit_hash = head.to_hex();
    let checkpoint = Checkpoint {
        id: CheckpointId::generate(),
        session_id: session.session_id.clone(),
        commit_hash: commit_hash.clone(),
        branch: if state.branch.is_empty() {
            repo.current_branch()?.unwrap_or_default()
        } else {
            state.branch.clone()
        },
        created_at: Utc::now(),
        agent: settings.agent.clone(),
        agent_percent,
        content_hash: commit_hash.clone(),
        plan_slug: session.plan_slug.clone(),
    };
    let files = SessionFiles {
        content_hash: commit_hash,
        context: session.context.clone(),
        diff,
        full_jsonl: read_transcript(session_path.as_deref()),
        metadata: SessionMetadata {
            agent: settings.agent.clone(),
            total_tokens: session.total_tokens,
            duration: format_duration(session.duration),
        },
        prompt: session.prompt.clone(),
    };
    // git2 handles are not shareable across threads; the blocking task
    // opens its own.
    drop(repo);

    let receipt = write_with_timeout(
        root.clone(),
        settings.clone(),
        checkpoint,
        files,
        Duration::from_secs(settings.hook_timeout_secs),
    )
    .await?;
    info!(id = %receipt.id, commit = %receipt.commit, "checkpoint saved");

    let repo = GitRepo::open(&root)?;
    let attribution = format!("{agent_percent}% agent");
    if let Err(err) = repo.amend_trailers(&[
        ("Partio-Checkpoint", receipt.id.as_str()),
        ("Partio-Attribution", &attribution),
    ]) {
        warn!(error = %err, "could not add checkpoint trailers");
    }
    Ok(())
}

/// Parse the session recorded at pre-commit, else the newest one
fn load_session(
    detector: &ClaudeDetector,
    root: &Path,
    recorded: Option<&Path>,
) -> (Option<PathBuf>, SessionData) {
    if let Some(path) = recorded {
        match partio_agent::parse_jsonl(path) {
            Ok(data) => return (Some(path.to_path_buf()), data),
            Err(err) => warn!(error = %err, "recorded session unreadable, searching again"),
        }
    }
    match detector.find_latest_session(root) {
        Ok((path, data)) => (Some(path), data),
        Err(err) => {
            warn!(error = %err, "no agent session found");
            (None, SessionData::default())
        }
    }
}

fn read_transcript(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return String::new();
    };
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read transcript");
            String::new()
        }
    }
}

/// Write the checkpoint on a blocking task, bounded by `limit`
///
/// On timeout the hook reports failure while the blocking task keeps
/// running until the process exits; `util::block_on` does not wait for it.
/// The ref update is the last step of a write, so a write cut short by exit
/// leaves only unreferenced objects behind.
async fn write_with_timeout(
    root: PathBuf,
    settings: Settings,
    checkpoint: Checkpoint,
    files: SessionFiles,
    limit: Duration,
) -> Result<WriteReceipt> {
    let task = tokio::task::spawn_blocking(move || -> Result<WriteReceipt> {
        let repo = GitRepo::open(&root)?;
        let store = CheckpointStore::new(&repo).with_policy(settings.ref_policy());
        store
            .write(&checkpoint, &files)
            .with_context(|| format!("Failed to write checkpoint {}", checkpoint.id))
    });

    match tokio::time::timeout(limit, task).await {
        Ok(joined) => joined.context("Checkpoint writer panicked")?,
        Err(_) => anyhow::bail!("Checkpoint write timed out after {}s", limit.as_secs()),
    }
}

fn pre_push(settings: &Settings) -> Result<()> {
    if !settings.strategy_options.push_sessions {
        debug!("session pushing disabled");
        return Ok(());
    }
    let repo = crate::util::open_repo()?;
    if !repo.has_remote(PUSH_REMOTE) {
        debug!(remote = PUSH_REMOTE, "no remote, skipping checkpoint push");
        return Ok(());
    }
    if !repo.branch_exists(CHECKPOINT_BRANCH)? {
        return Ok(());
    }
    if let Err(err) = repo.push_branch(PUSH_REMOTE, CHECKPOINT_BRANCH) {
        warn!(error = %err, "failed to push checkpoint branch");
    }
    Ok(())
}
