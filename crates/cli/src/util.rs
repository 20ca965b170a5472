//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use partio_git::GitRepo;
use partio_store::CheckpointStore;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::Settings;

/// `.partio` under the repository root
pub fn partio_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(".partio")
}

/// Open the git repository containing the current directory
pub fn open_repo() -> Result<GitRepo> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    GitRepo::discover(&cwd).context("Not a git repository (or any parent directory)")
}

/// Repository root for the current directory, if there is one
pub fn discover_root() -> Option<PathBuf> {
    use partio_core::VersionControl;
    open_repo().ok().map(|repo| repo.root().to_path_buf())
}

/// Checkpoint store over `repo` using the configured ref policy
pub fn store<'a>(repo: &'a GitRepo, settings: &Settings) -> CheckpointStore<&'a GitRepo> {
    CheckpointStore::new(repo).with_policy(settings.ref_policy())
}

/// Bail with a hint when the checkpoint branch has not been created
pub fn require_branch(store: &CheckpointStore<&GitRepo>) -> Result<()> {
    if !store.exists()? {
        anyhow::bail!(
            "No checkpoint branch found ({}). Run 'partio enable' first.",
            store.branch()
        );
    }
    Ok(())
}

/// Format an RFC-3339 timestamp in local time ("2024-01-03 14:30:00")
pub fn format_timestamp(rfc3339: &str) -> String {
    match DateTime::parse_from_rfc3339(rfc3339) {
        Ok(ts) => ts
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => rfc3339.to_string(),
    }
}

/// Leading 12 characters of a commit hash
pub fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// Ask a yes/no question on stdin; anything but `y`/`yes` is no
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Drive `future` on a fresh multi-threaded runtime
///
/// The runtime is shut down without waiting for blocking tasks that are
/// still running, so a timed-out checkpoint write cannot keep a hook alive.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_block_on_does_not_wait_for_stuck_blocking_work() -> Result<()> {
        let start = Instant::now();
        let timed_out = block_on(async {
            let task = tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(5)));
            tokio::time::timeout(Duration::from_millis(50), task)
                .await
                .is_err()
        })?;
        assert!(timed_out);
        assert!(start.elapsed() < Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn test_format_timestamp_passthrough_on_garbage() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp("2025-02-03T04:05:06Z").len(), 19);
    }
}
