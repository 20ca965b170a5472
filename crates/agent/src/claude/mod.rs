//! Claude Code detector
//!
//! Claude Code keeps one directory of JSONL transcripts per project under
//! `~/.claude/projects`, named after the project path with every `/`
//! replaced by `-`, and plan documents under `~/.claude/plans`.

mod transcript;

pub use transcript::{parse_jsonl, parse_transcript};

use crate::detector::Detector;
use crate::error::{AgentError, Result};
use crate::session::SessionData;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;
use tracing::debug;

/// Agent name recorded on checkpoints
pub const AGENT_NAME: &str = "claude-code";

#[derive(Debug, Clone)]
pub struct ClaudeDetector {
    home: PathBuf,
}

impl ClaudeDetector {
    /// Detector rooted at the current user's home directory
    pub fn new() -> Result<Self> {
        dirs::home_dir()
            .map(Self::with_home)
            .ok_or(AgentError::NoHomeDir)
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.home.join(".claude").join("projects")
    }

    pub fn plans_dir(&self) -> PathBuf {
        self.home.join(".claude").join("plans")
    }

    /// Contents of the plan named `slug`; empty when there is none
    pub fn read_plan(&self, slug: &str) -> Result<String> {
        if slug.is_empty() {
            return Ok(String::new());
        }
        let path = self.plans_dir().join(format!("{slug}.md"));
        match fs::read_to_string(&path) {
            Ok(plan) => Ok(plan),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(AgentError::io(&path)(err)),
        }
    }
}

/// Project directory name Claude Code derives from a path
pub fn sanitize_path(path: &Path) -> String {
    let path = path.to_string_lossy();
    let trimmed = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    trimmed.replace('/', "-")
}

/// Most recently modified `.jsonl` file directly inside `dir`
fn newest_transcript(dir: &Path) -> Result<Option<(PathBuf, SystemTime)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(AgentError::io(dir)(err)),
    };

    let mut newest: Option<(PathBuf, SystemTime)> = None;
    for entry in entries {
        let entry = entry.map_err(AgentError::io(dir))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
            continue;
        }
        let meta = entry.metadata().map_err(AgentError::io(&path))?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().map_err(AgentError::io(&path))?;
        if newest.as_ref().map_or(true, |(_, best)| modified > *best) {
            newest = Some((path, modified));
        }
    }
    Ok(newest)
}

impl Detector for ClaudeDetector {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn is_running(&self) -> Result<bool> {
        let output = Command::new("pgrep")
            .args(["-f", "claude"])
            .output()
            .map_err(AgentError::ProcessCheck)?;
        match output.status.code() {
            Some(0) => Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty()),
            Some(1) => Ok(false),
            _ => Err(AgentError::ProcessCheck(std::io::Error::other(format!(
                "pgrep exited with {}",
                output.status
            )))),
        }
    }

    /// The repository root's project directory, or its parent's
    ///
    /// When both exist the one holding the newest transcript wins.
    fn find_session_dir(&self, repo_root: &Path) -> Result<PathBuf> {
        let projects = self.projects_dir();
        let candidates: Vec<PathBuf> = std::iter::once(repo_root)
            .chain(repo_root.parent())
            .map(|path| projects.join(sanitize_path(path)))
            .filter(|dir| dir.is_dir())
            .collect();

        let mut best: Option<(&PathBuf, Option<SystemTime>)> = None;
        for dir in &candidates {
            let modified = newest_transcript(dir)?.map(|(_, modified)| modified);
            let better = match &best {
                None => true,
                Some((_, best_modified)) => modified > *best_modified,
            };
            if better {
                best = Some((dir, modified));
            }
        }

        match best {
            Some((dir, _)) => {
                debug!(dir = %dir.display(), "found session directory");
                Ok(dir.clone())
            }
            None => Err(AgentError::SessionDirMissing(repo_root.to_path_buf())),
        }
    }

    fn find_latest_session(&self, repo_root: &Path) -> Result<(PathBuf, SessionData)> {
        let dir = self.find_session_dir(repo_root)?;
        let (path, _) = newest_transcript(&dir)?.ok_or(AgentError::NoTranscripts(dir))?;
        let data = parse_jsonl(&path)?;
        debug!(
            path = %path.display(),
            session = %data.session_id,
            messages = data.transcript.len(),
            "parsed latest session"
        );
        Ok((path, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    fn write_session(dir: &Path, name: &str, session_id: &str, mtime: i64) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(name);
        let line = format!(
            r#"{{"type":"user","sessionId":"{session_id}","message":{{"role":"user","content":"prompt for {session_id}"}}}}"#
        );
        fs::write(&path, line)?;
        set_file_mtime(&path, FileTime::from_unix_time(mtime, 0))?;
        Ok(path)
    }

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path(Path::new("/home/dev/src/app")),
            "-home-dev-src-app"
        );
        assert_eq!(sanitize_path(Path::new("/tmp/repo/")), "-tmp-repo");
    }

    #[test]
    fn test_latest_session_by_mtime() -> Result<()> {
        let home = TempDir::new()?;
        let detector = ClaudeDetector::with_home(home.path());
        let repo = Path::new("/work/app");
        let dir = detector.projects_dir().join("-work-app");

        write_session(&dir, "old.jsonl", "old", 1_700_000_000)?;
        let newest = write_session(&dir, "new.jsonl", "new", 1_700_000_500)?;
        fs::write(dir.join("notes.txt"), "ignored")?;

        let (path, data) = detector.find_latest_session(repo)?;
        assert_eq!(path, newest);
        assert_eq!(data.session_id, "new");
        assert_eq!(data.prompt, "prompt for new");
        Ok(())
    }

    #[test]
    fn test_parent_dir_with_newer_session_wins() -> Result<()> {
        let home = TempDir::new()?;
        let detector = ClaudeDetector::with_home(home.path());
        let repo = Path::new("/work/app");
        let own = detector.projects_dir().join("-work-app");
        let parent = detector.projects_dir().join("-work");

        write_session(&own, "a.jsonl", "own", 1_700_000_000)?;
        write_session(&parent, "b.jsonl", "parent", 1_700_000_900)?;
        assert_eq!(detector.find_session_dir(repo)?, parent);

        write_session(&own, "c.jsonl", "own-newer", 1_700_001_000)?;
        assert_eq!(detector.find_session_dir(repo)?, own);
        Ok(())
    }

    #[test]
    fn test_empty_dirs_prefer_repo_root() -> Result<()> {
        let home = TempDir::new()?;
        let detector = ClaudeDetector::with_home(home.path());
        let own = detector.projects_dir().join("-work-app");
        fs::create_dir_all(&own)?;
        fs::create_dir_all(detector.projects_dir().join("-work"))?;

        assert_eq!(detector.find_session_dir(Path::new("/work/app"))?, own);
        assert!(matches!(
            detector.find_latest_session(Path::new("/work/app")),
            Err(AgentError::NoTranscripts(_))
        ));
        Ok(())
    }

    #[test]
    fn test_missing_session_dir() -> Result<()> {
        let home = TempDir::new()?;
        let detector = ClaudeDetector::with_home(home.path());
        assert!(matches!(
            detector.find_session_dir(Path::new("/nowhere/repo")),
            Err(AgentError::SessionDirMissing(_))
        ));
        Ok(())
    }

    #[test]
    fn test_read_plan() -> Result<()> {
        let home = TempDir::new()?;
        let detector = ClaudeDetector::with_home(home.path());
        fs::create_dir_all(detector.plans_dir())?;
        fs::write(detector.plans_dir().join("tidy-plan.md"), "# Plan\n\n1. Do it\n")?;

        assert_eq!(detector.read_plan("tidy-plan")?, "# Plan\n\n1. Do it\n");
        assert_eq!(detector.read_plan("missing")?, "");
        assert_eq!(detector.read_plan("")?, "");
        Ok(())
    }
}
