//! Git hook installation
//!
//! Each partio hook is a small shell shim that calls `partio _hook <name>`
//! and then chains to whatever hook was installed before partio, kept as
//! `<name>.partio-backup`. Hooks live in the common git directory so all
//! worktrees share them.

use crate::error::GitError;
use crate::repo::GitRepo;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hooks partio installs
pub const HOOK_NAMES: [&str; 3] = ["pre-commit", "post-commit", "pre-push"];

/// Line identifying a hook script as ours
pub const PARTIO_MARKER: &str = "# Installed by partio";

const BACKUP_SUFFIX: &str = ".partio-backup";

/// State of one hook slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    /// The partio shim is installed
    Installed,
    /// Some other hook occupies the slot
    Foreign,
    Missing,
}

/// Shell shim for `name`
pub fn hook_script(name: &str) -> String {
    format!(
        r#"#!/bin/sh
{PARTIO_MARKER}
if command -v partio >/dev/null 2>&1; then
    partio _hook {name} "$@"
    exit_code=$?
    [ $exit_code -ne 0 ] && exit $exit_code
fi
hooks_dir="$(git rev-parse --git-common-dir)/hooks"
[ -x "$hooks_dir/{name}{BACKUP_SUFFIX}" ] && exec "$hooks_dir/{name}{BACKUP_SUFFIX}" "$@"
exit 0
"#
    )
}

fn is_partio_hook(content: &str) -> bool {
    content.contains(PARTIO_MARKER)
}

fn backup_path(hook: &Path) -> PathBuf {
    let mut name = hook.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Install the partio hooks, backing up foreign hooks
pub fn install_hooks(repo: &GitRepo) -> Result<(), GitError> {
    let hooks_dir = repo.hooks_dir();
    fs::create_dir_all(&hooks_dir).map_err(GitError::io("creating", &hooks_dir))?;

    for name in HOOK_NAMES {
        let hook = hooks_dir.join(name);
        if let Ok(content) = fs::read_to_string(&hook) {
            if !is_partio_hook(&content) {
                let backup = backup_path(&hook);
                fs::rename(&hook, &backup).map_err(GitError::io("backing up", &hook))?;
                debug!(hook = name, backup = %backup.display(), "backed up existing hook");
            }
        }

        fs::write(&hook, hook_script(name)).map_err(GitError::io("writing", &hook))?;
        make_executable(&hook)?;
    }
    Ok(())
}

/// Remove the partio hooks and restore any backups
pub fn uninstall_hooks(repo: &GitRepo) -> Result<(), GitError> {
    let hooks_dir = repo.hooks_dir();
    for name in HOOK_NAMES {
        let hook = hooks_dir.join(name);
        if let Ok(content) = fs::read_to_string(&hook) {
            if is_partio_hook(&content) {
                fs::remove_file(&hook).map_err(GitError::io("removing", &hook))?;
            }
        }

        let backup = backup_path(&hook);
        if backup.exists() && !hook.exists() {
            fs::rename(&backup, &hook).map_err(GitError::io("restoring", &backup))?;
            debug!(hook = name, "restored original hook");
        }
    }
    Ok(())
}

/// State of each partio hook slot
pub fn hook_status(repo: &GitRepo) -> Vec<(&'static str, HookState)> {
    let hooks_dir = repo.hooks_dir();
    HOOK_NAMES
        .iter()
        .map(|&name| {
            let state = match fs::read_to_string(hooks_dir.join(name)) {
                Ok(content) if is_partio_hook(&content) => HookState::Installed,
                Ok(_) => HookState::Foreign,
                Err(_) => HookState::Missing,
            };
            (name, state)
        })
        .collect()
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), GitError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(GitError::io("setting permissions on", path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), GitError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use git2::Repository;
    use tempfile::TempDir;

    fn setup() -> Result<(TempDir, GitRepo)> {
        let dir = TempDir::new()?;
        let repo = Repository::init(dir.path())?;
        Ok((dir, GitRepo::from_repository(repo)))
    }

    #[test]
    fn test_install_and_uninstall() -> Result<()> {
        let (_dir, repo) = setup()?;
        install_hooks(&repo)?;

        for name in HOOK_NAMES {
            let path = repo.hooks_dir().join(name);
            let content = fs::read_to_string(&path)?;
            assert!(is_partio_hook(&content), "{name} missing marker");
            assert!(content.contains(&format!("partio _hook {name} \"$@\"")));

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                assert_ne!(fs::metadata(&path)?.permissions().mode() & 0o111, 0);
            }
        }
        assert!(hook_status(&repo)
            .iter()
            .all(|(_, state)| *state == HookState::Installed));

        uninstall_hooks(&repo)?;
        for name in HOOK_NAMES {
            assert!(!repo.hooks_dir().join(name).exists(), "{name} not removed");
        }
        Ok(())
    }

    #[test]
    fn test_existing_hook_backed_up_and_restored() -> Result<()> {
        let (_dir, repo) = setup()?;
        let hooks_dir = repo.hooks_dir();
        fs::create_dir_all(&hooks_dir)?;
        let existing = "#!/bin/sh\necho 'existing hook'\n";
        fs::write(hooks_dir.join("pre-commit"), existing)?;

        let status = hook_status(&repo);
        assert_eq!(status[0], ("pre-commit", HookState::Foreign));
        assert_eq!(status[1], ("post-commit", HookState::Missing));

        install_hooks(&repo)?;
        assert_eq!(
            fs::read_to_string(hooks_dir.join("pre-commit.partio-backup"))?,
            existing
        );

        // Reinstalling must not clobber the backup with our own shim.
        install_hooks(&repo)?;
        assert_eq!(
            fs::read_to_string(hooks_dir.join("pre-commit.partio-backup"))?,
            existing
        );

        uninstall_hooks(&repo)?;
        assert_eq!(fs::read_to_string(hooks_dir.join("pre-commit"))?, existing);
        assert!(!hooks_dir.join("pre-commit.partio-backup").exists());
        Ok(())
    }

    #[test]
    fn test_script_chains_to_backup() {
        let script = hook_script("post-commit");
        assert!(script.starts_with("#!/bin/sh\n# Installed by partio\n"));
        assert!(script.contains("post-commit.partio-backup"));
        assert!(script.contains("git rev-parse --git-common-dir"));
    }
}
