//! Enable partio in the current repository

use crate::config::{self, Settings};
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use partio_core::VersionControl;
use std::fs;
use std::path::Path;

/// Lines partio keeps out of version control
const IGNORED: [&str; 2] = [".partio/settings.local.toml", ".partio/state/"];

pub async fn run(settings: &Settings) -> Result<()> {
    let repo = util::open_repo()?;
    let root = repo.root().to_path_buf();
    let partio_dir = util::partio_dir(&root);

    fs::create_dir_all(&partio_dir)
        .with_context(|| format!("Failed to create {}", partio_dir.display()))?;

    let settings_path = partio_dir.join(config::SETTINGS_FILE);
    if !settings_path.exists() {
        fs::write(&settings_path, config::default_settings_toml())
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        println!("{} Created {}", "✓".green(), ".partio/settings.toml".cyan());
    }

    if update_gitignore(&root)? {
        println!("{} Updated {}", "✓".green(), ".gitignore".cyan());
    }

    partio_git::install_hooks(&repo).context("Failed to install git hooks")?;
    println!("{} Installed git hooks", "✓".green());

    let store = util::store(&repo, settings);
    let existed = store.exists()?;
    store
        .initialize()
        .context("Failed to create checkpoint branch")?;
    if !existed {
        println!("{} Created branch {}", "✓".green(), store.branch().cyan());
    }

    println!();
    println!("{}", "partio is enabled.".green().bold());
    println!(
        "{}",
        "Commits made during an agent session will now be checkpointed.".dimmed()
    );
    Ok(())
}

/// Append any missing partio entries; returns whether the file changed
fn update_gitignore(root: &Path) -> Result<bool> {
    let path = root.join(".gitignore");
    let mut content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err).context("Failed to read .gitignore"),
    };

    let missing: Vec<&str> = IGNORED
        .into_iter()
        .filter(|entry| !content.lines().any(|line| line.trim() == *entry))
        .collect();
    if missing.is_empty() {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    for entry in missing {
        content.push_str(entry);
        content.push('\n');
    }
    fs::write(&path, content).context("Failed to write .gitignore")?;
    Ok(true)
}
