//! Show partio status for the current repository

use crate::config::Settings;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use partio_core::VersionControl;
use partio_git::HookState;

pub async fn run(settings: &Settings) -> Result<()> {
    let repo = util::open_repo()?;
    let root = repo.root();

    println!("{}", "partio Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Repository:    {}", root.display().to_string().cyan());
    let branch = repo.current_branch()?.unwrap_or_else(|| "(detached)".to_string());
    println!("Branch:        {branch}");
    println!();

    let initialized = util::partio_dir(root).is_dir();
    print!("Enabled:       ");
    if initialized && settings.enabled {
        println!("{}", "yes".green());
    } else if initialized {
        println!("{}", "no (disabled in settings)".yellow());
    } else {
        println!("{}", "no".yellow());
        println!("  {}", "Tip: Enable with 'partio enable'".dimmed());
    }
    println!("Strategy:      {}", settings.strategy);
    println!("Agent:         {}", settings.agent);
    println!();

    println!("Hooks:");
    for (name, state) in partio_git::hook_status(&repo) {
        let label = match state {
            HookState::Installed => "installed".green().to_string(),
            HookState::Foreign => "other hook".yellow().to_string(),
            HookState::Missing => "missing".red().to_string(),
        };
        println!("  {name:<12} {label}");
    }
    println!();

    let store = util::store(&repo, settings);
    println!("Checkpoints:");
    if store.exists()? {
        println!("  Branch:      {}", store.branch().cyan());
        println!("  Count:       {}", store.count()?);
    } else {
        println!("  {}", "No checkpoint branch".dimmed());
    }

    Ok(())
}
