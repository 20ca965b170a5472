//! Configuration display command

use crate::config::{LoadedSettings, SettingsPaths};
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

/// List all resolved configuration values
pub async fn run_list(loaded: &LoadedSettings) -> Result<()> {
    println!("{}", "Resolved Configuration".bold());
    if loaded.sources.is_empty() {
        println!("{}\n", "Sources: defaults only".dimmed());
    } else {
        for source in &loaded.sources {
            println!("{}: {}", "Source".dimmed(), source.display().dimmed());
        }
        println!();
    }

    for (key, value) in loaded.settings.entries() {
        println!("  {} = {}", key.cyan(), value);
    }
    Ok(())
}

/// Print a single configuration value
pub async fn run_get(loaded: &LoadedSettings, key: &str) -> Result<()> {
    match loaded.settings.get(key) {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => anyhow::bail!(
            "Unknown config key: {}. Use 'partio config list' to see available keys.",
            key
        ),
    }
}

/// Show where each settings file is read from
pub async fn run_path() -> Result<()> {
    let paths = SettingsPaths::resolve(util::discover_root().as_deref());
    let show = |label: &str, path: Option<&std::path::PathBuf>, absent: &str| match path {
        Some(path) if path.exists() => println!("{label:<8} {}", path.display()),
        Some(path) => println!("{label:<8} {} {}", path.display(), "(missing)".dimmed()),
        None => println!("{label:<8} {}", absent.dimmed()),
    };

    show("global", paths.global.as_ref(), "(home directory unknown)");
    show("repo", paths.repo.as_ref(), "(not in a repository)");
    show("local", paths.local.as_ref(), "(not in a repository)");
    Ok(())
}
