//! Layered settings
//!
//! Precedence, lowest first:
//! 1. Built-in defaults
//! 2. Global `~/.config/partio/settings.toml`
//! 3. Repository `.partio/settings.toml`
//! 4. Repository `.partio/settings.local.toml`
//! 5. `PARTIO_*` environment variables
//! 6. The `--log-level` flag
//!
//! Each layer only overrides the fields it sets. Files that are missing are
//! skipped; files that cannot be read or parsed are skipped with a warning.

use partio_store::RefUpdatePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.toml";
pub const LOCAL_SETTINGS_FILE: &str = "settings.local.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// How the checkpoint branch reference is advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefUpdateMode {
    Cas,
    Unconditional,
}

impl RefUpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefUpdateMode::Cas => "cas",
            RefUpdateMode::Unconditional => "unconditional",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyOptions {
    pub push_sessions: bool,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub enabled: bool,
    pub strategy: String,
    pub agent: String,
    pub log_level: String,
    pub strategy_options: StrategyOptions,
    pub hook_timeout_secs: u64,
    pub ref_update: RefUpdateMode,
    pub cas_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: "manual-commit".to_string(),
            agent: partio_agent::AGENT_NAME.to_string(),
            log_level: "info".to_string(),
            strategy_options: StrategyOptions {
                push_sessions: true,
            },
            hook_timeout_secs: 30,
            ref_update: RefUpdateMode::Cas,
            cas_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyOptionsLayer {
    pub push_sessions: Option<bool>,
}

/// One source of settings; absent fields leave lower layers alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsLayer {
    pub enabled: Option<bool>,
    pub strategy: Option<String>,
    pub agent: Option<String>,
    pub log_level: Option<String>,
    pub strategy_options: Option<StrategyOptionsLayer>,
    pub hook_timeout_secs: Option<u64>,
    pub ref_update: Option<RefUpdateMode>,
    pub cas_retries: Option<u32>,
}

impl Settings {
    /// Overwrite the fields `layer` sets
    pub fn apply(mut self, layer: SettingsLayer) -> Self {
        if let Some(enabled) = layer.enabled {
            self.enabled = enabled;
        }
        if let Some(strategy) = layer.strategy {
            self.strategy = strategy;
        }
        if let Some(agent) = layer.agent {
            self.agent = agent;
        }
        if let Some(level) = layer.log_level {
            self.log_level = level;
        }
        if let Some(push) = layer.strategy_options.and_then(|o| o.push_sessions) {
            self.strategy_options.push_sessions = push;
        }
        if let Some(secs) = layer.hook_timeout_secs {
            self.hook_timeout_secs = secs;
        }
        if let Some(mode) = layer.ref_update {
            self.ref_update = mode;
        }
        if let Some(retries) = layer.cas_retries {
            self.cas_retries = retries;
        }
        self
    }

    /// Store policy selected by `ref_update` and `cas_retries`
    pub fn ref_policy(&self) -> RefUpdatePolicy {
        match self.ref_update {
            RefUpdateMode::Cas => RefUpdatePolicy::CompareAndSwap {
                max_retries: self.cas_retries,
            },
            RefUpdateMode::Unconditional => RefUpdatePolicy::Unconditional,
        }
    }

    /// Configured level if it is a known one, else `info`
    pub fn effective_log_level(&self) -> &str {
        let level = self.log_level.as_str();
        if LOG_LEVELS.contains(&level) {
            level
        } else {
            "info"
        }
    }

    /// Every key with its resolved value, in display order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("enabled", self.enabled.to_string()),
            ("strategy", self.strategy.clone()),
            ("agent", self.agent.clone()),
            ("log_level", self.log_level.clone()),
            (
                "strategy_options.push_sessions",
                self.strategy_options.push_sessions.to_string(),
            ),
            ("hook_timeout_secs", self.hook_timeout_secs.to_string()),
            ("ref_update", self.ref_update.as_str().to_string()),
            ("cas_retries", self.cas_retries.to_string()),
        ]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }
}

/// Settings plus the problems met while loading them
#[derive(Debug, Clone, Default)]
pub struct LoadedSettings {
    pub settings: Settings,
    /// Files that contributed a layer
    pub sources: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Where each settings file lives
#[derive(Debug, Clone, Default)]
pub struct SettingsPaths {
    pub global: Option<PathBuf>,
    pub repo: Option<PathBuf>,
    pub local: Option<PathBuf>,
}

impl SettingsPaths {
    pub fn resolve(repo_root: Option<&Path>) -> Self {
        let partio_dir = repo_root.map(crate::util::partio_dir);
        Self {
            global: global_settings_path(),
            repo: partio_dir.as_ref().map(|dir| dir.join(SETTINGS_FILE)),
            local: partio_dir.as_ref().map(|dir| dir.join(LOCAL_SETTINGS_FILE)),
        }
    }

    fn in_order(&self) -> impl Iterator<Item = &PathBuf> {
        [&self.global, &self.repo, &self.local].into_iter().flatten()
    }
}

/// `~/.config/partio/settings.toml`
pub fn global_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("partio").join(SETTINGS_FILE))
}

/// Resolve settings from files, the process environment and the flag
pub fn load(repo_root: Option<&Path>, log_level_flag: Option<&str>) -> LoadedSettings {
    load_from(
        &SettingsPaths::resolve(repo_root),
        |name| std::env::var(name).ok(),
        log_level_flag,
    )
}

pub fn load_from<F>(paths: &SettingsPaths, env: F, log_level_flag: Option<&str>) -> LoadedSettings
where
    F: Fn(&str) -> Option<String>,
{
    let mut loaded = LoadedSettings::default();

    for path in paths.in_order() {
        match read_layer(path) {
            Ok(Some(layer)) => {
                loaded.settings = std::mem::take(&mut loaded.settings).apply(layer);
                loaded.sources.push(path.clone());
            }
            Ok(None) => {}
            Err(warning) => loaded.warnings.push(warning),
        }
    }

    let layer = env_layer(&env, &mut loaded.warnings);
    loaded.settings = std::mem::take(&mut loaded.settings).apply(layer);

    if let Some(level) = log_level_flag {
        loaded.settings.log_level = level.to_string();
    }
    if !LOG_LEVELS.contains(&loaded.settings.log_level.as_str()) {
        loaded.warnings.push(format!(
            "unknown log level `{}`, using info",
            loaded.settings.log_level
        ));
    }
    loaded
}

fn read_layer(path: &Path) -> Result<Option<SettingsLayer>, String> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(format!("skipping {}: {err}", path.display())),
    };
    toml::from_str(&text)
        .map(Some)
        .map_err(|err| format!("skipping {}: {err}", path.display()))
}

fn env_layer<F>(env: &F, warnings: &mut Vec<String>) -> SettingsLayer
where
    F: Fn(&str) -> Option<String>,
{
    let mut layer = SettingsLayer::default();
    if let Some(raw) = env("PARTIO_ENABLED") {
        match parse_bool(&raw) {
            Some(enabled) => layer.enabled = Some(enabled),
            None => warnings.push(format!("ignoring PARTIO_ENABLED={raw}: expected true or false")),
        }
    }
    layer.strategy = env("PARTIO_STRATEGY").filter(|v| !v.is_empty());
    layer.agent = env("PARTIO_AGENT").filter(|v| !v.is_empty());
    layer.log_level = env("PARTIO_LOG_LEVEL").filter(|v| !v.is_empty());
    layer
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Contents written to `.partio/settings.toml` by `partio enable`
pub fn default_settings_toml() -> String {
    let settings = Settings::default();
    format!(
        r#"# partio settings for this repository
# Personal overrides belong in .partio/{LOCAL_SETTINGS_FILE} (not committed).

enabled = {}
strategy = "{}"
agent = "{}"
log_level = "{}"

[strategy_options]
push_sessions = {}
"#,
        settings.enabled,
        settings.strategy,
        settings.agent,
        settings.log_level,
        settings.strategy_options.push_sessions,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn paths(dir: &Path) -> SettingsPaths {
        SettingsPaths {
            global: Some(dir.join("global.toml")),
            repo: Some(dir.join("repo.toml")),
            local: Some(dir.join("local.toml")),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_when_nothing_present() -> Result<()> {
        let dir = TempDir::new()?;
        let loaded = load_from(&paths(dir.path()), no_env, None);
        assert_eq!(loaded.settings, Settings::default());
        assert!(loaded.sources.is_empty());
        assert!(loaded.warnings.is_empty());
        assert_eq!(
            loaded.settings.ref_policy(),
            RefUpdatePolicy::CompareAndSwap { max_retries: 3 }
        );
        Ok(())
    }

    #[test]
    fn test_layers_override_in_order() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join("global.toml"),
            "agent = \"global-agent\"\nlog_level = \"debug\"\nhook_timeout_secs = 5\n",
        )?;
        fs::write(
            dir.path().join("repo.toml"),
            "agent = \"repo-agent\"\n[strategy_options]\npush_sessions = false\n",
        )?;
        fs::write(
            dir.path().join("local.toml"),
            "ref_update = \"unconditional\"\n",
        )?;

        let env: HashMap<&str, &str> = [("PARTIO_LOG_LEVEL", "warn")].into();
        let loaded = load_from(&paths(dir.path()), |k| env.get(k).map(|v| v.to_string()), None);
        let settings = &loaded.settings;

        assert_eq!(settings.agent, "repo-agent");
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.hook_timeout_secs, 5);
        assert!(!settings.strategy_options.push_sessions);
        assert_eq!(settings.ref_policy(), RefUpdatePolicy::Unconditional);
        assert!(settings.enabled);
        assert_eq!(loaded.sources.len(), 3);
        Ok(())
    }

    #[test]
    fn test_flag_beats_environment() -> Result<()> {
        let dir = TempDir::new()?;
        let loaded = load_from(
            &paths(dir.path()),
            |k| (k == "PARTIO_LOG_LEVEL").then(|| "error".to_string()),
            Some("trace"),
        );
        assert_eq!(loaded.settings.log_level, "trace");
        Ok(())
    }

    #[test]
    fn test_bad_file_is_skipped_with_warning() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("global.toml"), "enabled = false\n")?;
        fs::write(dir.path().join("repo.toml"), "enabled = [not toml")?;

        let loaded = load_from(&paths(dir.path()), no_env, None);
        assert!(!loaded.settings.enabled);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("repo.toml"));
        Ok(())
    }

    #[test]
    fn test_env_enabled_parsing() -> Result<()> {
        let dir = TempDir::new()?;
        let off = load_from(
            &paths(dir.path()),
            |k| (k == "PARTIO_ENABLED").then(|| "0".to_string()),
            None,
        );
        assert!(!off.settings.enabled);

        let junk = load_from(
            &paths(dir.path()),
            |k| (k == "PARTIO_ENABLED").then(|| "maybe".to_string()),
            None,
        );
        assert!(junk.settings.enabled);
        assert_eq!(junk.warnings.len(), 1);
        Ok(())
    }

    #[test]
    fn test_unknown_log_level_falls_back() -> Result<()> {
        let dir = TempDir::new()?;
        let loaded = load_from(&paths(dir.path()), no_env, Some("loud"));
        assert_eq!(loaded.settings.effective_log_level(), "info");
        assert_eq!(loaded.warnings.len(), 1);
        Ok(())
    }

    #[test]
    fn test_default_file_parses_to_defaults() -> Result<()> {
        let layer: SettingsLayer = toml::from_str(&default_settings_toml())?;
        assert_eq!(Settings::default().apply(layer), Settings::default());
        Ok(())
    }

    #[test]
    fn test_get_keys() {
        let settings = Settings::default();
        assert_eq!(settings.get("strategy").as_deref(), Some("manual-commit"));
        assert_eq!(
            settings.get("strategy_options.push_sessions").as_deref(),
            Some("true")
        );
        assert_eq!(settings.get("nope"), None);
    }
}
