use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::TimeDelta;
use codeit_provider::ProviderConfig;
use serde::{Deserialize, Serialize};

use crate::evictor::{EvictionPolicy, DEFAULT_EVICTION_INTERVAL, DEFAULT_INACTIVITY_THRESHOLD};

pub const DEFAULT_PREFIX: &str = "!ci";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeitConfig {
    pub app: AppConfig,
    pub discord: DiscordConfig,
    pub provider: ProviderConfig,
    pub commands: CommandsConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "codeit".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub prefix: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub eviction_interval_secs: u64,
    pub inactivity_threshold_secs: u64,
    /// Keep at most this many exchanges per guild; `None` keeps everything.
    pub history_turn_limit: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            eviction_interval_secs: DEFAULT_EVICTION_INTERVAL.as_secs(),
            inactivity_threshold_secs: DEFAULT_INACTIVITY_THRESHOLD.as_secs(),
            history_turn_limit: None,
        }
    }
}

impl SessionConfig {
    pub fn eviction_policy(&self) -> Result<EvictionPolicy> {
        let secs = i64::try_from(self.inactivity_threshold_secs)
            .context("inactivity_threshold_secs out of range")?;
        let threshold = TimeDelta::try_seconds(secs)
            .ok_or_else(|| anyhow!("inactivity_threshold_secs out of range: {secs}"))?;
        Ok(EvictionPolicy {
            interval: Duration::from_secs(self.eviction_interval_secs),
            threshold,
        })
    }
}

impl CodeitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.commands.prefix.trim().is_empty() {
            return Err(anyhow!("commands.prefix must not be empty"));
        }
        if self.commands.prefix.split_whitespace().count() > 1 {
            return Err(anyhow!(
                "commands.prefix must be a single word: {:?}",
                self.commands.prefix
            ));
        }
        if self.session.eviction_interval_secs == 0 {
            return Err(anyhow!("session.eviction_interval_secs must be positive"));
        }
        if self.session.inactivity_threshold_secs == 0 {
            return Err(anyhow!("session.inactivity_threshold_secs must be positive"));
        }
        if self.session.history_turn_limit == Some(0) {
            return Err(anyhow!("session.history_turn_limit must be positive when set"));
        }
        if self.discord.enabled && self.discord.token.trim().is_empty() {
            return Err(anyhow!("discord is enabled but discord.token is empty"));
        }
        self.session.eviction_policy()?;

        if self.session.inactivity_threshold_secs >= self.session.eviction_interval_secs {
            tracing::warn!(
                "inactivity threshold ({}s) is not below the eviction interval ({}s); idle sessions may survive an extra cycle",
                self.session.inactivity_threshold_secs,
                self.session.eviction_interval_secs
            );
        }
        Ok(())
    }
}

/// Replaces every `${NAME}` with the environment value (empty when unset).
pub fn resolve_env_var(raw: &str) -> String {
    let mut resolved = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find("${") {
        resolved.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find('}') {
            Some(close) => {
                resolved.push_str(&std::env::var(&after[..close]).unwrap_or_default());
                rest = &after[close + 1..];
            }
            None => {
                resolved.push_str(&rest[open..]);
                return resolved;
            }
        }
    }

    resolved.push_str(rest);
    resolved
}

fn resolve_config_env(config: &mut CodeitConfig) {
    config.app.name = resolve_env_var(&config.app.name);
    config.discord.token = resolve_env_var(&config.discord.token);
    config.commands.prefix = resolve_env_var(&config.commands.prefix);
    config.provider.model = resolve_env_var(&config.provider.model);
    if let Some(key) = &mut config.provider.api_key {
        *key = resolve_env_var(key);
    }
    if let Some(url) = &mut config.provider.base_url {
        *url = resolve_env_var(url);
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join("config").join("main.yaml")
}

pub fn load_config(root: &Path) -> Result<CodeitConfig> {
    let path = config_path(root);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let mut config: CodeitConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))?;

    resolve_config_env(&mut config);
    config
        .validate()
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(config)
}
