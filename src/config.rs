use anyhow::Result;
use std::{sync::Arc, time::Duration};

use crate::{
    audio::PlayerSettings,
    sources::{SourcePatterns, DEFAULT_SOURCE_PATTERNS},
};

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Sessions (milliseconds)
    pub idle_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub play_ready_timeout_ms: u64,

    // Sources
    pub allowed_source_patterns: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN")?,
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or(defaults.command_prefix),

            idle_timeout_ms: env_or("IDLE_TIMEOUT_MS", defaults.idle_timeout_ms)?,
            connect_timeout_ms: env_or("CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms)?,
            play_ready_timeout_ms: env_or("PLAY_READY_TIMEOUT_MS", defaults.play_ready_timeout_ms)?,

            allowed_source_patterns: match std::env::var("ALLOWED_SOURCE_PATTERNS") {
                Ok(val) if !val.trim().is_empty() => val
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect(),
                _ => defaults.allowed_source_patterns,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Every timeout must be greater than zero
    /// - The command prefix must not be blank
    /// - Every source pattern must compile, and at least one must be given
    pub fn validate(&self) -> Result<()> {
        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("Command prefix must not be empty");
        }

        for (name, value) in [
            ("Idle timeout", self.idle_timeout_ms),
            ("Connect timeout", self.connect_timeout_ms),
            ("Play ready timeout", self.play_ready_timeout_ms),
        ] {
            if value == 0 {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        SourcePatterns::new(&self.allowed_source_patterns)?;

        Ok(())
    }

    /// Session settings derived from this configuration.
    pub fn player_settings(&self) -> Result<PlayerSettings> {
        Ok(PlayerSettings {
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            play_ready_timeout: Duration::from_millis(self.play_ready_timeout_ms),
            sources: Arc::new(SourcePatterns::new(&self.allowed_source_patterns)?),
        })
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Commands: prefix `{}`\n  \
            Timeouts: idle {}, connect {}, play ready {}\n  \
            Sources: {} allowed patterns",
            self.command_prefix,
            humantime::format_duration(Duration::from_millis(self.idle_timeout_ms)),
            humantime::format_duration(Duration::from_millis(self.connect_timeout_ms)),
            humantime::format_duration(Duration::from_millis(self.play_ready_timeout_ms)),
            self.allowed_source_patterns.len(),
        )
    }
}

fn env_or(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a number of milliseconds: {}", key, e)),
        _ => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no token default - must be provided)
            discord_token: String::new(),
            command_prefix: "!".to_string(),

            idle_timeout_ms: 30_000,
            connect_timeout_ms: 30_000,
            play_ready_timeout_ms: 5_000,

            allowed_source_patterns: DEFAULT_SOURCE_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}
