use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;
use url::Url;

use super::Track;
use crate::error::PlaybackError;

/// YouTube watch and short links, the only sources the bot resolves out of the box.
pub const DEFAULT_SOURCE_PATTERNS: &[&str] = &[
    r"^https?://(www\.|m\.|music\.)?youtube\.com/watch\?(.*&)?v=[\w-]{11}",
    r"^https?://youtu\.be/[\w-]{11}",
];

/// Allow-list of URL shapes a track may come from.
#[derive(Debug, Clone)]
pub struct SourcePatterns {
    patterns: Vec<Regex>,
}

impl SourcePatterns {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).with_context(|| format!("invalid source pattern `{p}`"))
            })
            .collect::<Result<Vec<_>>>()?;

        if patterns.is_empty() {
            anyhow::bail!("at least one source pattern is required");
        }

        Ok(Self { patterns })
    }

    /// Checks whether `url` is a well-formed http(s) URL matching one of the patterns.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }

        self.patterns.iter().any(|p| p.is_match(url))
    }

    /// Builds a [`Track`], rejecting URLs outside the allow-list.
    pub fn track(&self, url: &str, title: Option<String>) -> Result<Track, PlaybackError> {
        let url = url.trim();
        if !self.is_allowed(url) {
            debug!("🚫 Rejected source: {}", url);
            return Err(PlaybackError::InvalidTrack {
                url: url.to_string(),
            });
        }

        Ok(Track::new(url.to_string(), title))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for SourcePatterns {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_SOURCE_PATTERNS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }
}
