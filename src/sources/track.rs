use std::fmt;

/// A queued playable item.
///
/// Tracks are immutable once built; a [`Track`] only exists for URLs that
/// passed [`SourcePatterns`](super::SourcePatterns) validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    url: String,
    title: Option<String>,
}

impl Track {
    pub(crate) fn new(url: String, title: Option<String>) -> Self {
        Self {
            url,
            title: title.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Title when known, URL otherwise.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
