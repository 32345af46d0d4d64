use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::PlaybackError,
    sources::{SourcePatterns, Track},
};

/// Ordered track list of one session plus the position of the current track.
///
/// The queue wraps: advancing past the last track returns to the first one,
/// so a played queue repeats until it is purged.
#[derive(Debug)]
pub struct QueueStore {
    tracks: Vec<Track>,
    current_index: usize,
    sources: Arc<SourcePatterns>,
}

impl QueueStore {
    pub fn new(sources: Arc<SourcePatterns>) -> Self {
        Self {
            tracks: Vec::new(),
            current_index: 0,
            sources,
        }
    }

    /// Appends a track after checking it against the source allow-list.
    ///
    /// Returns the position the track landed at. On failure the queue is left untouched.
    pub fn enqueue(&mut self, track: Track) -> Result<usize, PlaybackError> {
        if !self.sources.is_allowed(track.url()) {
            return Err(PlaybackError::InvalidTrack {
                url: track.url().to_string(),
            });
        }

        info!("➕ Queued: {}", track);
        self.tracks.push(track);
        Ok(self.tracks.len() - 1)
    }

    /// Empties the queue and rewinds to the start.
    pub fn purge(&mut self) {
        let removed = self.tracks.len();
        self.tracks.clear();
        self.current_index = 0;
        info!("🗑️ Queue purged ({} tracks)", removed);
    }

    /// Moves to the next track, wrapping to the first after the last.
    pub fn advance(&mut self) {
        if self.tracks.is_empty() {
            return;
        }

        self.current_index = (self.current_index + 1) % self.tracks.len();
        debug!("➡️ Queue position {}/{}", self.current_index + 1, self.tracks.len());
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
