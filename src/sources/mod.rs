//! Tracks and the allow-list of sources they may come from.
//!
//! Resolving a URL into an audio stream is left to the voice engine; this
//! module only decides whether a URL is acceptable.

mod patterns;
mod track;

pub use patterns::{SourcePatterns, DEFAULT_SOURCE_PATTERNS};
pub use track::Track;
