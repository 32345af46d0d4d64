use std::time::Duration;
use thiserror::Error;

/// Errors returned to the caller of a playback command.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("`{url}` is not a playable source")]
    InvalidTrack { url: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("the queue is empty")]
    EmptyQueue,

    #[error("playback engine refused the request: {0}")]
    Engine(#[source] anyhow::Error),
}

/// Failures reaching or holding the voice transport.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("no voice channel to join")]
    NoChannel,

    #[error("voice handshake did not complete within {0:?}")]
    Timeout(Duration),

    #[error("session is not connected")]
    NotConnected,

    #[error("voice transport unreachable: {0}")]
    Transport(String),

    #[error("session has been closed")]
    Closed,
}
