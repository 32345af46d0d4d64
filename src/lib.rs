//! # Guild Jukebox
//!
//! A Discord music bot built around per-guild playback sessions.
//!
//! - [`audio`]: sessions, queue, playback state machine, inactivity timer
//! - [`sources`]: tracks and source validation
//! - [`bot`]: serenity event handler, prefix commands, songbird voice adapter
//! - [`ui`]: reply embeds
//! - [`config`]: environment configuration

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod ui;

pub use error::{ConnectionError, PlaybackError};
