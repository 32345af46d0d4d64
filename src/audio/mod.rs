//! # Audio Module
//!
//! Per-guild playback sessions for the jukebox.
//!
//! Every guild ("tenant") gets its own [`Session`]: a queue, a playback state
//! machine, an optional voice connection and an inactivity timer. Sessions
//! are independent; a busy guild never blocks another one.
//!
//! ## Architecture
//!
//! ### [`registry`] - Session Registry
//! - Atomic get-or-create keyed by tenant id
//! - Eviction when the bot leaves a guild
//!
//! ### [`controller`] - Playback Controller
//! - One transition function fed by user commands and engine notifications
//! - Play generations to tell current notifications from stale ones
//!
//! ### [`queue`] - Queue Store
//! - Ordered track list with wrap-around position (repeat-all)
//!
//! ### [`watchdog`] - Inactivity Watchdog
//! - Single replaceable timer that disconnects idle sessions
//!
//! ### [`gateway`] - Collaborator seams
//! - Voice transport, playback engine and announcement traits
//!
//! ## State machine
//!
//! ```text
//!                 play                    stop
//!  Disconnected ────────► Playing ◄──────────────► Paused
//!       ▲                  │   ▲       play
//!       │ idle timeout     │   │ play
//!       │                  ▼   │
//!       └──────────────── Idle
//!          (empty queue, purge, engine failure)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use guild_jukebox::audio::{PlayRequest, SessionRegistry, TenantId, ChannelRef};
//!
//! # async fn example(registry: &SessionRegistry) -> anyhow::Result<()> {
//! let session = registry.get_or_create(TenantId::new(123456789));
//!
//! session
//!     .play(
//!         PlayRequest::new()
//!             .url("https://youtu.be/dQw4w9WgXcQ")
//!             .channel(ChannelRef::new(987654321)),
//!     )
//!     .await?;
//!
//! session.stop().await?;
//! session.skip().await?;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod gateway;
pub mod queue;
pub mod registry;
pub mod session;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{PlayOutcome, PlayRequest};
pub use gateway::{Announcement, ConnectionGateway, EngineEvent, Notifier, PlaybackSink, VoiceConnection};
pub use registry::SessionRegistry;
pub use session::{
    ChannelRef, NotifyTarget, PlaybackState, PlayerContext, PlayerSettings, Session, SessionSnapshot,
    TenantId,
};
