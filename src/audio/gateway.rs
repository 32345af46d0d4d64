//! Seams to the collaborators the session core drives but does not implement:
//! the voice transport, the playback engine behind it, and the channel the
//! bot answers in.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

use super::session::{ChannelRef, NotifyTarget, TenantId};
use crate::{error::ConnectionError, sources::Track};

/// Opens voice connections for tenants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    /// Joins `channel` on behalf of `tenant_id`.
    ///
    /// The caller bounds this with the connect timeout.
    async fn connect(
        &self,
        tenant_id: TenantId,
        channel: ChannelRef,
    ) -> Result<Box<dyn VoiceConnection>, ConnectionError>;
}

/// A live voice connection, exclusively owned by one session.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Routes engine notifications for this connection into `sink`.
    async fn subscribe(&mut self, sink: PlaybackSink) -> Result<(), ConnectionError>;

    /// Starts `track`, replacing whatever was playing.
    ///
    /// Notifications for this track must carry `generation`.
    async fn play(&mut self, track: &Track, generation: u64) -> anyhow::Result<()>;

    async fn pause(&mut self) -> anyhow::Result<()>;

    async fn resume(&mut self) -> anyhow::Result<()>;

    /// Stops the current track. No-op when nothing is playing.
    async fn stop(&mut self) -> anyhow::Result<()>;

    /// Leaves the channel. Best effort; the session drops the connection either way.
    async fn disconnect(&mut self) -> anyhow::Result<()>;
}

/// Status reported by the playback engine for one play generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    NowPlaying { generation: u64 },
    TrackEnded { generation: u64 },
    TrackFailed { generation: u64 },
}

/// Sending half of a session's notification pump, handed to the engine on subscribe.
///
/// Sends never block, so the engine may report from any context.
#[derive(Debug, Clone)]
pub struct PlaybackSink {
    tenant_id: TenantId,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl PlaybackSink {
    pub(crate) fn new(tenant_id: TenantId, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tenant_id, tx }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn now_playing(&self, generation: u64) {
        self.send(EngineEvent::NowPlaying { generation });
    }

    pub fn track_ended(&self, generation: u64) {
        self.send(EngineEvent::TrackEnded { generation });
    }

    pub fn track_failed(&self, generation: u64) {
        self.send(EngineEvent::TrackFailed { generation });
    }

    fn send(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            debug!("Session {} is gone, dropping {:?}", self.tenant_id, event);
        }
    }
}

/// Messages the core pushes to a tenant without a command to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    IdleDisconnect,
    TrackFailed(Track),
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleDisconnect => f.write_str("👋 Left the voice channel after being idle."),
            Self::TrackFailed(track) => write!(f, "❌ Could not play **{}**.", track),
        }
    }
}

/// Delivers announcements to the last channel a tenant used.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn announce(&self, target: NotifyTarget, announcement: Announcement) -> anyhow::Result<()>;
}
