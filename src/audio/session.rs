use parking_lot::Mutex as SyncMutex;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info};

use super::{
    gateway::{ConnectionGateway, EngineEvent, Notifier, PlaybackSink, VoiceConnection},
    queue::QueueStore,
    watchdog::InactivityWatchdog,
};
use crate::sources::{SourcePatterns, Track};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

snowflake!(
    /// Communication group that owns a session (a guild).
    TenantId
);
snowflake!(
    /// Voice channel to connect to.
    ChannelRef
);
snowflake!(
    /// Text channel announcements are posted to.
    NotifyTarget
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Disconnected,
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
        })
    }
}

/// Timeouts and source policy shared by every session.
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub play_ready_timeout: Duration,
    pub sources: Arc<SourcePatterns>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(30_000),
            connect_timeout: Duration::from_millis(30_000),
            play_ready_timeout: Duration::from_millis(5_000),
            sources: Arc::new(SourcePatterns::default()),
        }
    }
}

/// Collaborators and settings every session of a registry uses.
pub struct PlayerContext {
    pub settings: PlayerSettings,
    pub gateway: Arc<dyn ConnectionGateway>,
    pub notifier: Arc<dyn Notifier>,
}

impl PlayerContext {
    pub fn new(
        settings: PlayerSettings,
        gateway: Arc<dyn ConnectionGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            gateway,
            notifier,
        }
    }
}

/// Mutable part of a session. Only touched while holding [`Session::state`].
pub(crate) struct SessionState {
    pub(crate) queue: QueueStore,
    pub(crate) playback: PlaybackState,
    pub(crate) connection: Option<Box<dyn VoiceConnection>>,
    pub(crate) last_notify_target: Option<NotifyTarget>,
    pub(crate) watchdog: InactivityWatchdog,
    /// Bumped whenever the session starts or stops a track itself, and on
    /// teardown. A pause keeps it. Engine notifications carrying any other
    /// value are stale.
    pub(crate) generation: u64,
    /// The engine holds a paused track that has not ended yet.
    pub(crate) resumable: bool,
    /// Set once the session is evicted; it never connects again.
    pub(crate) closed: bool,
}

/// One tenant's playback context.
///
/// All transitions run under the per-session `state` lock; sessions of
/// different tenants never contend.
pub struct Session {
    tenant_id: TenantId,
    pub(crate) context: Arc<PlayerContext>,
    pub(crate) state: Mutex<SessionState>,
    events_registered: AtomicBool,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: SyncMutex<Option<mpsc::UnboundedReceiver<EngineEvent>>>,
    /// Latest generation the engine confirmed as playing.
    pub(crate) ready: watch::Sender<u64>,
}

impl Session {
    pub(crate) fn new(tenant_id: TenantId, context: Arc<PlayerContext>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ready, _) = watch::channel(0);

        Self {
            tenant_id,
            state: Mutex::new(SessionState {
                queue: QueueStore::new(context.settings.sources.clone()),
                playback: PlaybackState::Disconnected,
                connection: None,
                last_notify_target: None,
                watchdog: InactivityWatchdog::new(),
                generation: 0,
                resumable: false,
                closed: false,
            }),
            context,
            events_registered: AtomicBool::new(false),
            events_tx,
            events_rx: SyncMutex::new(Some(events_rx)),
            ready,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Installs the engine notification pump. Only the first call has any effect.
    pub(crate) fn register_events(self: &Arc<Self>) -> bool {
        if self
            .events_registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let Some(mut rx) = self.events_rx.lock().take() else {
            return false;
        };

        let session = Arc::downgrade(self);
        let tenant_id = self.tenant_id;
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(session) = session.upgrade() else {
                    break;
                };
                session.on_engine_event(event).await;
            }
            debug!("Notification pump for session {} stopped", tenant_id);
        });

        info!("🎧 Session {} ready for engine notifications", self.tenant_id);
        true
    }

    pub fn events_registered(&self) -> bool {
        self.events_registered.load(Ordering::Acquire)
    }

    pub(crate) fn sink(&self) -> PlaybackSink {
        PlaybackSink::new(self.tenant_id, self.events_tx.clone())
    }

    /// Point-in-time view of the session for listings and status replies.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            tenant_id: self.tenant_id,
            state: state.playback,
            tracks: state.queue.tracks().to_vec(),
            current_index: state.queue.current_index(),
            connected: state.connection.is_some(),
            idle_timer_armed: state.watchdog.is_armed(),
        }
    }
}

/// Copy of a session's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub tenant_id: TenantId,
    pub state: PlaybackState,
    pub tracks: Vec<Track>,
    pub current_index: usize,
    pub connected: bool,
    pub idle_timer_armed: bool,
}

impl SessionSnapshot {
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
