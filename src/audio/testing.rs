//! Recording fakes for the voice transport, engine and notifier.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use super::{
    gateway::{Announcement, ConnectionGateway, Notifier, PlaybackSink, VoiceConnection},
    registry::SessionRegistry,
    session::{ChannelRef, NotifyTarget, PlayerContext, PlayerSettings, TenantId},
};
use crate::{error::ConnectionError, sources::Track};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Connect(ChannelRef),
    Subscribe,
    Play { url: String, generation: u64 },
    Pause,
    Resume,
    Stop,
    Disconnect,
}

/// Shared state behind the fake gateway and every connection it hands out.
pub struct FakeEngine {
    calls: Mutex<Vec<EngineCall>>,
    sink: Mutex<Option<PlaybackSink>>,
    connect_delay: Mutex<Duration>,
    auto_ready: AtomicBool,
    refuse_play: AtomicBool,
}

impl FakeEngine {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            connect_delay: Mutex::new(Duration::ZERO),
            auto_ready: AtomicBool::new(true),
            refuse_play: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn plays(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, EngineCall::Play { .. }))
            .count()
    }

    /// Sink of the most recent subscription.
    pub fn sink(&self) -> PlaybackSink {
        self.sink.lock().clone().expect("no connection subscribed yet")
    }

    pub fn delay_connect(&self, delay: Duration) {
        *self.connect_delay.lock() = delay;
    }

    /// Whether `play` immediately reports "now playing".
    pub fn auto_ready(&self, enabled: bool) {
        self.auto_ready.store(enabled, Ordering::SeqCst);
    }

    pub fn refuse_play(&self, refuse: bool) {
        self.refuse_play.store(refuse, Ordering::SeqCst);
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

pub struct FakeGateway(Arc<FakeEngine>);

#[async_trait]
impl ConnectionGateway for FakeGateway {
    async fn connect(
        &self,
        _tenant_id: TenantId,
        channel: ChannelRef,
    ) -> Result<Box<dyn VoiceConnection>, ConnectionError> {
        self.0.record(EngineCall::Connect(channel));

        let delay = *self.0.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(Box::new(FakeConnection(self.0.clone())))
    }
}

struct FakeConnection(Arc<FakeEngine>);

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn subscribe(&mut self, sink: PlaybackSink) -> Result<(), ConnectionError> {
        self.0.record(EngineCall::Subscribe);
        *self.0.sink.lock() = Some(sink);
        Ok(())
    }

    async fn play(&mut self, track: &Track, generation: u64) -> anyhow::Result<()> {
        if self.0.refuse_play.load(Ordering::SeqCst) {
            anyhow::bail!("decoder unavailable");
        }

        self.0.record(EngineCall::Play {
            url: track.url().to_string(),
            generation,
        });
        if self.0.auto_ready.load(Ordering::SeqCst) {
            if let Some(sink) = self.0.sink.lock().as_ref() {
                sink.now_playing(generation);
            }
        }
        Ok(())
    }

    async fn pause(&mut self) -> anyhow::Result<()> {
        self.0.record(EngineCall::Pause);
        Ok(())
    }

    async fn resume(&mut self) -> anyhow::Result<()> {
        self.0.record(EngineCall::Resume);
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.0.record(EngineCall::Stop);
        Ok(())
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        self.0.record(EngineCall::Disconnect);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(NotifyTarget, Announcement)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(NotifyTarget, Announcement)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn announce(&self, target: NotifyTarget, announcement: Announcement) -> anyhow::Result<()> {
        self.sent.lock().push((target, announcement));
        Ok(())
    }
}

/// Registry wired to the fakes with default settings.
pub struct Harness {
    pub registry: SessionRegistry,
    pub engine: Arc<FakeEngine>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        let engine = Arc::new(FakeEngine::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let registry = SessionRegistry::new(PlayerContext::new(
            PlayerSettings::default(),
            Arc::new(FakeGateway(engine.clone())),
            notifier.clone(),
        ));

        Self {
            registry,
            engine,
            notifier,
        }
    }
}

/// Lets queued engine notifications drain through the session pumps.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
