//! Playback state machine.
//!
//! User commands and engine notifications are both turned into a
//! [`Trigger`] and applied by [`Session::transition`] under the session lock,
//! so the queue position only ever moves through [`QueueStore::advance`].
//!
//! A skip and an in-flight "track ended" for the same track cannot both
//! advance: every track the session starts or stops itself bumps the play
//! generation, and notifications carrying an older generation are ignored.
//!
//! [`QueueStore::advance`]: super::queue::QueueStore::advance

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    gateway::{Announcement, EngineEvent, VoiceConnection},
    session::{ChannelRef, NotifyTarget, PlaybackState, Session, SessionState},
};
use crate::{
    error::{ConnectionError, PlaybackError},
    sources::Track,
};

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Play { channel: Option<ChannelRef> },
    Stop,
    Skip,
    Purge,
    Engine(EngineEvent),
    IdleTimeout { epoch: u64 },
    TransportLost,
}

/// Arguments of a `play` command.
#[derive(Debug, Clone, Default)]
pub struct PlayRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    /// Voice channel of the caller, used when the session has to connect.
    pub channel: Option<ChannelRef>,
    pub reply_to: Option<NotifyTarget>,
}

impl PlayRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn channel(mut self, channel: ChannelRef) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn reply_to(mut self, target: NotifyTarget) -> Self {
        self.reply_to = Some(target);
        self
    }
}

/// What a successful `play` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    /// Position and track added by this command, if a URL was given.
    pub queued: Option<(usize, Track)>,
    pub now_playing: Option<Track>,
    pub state: PlaybackState,
}

impl Session {
    /// Enqueues the requested track, if any, then makes sure playback is running.
    pub async fn play(self: &Arc<Self>, request: PlayRequest) -> Result<PlayOutcome, PlaybackError> {
        let track = request
            .url
            .as_deref()
            .map(|url| self.context.settings.sources.track(url, request.title.clone()))
            .transpose()?;

        let (outcome, started) = {
            let mut state = self.state.lock().await;
            if let Some(target) = request.reply_to {
                state.last_notify_target = Some(target);
            }

            let queued = match track {
                Some(track) => Some((state.queue.enqueue(track.clone())?, track)),
                None => None,
            };

            let before = state.generation;
            self.transition(&mut state, Trigger::Play {
                channel: request.channel,
            })
            .await?;

            let playing = state.playback == PlaybackState::Playing;
            let started = (playing && state.generation != before).then_some(state.generation);
            let outcome = PlayOutcome {
                queued,
                now_playing: playing.then(|| state.queue.current().cloned()).flatten(),
                state: state.playback,
            };
            (outcome, started)
        };

        if let Some(generation) = started {
            self.await_ready(generation).await;
        }

        Ok(outcome)
    }

    /// Pauses the current track. Anything but `Playing` is left as is.
    pub async fn stop(self: &Arc<Self>) -> Result<PlaybackState, PlaybackError> {
        let mut state = self.state.lock().await;
        self.transition(&mut state, Trigger::Stop).await?;
        Ok(state.playback)
    }

    /// Stops the current track and moves to the next one without waiting for it to end.
    ///
    /// Returns the track now playing, if any.
    pub async fn skip(self: &Arc<Self>) -> Result<Option<Track>, PlaybackError> {
        let mut state = self.state.lock().await;
        self.transition(&mut state, Trigger::Skip).await?;

        Ok(match state.playback {
            PlaybackState::Playing => state.queue.current().cloned(),
            _ => None,
        })
    }

    /// Empties the queue. Returns how many tracks were removed.
    pub async fn purge(self: &Arc<Self>) -> Result<usize, PlaybackError> {
        let mut state = self.state.lock().await;
        let removed = state.queue.len();
        self.transition(&mut state, Trigger::Purge).await?;
        Ok(removed)
    }

    /// Reacts to the voice transport dropping the bot from its channel.
    pub async fn transport_lost(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        if let Err(e) = self.transition(&mut state, Trigger::TransportLost).await {
            error!("Session {}: transport loss handling failed: {:?}", self.tenant_id(), e);
        }
    }

    /// Releases the connection and timer ahead of dropping the session.
    pub(crate) async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.watchdog.cancel();
        self.teardown(&mut state).await;
    }

    pub(crate) async fn on_engine_event(self: &Arc<Self>, event: EngineEvent) {
        let mut state = self.state.lock().await;
        if let Err(e) = self.transition(&mut state, Trigger::Engine(event)).await {
            error!("Session {}: failed to apply {:?}: {:?}", self.tenant_id(), event, e);
        }
    }

    fn idle_timeout(self: Arc<Self>, epoch: u64) -> BoxFuture<'static, ()> {
        async move {
            let mut state = self.state.lock().await;
            if let Err(e) = self.transition(&mut state, Trigger::IdleTimeout { epoch }).await {
                error!("Session {}: idle teardown failed: {:?}", self.tenant_id(), e);
            }
        }
        .boxed()
    }

    async fn transition(
        self: &Arc<Self>,
        state: &mut SessionState,
        trigger: Trigger,
    ) -> Result<(), PlaybackError> {
        use PlaybackState::*;

        let from = state.playback;
        let result = match (from, trigger) {
            (Disconnected, Trigger::Play { .. }) if state.closed => {
                Err(ConnectionError::Closed.into())
            }
            (Disconnected, Trigger::Play { channel }) => {
                let channel = channel.ok_or(ConnectionError::NoChannel)?;
                state.connection = Some(self.connect(channel).await?);
                state.watchdog.cancel();

                if state.queue.current().is_some() {
                    self.start_current(state).await
                } else {
                    self.enter_idle(state);
                    Err(PlaybackError::EmptyQueue)
                }
            }
            (Idle, Trigger::Play { .. }) => {
                if state.queue.current().is_none() {
                    return Err(PlaybackError::EmptyQueue);
                }
                self.start_current(state).await
            }
            (Paused, Trigger::Play { .. }) if !state.resumable => self.start_current(state).await,
            (Paused, Trigger::Play { .. }) => {
                connection(state)?
                    .resume()
                    .await
                    .map_err(PlaybackError::Engine)?;
                state.watchdog.cancel();
                state.resumable = false;
                state.playback = Playing;
                Ok(())
            }
            (Playing, Trigger::Play { .. }) => Ok(()),

            (Playing, Trigger::Stop) => {
                connection(state)?
                    .pause()
                    .await
                    .map_err(PlaybackError::Engine)?;
                state.resumable = true;
                state.playback = Paused;
                Ok(())
            }
            (_, Trigger::Stop) => Ok(()),

            (Disconnected, Trigger::Skip) => {
                state.queue.advance();
                Ok(())
            }
            (_, Trigger::Skip) => {
                self.stop_current(state).await;
                state.queue.advance();
                if state.queue.current().is_some() {
                    self.start_current(state).await
                } else {
                    self.enter_idle(state);
                    Ok(())
                }
            }

            (Disconnected | Idle, Trigger::Purge) => {
                state.queue.purge();
                Ok(())
            }
            (Playing | Paused, Trigger::Purge) => {
                self.stop_current(state).await;
                state.queue.purge();
                self.enter_idle(state);
                Ok(())
            }

            (Playing, Trigger::Engine(EngineEvent::TrackEnded { generation }))
                if generation == state.generation =>
            {
                state.queue.advance();
                if state.queue.current().is_some() {
                    // A refused restart already left the session idle.
                    if let Err(e) = self.start_current(state).await {
                        error!("Session {}: could not start next track: {:?}", self.tenant_id(), e);
                    }
                } else {
                    self.enter_idle(state);
                }
                Ok(())
            }
            // Ended while paused: the next play starts the following track.
            (Paused, Trigger::Engine(EngineEvent::TrackEnded { generation }))
                if generation == state.generation =>
            {
                state.resumable = false;
                state.queue.advance();
                Ok(())
            }
            (Playing | Paused, Trigger::Engine(EngineEvent::TrackFailed { generation }))
                if generation == state.generation =>
            {
                state.generation += 1;
                self.enter_idle(state);
                if let Some(track) = state.queue.current().cloned() {
                    error!("❌ Session {}: engine failed on {}", self.tenant_id(), track);
                    self.announce(state, Announcement::TrackFailed(track)).await;
                }
                Ok(())
            }
            (_, Trigger::Engine(EngineEvent::NowPlaying { generation }))
                if generation == state.generation && state.connection.is_some() =>
            {
                state.watchdog.cancel();
                self.ready.send_replace(generation);
                Ok(())
            }
            (_, Trigger::Engine(event)) => {
                debug!(
                    "Session {}: ignoring stale {:?} (generation {}, {})",
                    self.tenant_id(),
                    event,
                    state.generation,
                    from
                );
                Ok(())
            }

            (Idle, Trigger::IdleTimeout { epoch }) => {
                if !state.watchdog.claim(epoch) {
                    debug!("Session {}: stale idle timer #{}", self.tenant_id(), epoch);
                    return Ok(());
                }
                info!("💤 Session {} idle, leaving voice channel", self.tenant_id());
                self.teardown(state).await;
                self.announce(state, Announcement::IdleDisconnect).await;
                Ok(())
            }
            (_, Trigger::IdleTimeout { epoch }) => {
                state.watchdog.claim(epoch);
                debug!("Session {}: idle timer #{} fired while {}", self.tenant_id(), epoch, from);
                Ok(())
            }

            (Disconnected, Trigger::TransportLost) => Ok(()),
            (_, Trigger::TransportLost) => {
                warn!("🔌 Session {} lost its voice connection", self.tenant_id());
                state.watchdog.cancel();
                self.teardown(state).await;
                Ok(())
            }
        };

        if state.playback != from {
            info!("Session {}: {} -> {}", self.tenant_id(), from, state.playback);
        }
        result
    }

    async fn connect(&self, channel: ChannelRef) -> Result<Box<dyn VoiceConnection>, ConnectionError> {
        let timeout = self.context.settings.connect_timeout;
        info!("🔗 Session {} joining voice channel {}", self.tenant_id(), channel);

        let mut connection = tokio::time::timeout(
            timeout,
            self.context.gateway.connect(self.tenant_id(), channel),
        )
        .await
        .map_err(|_| ConnectionError::Timeout(timeout))??;

        let subscribed = connection.subscribe(self.sink()).await;
        if let Err(e) = subscribed {
            if let Err(teardown) = connection.disconnect().await {
                warn!("⚠️ Teardown warning for session {}: {:?}", self.tenant_id(), teardown);
            }
            return Err(e);
        }

        Ok(connection)
    }

    async fn start_current(self: &Arc<Self>, state: &mut SessionState) -> Result<(), PlaybackError> {
        let Some(track) = state.queue.current().cloned() else {
            self.enter_idle(state);
            return Err(PlaybackError::EmptyQueue);
        };

        state.generation += 1;
        let generation = state.generation;
        let played = connection(state)?.play(&track, generation).await;
        if let Err(e) = played {
            error!("❌ Session {}: engine refused {}: {:?}", self.tenant_id(), track, e);
            self.enter_idle(state);
            return Err(PlaybackError::Engine(e));
        }

        state.watchdog.cancel();
        state.playback = PlaybackState::Playing;
        info!(
            "🎵 Session {} playing [{}/{}] {}",
            self.tenant_id(),
            state.queue.current_index() + 1,
            state.queue.len(),
            track
        );
        Ok(())
    }

    async fn stop_current(&self, state: &mut SessionState) {
        state.generation += 1;
        state.resumable = false;
        if let Some(connection) = state.connection.as_mut() {
            if let Err(e) = connection.stop().await {
                warn!("Session {}: engine stop failed: {:?}", self.tenant_id(), e);
            }
        }
    }

    fn enter_idle(self: &Arc<Self>, state: &mut SessionState) {
        if state.playback == PlaybackState::Idle && state.watchdog.is_armed() {
            return;
        }

        state.playback = PlaybackState::Idle;
        let session = Arc::downgrade(self);
        state
            .watchdog
            .arm(self.context.settings.idle_timeout, move |epoch| match session.upgrade() {
                Some(session) => session.idle_timeout(epoch),
                None => futures::future::ready(()).boxed(),
            });
    }

    async fn teardown(&self, state: &mut SessionState) {
        state.generation += 1;
        state.resumable = false;
        if let Some(mut connection) = state.connection.take() {
            if let Err(e) = connection.disconnect().await {
                warn!("⚠️ Teardown warning for session {}: {:?}", self.tenant_id(), e);
            }
        }
        state.playback = PlaybackState::Disconnected;
    }

    async fn announce(&self, state: &SessionState, announcement: Announcement) {
        let Some(target) = state.last_notify_target else {
            debug!("Session {}: nowhere to announce {:?}", self.tenant_id(), announcement);
            return;
        };

        if let Err(e) = self.context.notifier.announce(target, announcement).await {
            warn!("Session {}: announcement failed: {:?}", self.tenant_id(), e);
        }
    }

    async fn await_ready(&self, generation: u64) {
        let timeout = self.context.settings.play_ready_timeout;
        let mut ready = self.ready.subscribe();

        let confirmed = matches!(
            tokio::time::timeout(timeout, ready.wait_for(|g| *g >= generation)).await,
            Ok(Ok(_))
        );
        if !confirmed {
            warn!(
                "⏳ Session {}: engine did not confirm playback within {:?}",
                self.tenant_id(),
                timeout
            );
        }
    }
}

fn connection(state: &mut SessionState) -> Result<&mut Box<dyn VoiceConnection>, ConnectionError> {
    state.connection.as_mut().ok_or(ConnectionError::NotConnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        gateway::MockConnectionGateway,
        registry::SessionRegistry,
        session::{PlayerContext, PlayerSettings, TenantId},
        testing::{settle, EngineCall, Harness, RecordingNotifier},
    };
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const TENANT: TenantId = TenantId::new(1);
    const VOICE: ChannelRef = ChannelRef::new(10);
    const TEXT: NotifyTarget = NotifyTarget::new(20);
    const A: &str = "https://youtu.be/aaaaaaaaaaa";
    const B: &str = "https://youtu.be/bbbbbbbbbbb";
    const IDLE: Duration = Duration::from_millis(30_000);

    fn play(url: &str) -> PlayRequest {
        PlayRequest::new().url(url).channel(VOICE).reply_to(TEXT)
    }

    fn played(url: &str, generation: u64) -> EngineCall {
        EngineCall::Play {
            url: url.to_string(),
            generation,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_track_repeats_after_natural_end() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);

        let outcome = session.play(play(A)).await.unwrap();
        assert_eq!(outcome.state, PlaybackState::Playing);
        assert_eq!(outcome.queued.map(|(position, _)| position), Some(0));
        assert_eq!(outcome.now_playing.as_ref().map(Track::url), Some(A));

        harness.engine.sink().track_ended(1);
        settle().await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert_eq!(snapshot.current_index, 0);
        assert_eq!(
            harness.engine.calls(),
            vec![
                EngineCall::Connect(VOICE),
                EngineCall::Subscribe,
                played(A, 1),
                played(A, 2),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn skip_preempts_natural_end() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();
        let outcome = session.play(play(B)).await.unwrap();
        assert_eq!(outcome.queued.map(|(position, _)| position), Some(1));
        assert_eq!(outcome.now_playing.as_ref().map(Track::url), Some(A));

        let now = session.skip().await.unwrap();
        assert_eq!(now.as_ref().map(Track::url), Some(B));
        assert_eq!(session.snapshot().await.current_index, 1);

        // The end of the pre-empted track arrives late and must not advance again.
        harness.engine.sink().track_ended(1);
        settle().await;
        assert_eq!(session.snapshot().await.current_index, 1);

        harness.engine.sink().track_ended(3);
        settle().await;
        assert_eq!(session.snapshot().await.current_index, 0);

        assert_eq!(
            harness.engine.calls()[2..].to_vec(),
            vec![
                played(A, 1),
                EngineCall::Stop,
                played(B, 3),
                played(A, 4),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_disconnects_once() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();
        session.purge().await.unwrap();
        assert_eq!(session.snapshot().await.state, PlaybackState::Idle);

        tokio::time::sleep(IDLE - Duration::from_millis(1)).await;
        assert_eq!(harness.engine.count(&EngineCall::Disconnect), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(harness.engine.count(&EngineCall::Disconnect), 1);
        assert_eq!(
            harness.notifier.sent(),
            vec![(TEXT, Announcement::IdleDisconnect)]
        );

        tokio::time::sleep(IDLE * 3).await;
        assert_eq!(harness.engine.count(&EngineCall::Disconnect), 1);
        assert_eq!(harness.notifier.sent().len(), 1);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Disconnected);
        assert!(!snapshot.connected);
        assert!(!snapshot.idle_timer_armed);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_while_playing_stops_current_track() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();
        session.play(play(B)).await.unwrap();
        session.skip().await.unwrap();

        assert_eq!(session.purge().await.unwrap(), 2);

        let snapshot = session.snapshot().await;
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.current_index, 0);
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert!(snapshot.idle_timer_armed);
        assert_eq!(harness.engine.calls().last(), Some(&EngineCall::Stop));

        // Stopping the track makes the engine report its end; nothing restarts.
        harness.engine.sink().track_ended(3);
        settle().await;
        assert_eq!(harness.engine.plays(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn playing_again_before_timeout_keeps_connection() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);

        let err = session
            .play(PlayRequest::new().channel(VOICE).reply_to(TEXT))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::EmptyQueue));
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert!(snapshot.connected);
        assert!(snapshot.idle_timer_armed);

        tokio::time::sleep(Duration::from_secs(20)).await;
        session.play(play(A)).await.unwrap();
        assert!(!session.snapshot().await.idle_timer_armed);

        tokio::time::sleep(IDLE * 2).await;
        assert_eq!(harness.engine.count(&EngineCall::Disconnect), 0);
        assert_eq!(harness.engine.count(&EngineCall::Connect(VOICE)), 1);
        assert_eq!(session.snapshot().await.state, PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_pauses_and_play_resumes() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();

        assert_eq!(session.stop().await.unwrap(), PlaybackState::Paused);
        assert_eq!(session.stop().await.unwrap(), PlaybackState::Paused);

        let outcome = session.play(PlayRequest::new()).await.unwrap();
        assert_eq!(outcome.state, PlaybackState::Playing);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.tracks.len(), 1);
        assert!(snapshot.connected);
        assert_eq!(
            harness.engine.calls()[2..].to_vec(),
            vec![played(A, 1), EngineCall::Pause, EngineCall::Resume]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_track_is_rejected_before_enqueue() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();

        let err = session.play(play("https://example.com/x.mp3")).await.unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidTrack { .. }));
        assert_eq!(session.snapshot().await.tracks.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn play_without_voice_channel_fails_to_connect() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);

        let err = session.play(PlayRequest::new().url(A)).await.unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::Connection(ConnectionError::NoChannel)
        ));

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Disconnected);
        assert_eq!(snapshot.tracks.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handshake_times_out() {
        let harness = Harness::new();
        harness.engine.delay_connect(Duration::from_secs(60));
        let session = harness.registry.get_or_create(TENANT);

        let err = session.play(play(A)).await.unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::Connection(ConnectionError::Timeout(d)) if d == Duration::from_millis(30_000)
        ));
        assert_eq!(session.snapshot().await.state, PlaybackState::Disconnected);

        // No automatic retry; the caller re-issues the command.
        harness.engine.delay_connect(Duration::ZERO);
        session.play(PlayRequest::new().channel(VOICE)).await.unwrap();
        assert_eq!(session.snapshot().await.state, PlaybackState::Playing);
        assert_eq!(harness.engine.count(&EngineCall::Connect(VOICE)), 2);
    }

    #[tokio::test]
    async fn unreachable_transport_is_reported() {
        let mut gateway = MockConnectionGateway::new();
        gateway
            .expect_connect()
            .times(1)
            .returning(|_, _| Err(ConnectionError::Transport("refused".into())));
        let registry = SessionRegistry::new(PlayerContext::new(
            PlayerSettings::default(),
            Arc::new(gateway),
            Arc::new(RecordingNotifier::default()),
        ));
        let session = registry.get_or_create(TENANT);

        let err = session.play(play(A)).await.unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::Connection(ConnectionError::Transport(_))
        ));
        assert_eq!(session.snapshot().await.state, PlaybackState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_on_empty_queue_is_safe() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);

        assert_eq!(session.skip().await.unwrap(), None);
        assert_eq!(session.snapshot().await.current_index, 0);

        session.play(play(A)).await.unwrap();
        session.purge().await.unwrap();
        assert_eq!(session.skip().await.unwrap(), None);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.current_index, 0);
        assert_eq!(snapshot.state, PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_while_disconnected_only_moves_position() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        for url in [A, B] {
            let err = session.play(PlayRequest::new().url(url)).await.unwrap_err();
            assert!(matches!(err, PlaybackError::Connection(ConnectionError::NoChannel)));
        }

        assert_eq!(session.skip().await.unwrap(), None);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Disconnected);
        assert_eq!(snapshot.current_index, 1);
        assert!(harness.engine.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn skip_while_paused_starts_next_track() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();
        session.play(play(B)).await.unwrap();
        session.stop().await.unwrap();

        let now = session.skip().await.unwrap();
        assert_eq!(now.as_ref().map(Track::url), Some(B));

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert_eq!(snapshot.current_index, 1);
        assert_eq!(
            harness.engine.calls()[2..].to_vec(),
            vec![played(A, 1), EngineCall::Pause, EngineCall::Stop, played(B, 3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn play_while_playing_only_enqueues() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();
        let before = harness.engine.calls();

        let outcome = session.play(play(B)).await.unwrap();
        assert_eq!(outcome.state, PlaybackState::Playing);
        assert_eq!(outcome.queued.map(|(position, _)| position), Some(1));
        assert_eq!(outcome.now_playing.as_ref().map(Track::url), Some(A));

        assert_eq!(harness.engine.calls(), before);
        assert_eq!(session.snapshot().await.tracks.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn track_ending_while_paused_is_not_lost() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();
        session.play(play(B)).await.unwrap();
        session.stop().await.unwrap();

        // The end was already on its way when the pause landed.
        harness.engine.sink().track_ended(1);
        settle().await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Paused);
        assert_eq!(snapshot.current_index, 1);

        let outcome = session.play(PlayRequest::new()).await.unwrap();
        assert_eq!(outcome.state, PlaybackState::Playing);
        assert_eq!(outcome.now_playing.as_ref().map(Track::url), Some(B));
        assert_eq!(harness.engine.count(&EngineCall::Resume), 0);

        harness.engine.sink().track_ended(2);
        settle().await;
        assert_eq!(session.snapshot().await.current_index, 0);
        assert_eq!(
            harness.engine.calls()[2..].to_vec(),
            vec![played(A, 1), EngineCall::Pause, played(B, 2), played(A, 3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn engine_failure_goes_idle_and_announces() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();

        harness.engine.sink().track_failed(1);
        settle().await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert!(snapshot.idle_timer_armed);
        assert_eq!(harness.engine.plays(), 1);
        assert!(matches!(
            harness.notifier.sent().as_slice(),
            [(TEXT, Announcement::TrackFailed(track))] if track.url() == A
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn refused_play_reports_engine_error() {
        let harness = Harness::new();
        harness.engine.refuse_play(true);
        let session = harness.registry.get_or_create(TENANT);

        let err = session.play(play(A)).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Engine(_)));

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert!(snapshot.idle_timer_armed);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_start_still_succeeds() {
        let harness = Harness::new();
        harness.engine.auto_ready(false);
        let session = harness.registry.get_or_create(TENANT);

        let outcome = session.play(play(A)).await.unwrap();
        assert_eq!(outcome.state, PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_loss_keeps_queue_and_reconnects_on_play() {
        let harness = Harness::new();
        let session = harness.registry.get_or_create(TENANT);
        session.play(play(A)).await.unwrap();

        session.transport_lost().await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Disconnected);
        assert_eq!(snapshot.tracks.len(), 1);

        // Late notifications from the dropped connection are stale.
        harness.engine.sink().track_ended(1);
        settle().await;
        assert_eq!(harness.engine.plays(), 1);

        session.play(PlayRequest::new().channel(VOICE)).await.unwrap();
        assert_eq!(session.snapshot().await.state, PlaybackState::Playing);
        assert_eq!(harness.engine.count(&EngineCall::Connect(VOICE)), 2);
    }
}
