use serenity::async_trait;
use songbird::{
    tracks::TrackHandle, Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler,
    TrackEvent,
};
use tracing::{debug, error};

use crate::audio::PlaybackSink;

#[derive(Debug, Clone, Copy)]
enum Signal {
    Started,
    Ended,
    Failed,
}

/// Forwards a songbird track event to a session, tagged with its play generation.
struct EngineSignal {
    sink: PlaybackSink,
    generation: u64,
    signal: Signal,
}

#[async_trait]
impl VoiceEventHandler for EngineSignal {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        match self.signal {
            Signal::Started => {
                debug!("▶️ Track #{} live in guild {}", self.generation, self.sink.tenant_id());
                self.sink.now_playing(self.generation);
            }
            Signal::Ended => {
                debug!("⏹️ Track #{} ended in guild {}", self.generation, self.sink.tenant_id());
                self.sink.track_ended(self.generation);
            }
            Signal::Failed => {
                if let EventContext::Track(track_list) = ctx {
                    for (state, _handle) in *track_list {
                        error!(
                            "❌ Track #{} failed in guild {}: {:?}",
                            self.generation,
                            self.sink.tenant_id(),
                            state.playing
                        );
                    }
                }
                self.sink.track_failed(self.generation);
            }
        }

        None
    }
}

/// Hooks the events of a freshly started track up to the session's sink.
pub fn register_track_events(
    handle: &TrackHandle,
    sink: &PlaybackSink,
    generation: u64,
) -> anyhow::Result<()> {
    let events = [
        (TrackEvent::Playable, Signal::Started),
        (TrackEvent::Play, Signal::Started),
        (TrackEvent::End, Signal::Ended),
        (TrackEvent::Error, Signal::Failed),
    ];

    for (event, signal) in events {
        handle
            .add_event(
                VoiceEvent::Track(event),
                EngineSignal {
                    sink: sink.clone(),
                    generation,
                    signal,
                },
            )
            .map_err(|e| anyhow::anyhow!("failed to attach track event handler: {}", e))?;
    }

    Ok(())
}
