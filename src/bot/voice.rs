use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{input::YoutubeDl, tracks::TrackHandle, Call, Songbird};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::events;
use crate::{
    audio::{ChannelRef, ConnectionGateway, PlaybackSink, TenantId, VoiceConnection},
    error::ConnectionError,
    sources::Track,
};

/// Voice transport backed by songbird; media is resolved through yt-dlp.
pub struct SongbirdGateway {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ConnectionGateway for SongbirdGateway {
    async fn connect(
        &self,
        tenant_id: TenantId,
        channel: ChannelRef,
    ) -> Result<Box<dyn VoiceConnection>, ConnectionError> {
        let guild_id = GuildId::new(tenant_id.get());
        let channel_id = ChannelId::new(channel.get());

        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        info!("🔊 Connected to voice channel {} in guild {}", channel_id, guild_id);
        Ok(Box::new(SongbirdConnection {
            guild_id,
            manager: self.manager.clone(),
            call,
            http: self.http.clone(),
            sink: None,
            current: None,
        }))
    }
}

struct SongbirdConnection {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
    sink: Option<PlaybackSink>,
    current: Option<TrackHandle>,
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn subscribe(&mut self, sink: PlaybackSink) -> Result<(), ConnectionError> {
        self.sink = Some(sink);
        Ok(())
    }

    async fn play(&mut self, track: &Track, generation: u64) -> anyhow::Result<()> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("connection is not subscribed"))?;

        let input = YoutubeDl::new(self.http.clone(), track.url().to_string());
        let handle = self.call.lock().await.play_only_input(input.into());
        events::register_track_events(&handle, sink, generation)?;

        debug!("🎵 Track #{} handed to songbird in guild {}", generation, self.guild_id);
        self.current = Some(handle);
        Ok(())
    }

    async fn pause(&mut self) -> anyhow::Result<()> {
        if let Some(track) = &self.current {
            track.pause()?;
        }
        Ok(())
    }

    async fn resume(&mut self) -> anyhow::Result<()> {
        if let Some(track) = &self.current {
            track.play()?;
        }
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(track) = self.current.take() {
            track.stop()?;
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        self.current = None;
        self.manager.remove(self.guild_id).await?;
        info!("👋 Left voice channel in guild {}", self.guild_id);
        Ok(())
    }
}
