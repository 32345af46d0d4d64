//! # Bot Module
//!
//! Discord front end of the jukebox.
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`] and forwards:
//!
//! - prefix commands to the guild's [`Session`](crate::audio::Session)
//! - the bot being dropped from voice to [`Session::transport_lost`](crate::audio::Session::transport_lost)
//! - the bot leaving a guild to [`SessionRegistry::evict`]
//!
//! Voice and notifications go through [`voice::SongbirdGateway`] and
//! [`notifier::DiscordNotifier`], so the audio layer never sees Serenity types.

use serenity::{
    all::{Context, EventHandler, Guild, Message, Ready, UnavailableGuild, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info};

pub mod commands;
pub mod events;
pub mod handlers;
pub mod notifier;
pub mod voice;

use crate::{
    audio::{SessionRegistry, TenantId},
    config::Config,
};

pub struct JukeboxBot {
    config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
}

impl JukeboxBot {
    pub fn new(config: Config, registry: Arc<SessionRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
        }
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(input) = msg.content.strip_prefix(self.config.command_prefix.as_str()) else {
            return;
        };

        if let Err(e) = handlers::handle_message(&ctx, &msg, input, self).await {
            error!("Error handling command: {:?}", e);
        }
    }

    /// Only the bot's own voice state matters: being moved out of a channel
    /// by anyone other than the session itself is a transport loss.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }
        let Some(guild_id) = new.guild_id else {
            return;
        };

        if let Some(session) = self.registry.get(TenantId::new(guild_id.get())) {
            info!("🔌 Bot disconnected from voice in guild {}", guild_id);
            session.transport_lost().await;
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        if incomplete.unavailable {
            return;
        }

        if self.registry.evict(TenantId::new(incomplete.id.get())).await {
            info!("🗑️ Session for guild {} evicted", incomplete.id);
        }
    }
}
