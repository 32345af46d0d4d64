use anyhow::Result;
use serenity::{
    builder::{CreateEmbed, CreateMessage},
    model::{
        channel::Message,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use super::{commands::Command, JukeboxBot};
use crate::{
    audio::{ChannelRef, NotifyTarget, PlayRequest, PlaybackState, TenantId},
    error::PlaybackError,
    ui::embeds,
};

/// Runs one prefix command. `input` is the message text with the prefix removed.
pub async fn handle_message(ctx: &Context, msg: &Message, input: &str, bot: &JukeboxBot) -> Result<()> {
    let Some(command) = Command::parse(input) else {
        return Ok(());
    };
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    info!(
        "📝 Command {} used by {} in guild {}",
        command.name(),
        msg.author.name,
        guild_id
    );

    let embed = match run(ctx, msg, guild_id, command, bot).await {
        Ok(embed) => embed,
        Err(e) => {
            warn!("⚠️ Command failed in guild {}: {}", guild_id, e);
            embeds::create_error_embed(&e)
        }
    };

    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;

    Ok(())
}

async fn run(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    command: Command,
    bot: &JukeboxBot,
) -> Result<CreateEmbed, PlaybackError> {
    if command == Command::Help {
        return Ok(embeds::create_help_embed(&bot.config.command_prefix));
    }

    let session = bot.registry.get_or_create(TenantId::new(guild_id.get()));

    let embed = match command {
        Command::Play { url } => {
            let mut request = PlayRequest::new().reply_to(NotifyTarget::new(msg.channel_id.get()));
            if let Some(url) = url {
                request = request.url(url);
            }
            if let Some(channel) = user_voice_channel(ctx, guild_id, msg.author.id) {
                request = request.channel(ChannelRef::new(channel.get()));
            }

            let outcome = session.play(request).await?;
            embeds::create_play_embed(&outcome)
        }
        Command::Stop => match session.stop().await? {
            PlaybackState::Paused => embeds::create_info_embed("⏸️ Paused"),
            _ => embeds::create_info_embed("Nothing is playing."),
        },
        Command::Skip => match session.skip().await? {
            Some(track) => embeds::create_info_embed(format!("⏭️ Now playing: {}", track.display_name())),
            None => embeds::create_info_embed("⏭️ Skipped"),
        },
        Command::Queue => embeds::create_queue_embed(&session.snapshot().await),
        Command::Purge => {
            let removed = session.purge().await?;
            embeds::create_info_embed(format!("🗑️ Removed {} tracks from the queue", removed))
        }
        Command::Help => embeds::create_help_embed(&bot.config.command_prefix),
    };

    Ok(embed)
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
