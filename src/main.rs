use anyhow::Result;
use guild_jukebox::{
    audio::{PlayerContext, SessionRegistry},
    bot::{notifier::DiscordNotifier, voice::SongbirdGateway, JukeboxBot},
    config::Config,
};
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    info!("🎵 Starting guild-jukebox v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("{}", config.summary());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let songbird = Songbird::serenity();
    let http = Arc::new(Http::new(&config.discord_token));
    let context = PlayerContext::new(
        config.player_settings()?,
        Arc::new(SongbirdGateway::new(songbird.clone())),
        Arc::new(DiscordNotifier::new(http)),
    );
    let registry = Arc::new(SessionRegistry::new(context));

    let handler = JukeboxBot::new(config.clone(), registry);
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("⚠️ Shutdown signal received, closing...");
            shard_manager.shutdown_all().await;
        }
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    let yt_dlp = async_process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await?;

    if yt_dlp.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("yt-dlp is missing");
    }
}
