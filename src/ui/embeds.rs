use serenity::builder::{CreateEmbed, CreateEmbedFooter};

use crate::{
    audio::{PlayOutcome, PlaybackState, SessionSnapshot},
    bot::commands::HELP,
    error::{ConnectionError, PlaybackError},
    sources::Track,
};

const COLOR_PLAYING: u32 = 0x1DB954;
const COLOR_INFO: u32 = 0x5865F2;
const COLOR_ERROR: u32 = 0xED4245;

/// Queue entries shown before collapsing the rest into a count.
const QUEUE_PAGE: usize = 10;

pub fn create_play_embed(outcome: &PlayOutcome) -> CreateEmbed {
    let mut description = String::new();
    if let Some((position, track)) = &outcome.queued {
        description.push_str(&format!("➕ Queued at #{}: {}\n", position + 1, track_link(track)));
    }

    match (&outcome.now_playing, outcome.state) {
        (Some(track), _) => description.push_str(&format!("🎵 Now playing: {}", track_link(track))),
        (None, state) => description.push_str(&format!("Player is {}", state)),
    }

    CreateEmbed::new()
        .title("Playback")
        .description(description)
        .color(COLOR_PLAYING)
}

pub fn create_queue_embed(snapshot: &SessionSnapshot) -> CreateEmbed {
    if snapshot.is_empty() {
        return CreateEmbed::new()
            .title("📭 Queue")
            .description("The queue is empty.")
            .color(COLOR_INFO);
    }

    CreateEmbed::new()
        .title("📜 Queue")
        .description(queue_lines(snapshot, QUEUE_PAGE).join("\n"))
        .footer(CreateEmbedFooter::new(format!(
            "{} tracks • {} • repeats from the top",
            snapshot.tracks.len(),
            state_label(snapshot.state)
        )))
        .color(COLOR_INFO)
}

pub fn create_info_embed(text: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new().description(text).color(COLOR_INFO)
}

pub fn create_error_embed(error: &PlaybackError) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(error_message(error))
        .color(COLOR_ERROR)
}

pub fn create_help_embed(prefix: &str) -> CreateEmbed {
    let mut embed = CreateEmbed::new().title("🎶 Commands").color(COLOR_INFO);
    for (usage, about) in HELP {
        embed = embed.field(format!("{prefix}{usage}"), *about, false);
    }
    embed
}

/// One line per track, the current one marked, windowed around the current position.
pub fn queue_lines(snapshot: &SessionSnapshot, limit: usize) -> Vec<String> {
    let total = snapshot.tracks.len();
    let start = snapshot
        .current_index
        .saturating_sub(limit / 2)
        .min(total.saturating_sub(limit));

    let mut lines: Vec<String> = snapshot
        .tracks
        .iter()
        .enumerate()
        .skip(start)
        .take(limit)
        .map(|(i, track)| {
            let marker = if i == snapshot.current_index { "▶️" } else { "▫️" };
            format!("{} `{}.` {}", marker, i + 1, track_link(track))
        })
        .collect();

    let hidden = total - lines.len();
    if hidden > 0 {
        lines.push(format!("… and {} more", hidden));
    }
    lines
}

/// User-facing text for a failed command.
pub fn error_message(error: &PlaybackError) -> String {
    match error {
        PlaybackError::InvalidTrack { url } => {
            format!("`{}` is not a supported link. Try a YouTube URL.", url)
        }
        PlaybackError::EmptyQueue => "Nothing to play, the queue is empty.".to_string(),
        PlaybackError::Connection(ConnectionError::NoChannel) => {
            "Join a voice channel first.".to_string()
        }
        PlaybackError::Connection(ConnectionError::Timeout(_)) => {
            "Could not connect to the voice channel in time. Try again.".to_string()
        }
        PlaybackError::Connection(e) => format!("Voice connection failed: {}", e),
        PlaybackError::Engine(_) => "The player could not handle that request.".to_string(),
    }
}

fn track_link(track: &Track) -> String {
    match track.title() {
        Some(title) => format!("[{}]({})", title, track.url()),
        None => track.url().to_string(),
    }
}

fn state_label(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Playing => "▶️ playing",
        PlaybackState::Paused => "⏸️ paused",
        PlaybackState::Idle => "💤 idle",
        PlaybackState::Disconnected => "🔌 disconnected",
    }
}
