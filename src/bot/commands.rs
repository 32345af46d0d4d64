/// Prefix commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play { url: Option<String> },
    Stop,
    Skip,
    Queue,
    Purge,
    Help,
}

impl Command {
    /// Parses the text after the prefix, e.g. `play https://youtu.be/...`.
    ///
    /// Returns `None` for anything that is not a known command.
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let name = parts.next()?.to_lowercase();

        let command = match name.as_str() {
            "play" | "p" => Self::Play {
                url: parts.next().map(|u| u.trim_matches(|c| c == '<' || c == '>').to_string()),
            },
            "stop" | "pause" => Self::Stop,
            "skip" | "next" => Self::Skip,
            "queue" | "q" => Self::Queue,
            "purge" | "clear" => Self::Purge,
            "help" => Self::Help,
            _ => return None,
        };

        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Stop => "stop",
            Self::Skip => "skip",
            Self::Queue => "queue",
            Self::Purge => "purge",
            Self::Help => "help",
        }
    }
}

/// Usage lines for the help reply.
pub const HELP: &[(&str, &str)] = &[
    ("play [url]", "Queue a track and start or resume playback"),
    ("stop", "Pause playback"),
    ("skip", "Jump to the next track"),
    ("queue", "Show the queue"),
    ("purge", "Empty the queue and stop playback"),
];
