//! Command surface exposed to the messaging collaborator
//!
//! One value per operator command, plus the reply templates handed back for
//! rendering. Parsing accepts the `!`, `/` and `.` prefixes and the short
//! aliases operators are used to.

use crate::error::{Error, Result};
use std::fmt;

/// Prefixes that mark a line as a command
pub const COMMAND_PREFIXES: &[char] = &['!', '/', '.'];

/// An operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `play <query>` or bare `play` (start the wave)
    Play(Option<String>),
    Skip,
    Stop,
    Pause,
    Resume,
    Replay,
    SetVolume(u16),
    Join,
    Leave,
    Rejoin,
    NowPlaying,
}

impl Command {
    /// Parse an operator line
    ///
    /// Returns `None` for lines without a command prefix. A `volume`
    /// argument that is missing or not a number yields
    /// [`Error::InvalidVolume`]; range validation happens in the
    /// controller.
    pub fn parse(line: &str) -> Option<Result<Self>> {
        let line = line.trim();
        let rest = COMMAND_PREFIXES
            .iter()
            .find_map(|p| line.strip_prefix(*p))?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let command = match name {
            "play" | "p" => Self::Play(arg),
            "skip" | "s" | "next" | "x" => Self::Skip,
            "stop" => Self::Stop,
            // No single-letter alias for pause: "p" is taken by play.
            "pause" => Self::Pause,
            "resume" | "rs" => Self::Resume,
            "replay" | "rp" => Self::Replay,
            "volume" | "v" => match arg.as_deref().and_then(|a| a.parse::<u16>().ok()) {
                Some(volume) => Self::SetVolume(volume),
                None => return Some(Err(Error::InvalidVolume)),
            },
            "join" | "j" => Self::Join,
            "leave" | "l" => Self::Leave,
            "rejoin" | "rj" => Self::Rejoin,
            "now_playing" | "np" => Self::NowPlaying,
            other => return Some(Err(Error::other(format!("unknown command: {other}")))),
        };

        Some(Ok(command))
    }
}

/// User-facing status replies; the messaging collaborator renders these
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The personal wave is starting
    PlayingWave,
    /// A queried track is being downloaded and converted
    Downloading { title: String },
    /// What the session is currently playing
    NowPlaying { title: String },
    VolumeChanged { volume: u16 },
    Joined,
    Left,
    Rejoined,
    OnReplay,
    Skipped,
    Stopped,
    Paused,
    Resumed,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayingWave => write!(f, "Playing my wave..."),
            Self::Downloading { title } => write!(f, "Downloading {title}..."),
            Self::NowPlaying { title } => write!(f, "Now playing: {title}"),
            Self::VolumeChanged { volume } => write!(f, "Volume changed to {volume}%!"),
            Self::Joined => write!(f, "Joined!"),
            Self::Left => write!(f, "Left!"),
            Self::Rejoined => write!(f, "Rejoined!"),
            Self::OnReplay => write!(f, "On replay!"),
            Self::Skipped => write!(f, "Skipped!"),
            Self::Stopped => write!(f, "Stopped!"),
            Self::Paused => write!(f, "Paused!"),
            Self::Resumed => write!(f, "Resumed!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_play_with_query() {
        let cmd = Command::parse("!play daft punk").unwrap().unwrap();
        assert_eq!(cmd, Command::Play(Some("daft punk".to_string())));
    }

    #[test]
    fn parses_bare_play_as_wave() {
        let cmd = Command::parse("/p").unwrap().unwrap();
        assert_eq!(cmd, Command::Play(None));
    }

    #[test]
    fn parses_aliases_and_prefixes() {
        assert_eq!(Command::parse(".x").unwrap().unwrap(), Command::Skip);
        assert_eq!(Command::parse("!rj").unwrap().unwrap(), Command::Rejoin);
        assert_eq!(
            Command::parse("/np").unwrap().unwrap(),
            Command::NowPlaying
        );
    }

    #[test]
    fn non_command_lines_are_ignored() {
        assert!(Command::parse("hello there").is_none());
        assert!(Command::parse("").is_none());
    }

    #[test]
    fn volume_requires_a_number() {
        assert_eq!(
            Command::parse("!volume 150").unwrap().unwrap(),
            Command::SetVolume(150)
        );
        assert!(matches!(
            Command::parse("!volume abc").unwrap(),
            Err(Error::InvalidVolume)
        ));
        assert!(matches!(
            Command::parse("!v").unwrap(),
            Err(Error::InvalidVolume)
        ));
    }
}
