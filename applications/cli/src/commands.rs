//! Line-oriented command language read from stdin

use cadence_core::{RepeatMode, SearchFocus, SearchHints, Selector, ShuffleMode, TrackId};
use cadence_playback::{Command, FocusChange, MediaButton};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const HELP: &str = "\
Playback:
  play [SELECTOR [FILTER...]]   play a collection, or resume without arguments
  shuffle-play SELECTOR         play a collection shuffled
  uri URL                       play file:// or cadence:SELECTOR
  search [artist:|album:|track:|genre:]QUERY
  recent SELECTOR | top SELECTOR
  pause | toggle | stop | next | prev | prepare
  goto ORDINAL                  jump to a queue entry
  seek SECONDS | seek MM:SS
Queue:
  repeat off|all|one | shuffle on|off
  move FROM TO | swap FROM TO | remove OFFSET   (offsets after the current entry)
  add-next ID... | add-later ID...
Other:
  fav | focus gain|loss|transient|duck | button NAME
  action NAME [JSON]            run a custom action, e.g. action FORWARD_30
  help | quit";

/// One parsed input line
#[derive(Debug, PartialEq)]
pub enum Input {
    Command(Command),
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("'{command}' expects {expected}")]
    Usage {
        command: &'static str,
        expected: &'static str,
    },

    #[error("invalid {what}: {value}")]
    Invalid { what: &'static str, value: String },
}

fn usage(command: &'static str, expected: &'static str) -> ParseError {
    ParseError::Usage { command, expected }
}

fn invalid(what: &'static str, value: &str) -> ParseError {
    ParseError::Invalid {
        what,
        value: value.to_string(),
    }
}

/// Parse one line of input
pub fn parse_line(line: &str) -> Result<Input, ParseError> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(Input::Empty),
        "help" | "?" => return Ok(Input::Help),
        "quit" | "exit" | "q" => return Ok(Input::Quit),

        "play" if args.is_empty() => Command::Play,
        "play" => Command::PlayFromSelection {
            selector: selector(args[0])?,
            filter: joined(&args[1..]),
        },
        "shuffle-play" => Command::PlayShuffled {
            selector: selector(first(&args, "shuffle-play", "a selector")?)?,
            filter: joined(args.get(1..).unwrap_or_default()),
        },
        "uri" => {
            let raw = first(&args, "uri", "a URL")?;
            Command::PlayFromUri(Url::parse(raw).map_err(|_| invalid("url", raw))?)
        }
        "search" => search(rest),
        "recent" => Command::PlayRecentlyAdded(selector(first(&args, "recent", "a selector")?)?),
        "top" => Command::PlayMostPlayed(selector(first(&args, "top", "a selector")?)?),
        "pause" => Command::Pause,
        "toggle" => Command::PlayPause,
        "stop" => Command::Stop,
        "next" => Command::SkipToNext,
        "prev" | "previous" => Command::SkipToPrevious,
        "prepare" => Command::Prepare { forced: true },
        "goto" => {
            let raw = first(&args, "goto", "a queue ordinal")?;
            Command::SkipToQueueItem(raw.parse().map_err(|_| invalid("ordinal", raw))?)
        }
        "seek" => Command::SeekTo(position(first(&args, "seek", "SECONDS or MM:SS")?)?),
        "repeat" => {
            let raw = first(&args, "repeat", "off, all or one")?;
            Command::SetRepeatMode(RepeatMode::parse(raw).ok_or_else(|| invalid("repeat mode", raw))?)
        }
        "shuffle" => {
            let raw = first(&args, "shuffle", "on or off")?;
            Command::SetShuffleMode(
                ShuffleMode::parse(raw).ok_or_else(|| invalid("shuffle mode", raw))?,
            )
        }
        "move" => {
            let (from, to) = pair(&args, "move")?;
            Command::MoveRelative { from, to }
        }
        "swap" => {
            let (from, to) = pair(&args, "swap")?;
            Command::SwapRelative { from, to }
        }
        "remove" => Command::RemoveRelative(offset(first(&args, "remove", "an offset")?)?),
        "add-next" => Command::AddToPlayNext(ids(&args, "add-next")?),
        "add-later" => Command::AddToPlayLater(ids(&args, "add-later")?),
        "fav" | "favorite" => Command::ToggleFavorite,
        "focus" => Command::AudioFocus(focus(first(&args, "focus", "gain, loss, transient or duck")?)?),
        "button" => {
            let raw = first(&args, "button", "a button name")?;
            Command::MediaButton(MediaButton::parse(raw).ok_or_else(|| invalid("button", raw))?)
        }
        "action" => action(rest)?,
        other => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(Input::Command(command))
}

fn first<'a>(
    args: &[&'a str],
    command: &'static str,
    expected: &'static str,
) -> Result<&'a str, ParseError> {
    args.first().copied().ok_or_else(|| usage(command, expected))
}

fn joined(args: &[&str]) -> Option<String> {
    (!args.is_empty()).then(|| args.join(" "))
}

fn selector(raw: &str) -> Result<Selector, ParseError> {
    raw.parse().map_err(|_| invalid("selector", raw))
}

fn offset(raw: &str) -> Result<usize, ParseError> {
    raw.parse().map_err(|_| invalid("offset", raw))
}

fn pair(args: &[&str], command: &'static str) -> Result<(usize, usize), ParseError> {
    match args {
        [from, to] => Ok((offset(from)?, offset(to)?)),
        _ => Err(usage(command, "two offsets")),
    }
}

fn ids(args: &[&str], command: &'static str) -> Result<Vec<TrackId>, ParseError> {
    if args.is_empty() {
        return Err(usage(command, "at least one track id"));
    }
    Ok(args.iter().map(|id| TrackId::new(*id)).collect())
}

/// `90`, `90.5` or `1:30`
fn position(raw: &str) -> Result<Duration, ParseError> {
    let seconds = match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u64 = minutes.parse().map_err(|_| invalid("position", raw))?;
            let seconds: f64 = seconds.parse().map_err(|_| invalid("position", raw))?;
            minutes as f64 * 60.0 + seconds
        }
        None => raw.parse().map_err(|_| invalid("position", raw))?,
    };
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid("position", raw))
}

fn focus(raw: &str) -> Result<FocusChange, ParseError> {
    match raw.to_ascii_lowercase().as_str() {
        "gain" => Ok(FocusChange::Gain),
        "loss" => Ok(FocusChange::Loss),
        "transient" => Ok(FocusChange::LossTransient),
        "duck" => Ok(FocusChange::Duck),
        _ => Err(invalid("focus change", raw)),
    }
}

fn search(rest: &str) -> Command {
    let (focus, query) = match rest.split_once(':') {
        Some((prefix, query)) => {
            let focus = match prefix.to_ascii_lowercase().as_str() {
                "artist" => Some(SearchFocus::Artist),
                "album" => Some(SearchFocus::Album),
                "track" | "title" => Some(SearchFocus::Track),
                "genre" => Some(SearchFocus::Genre),
                _ => None,
            };
            match focus {
                Some(focus) => (focus, query.trim()),
                None => (SearchFocus::Unstructured, rest),
            }
        }
        None if rest.is_empty() => (SearchFocus::Any, rest),
        None => (SearchFocus::Unstructured, rest),
    };

    Command::PlayFromSearch {
        query: query.to_string(),
        hints: SearchHints {
            focus,
            ..SearchHints::default()
        },
    }
}

fn action(rest: &str) -> Result<Command, ParseError> {
    let (name, extras) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, extras)| (name, extras.trim()));
    if name.is_empty() {
        return Err(usage("action", "an action name"));
    }

    let extras = if extras.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(extras).map_err(|_| invalid("extras JSON", extras))?
    };

    Ok(Command::CustomAction {
        name: name.to_ascii_uppercase(),
        extras,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::MediaCategory;
    use serde_json::json;

    fn command(line: &str) -> Command {
        match parse_line(line).unwrap() {
            Input::Command(command) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn blank_help_and_quit() {
        assert_eq!(parse_line("   ").unwrap(), Input::Empty);
        assert_eq!(parse_line("help").unwrap(), Input::Help);
        assert_eq!(parse_line("QUIT").unwrap(), Input::Quit);
    }

    #[test]
    fn play_without_arguments_resumes() {
        assert!(matches!(command("play"), Command::Play));
    }

    #[test]
    fn play_selection_with_filter() {
        match command("play artists/Band  live at home") {
            Command::PlayFromSelection { selector, filter } => {
                assert_eq!(selector.category, MediaCategory::Artists);
                assert_eq!(selector.value, "Band");
                assert_eq!(filter.as_deref(), Some("live at home"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_selector() {
        assert_eq!(
            parse_line("play nonsense/1").unwrap_err(),
            invalid("selector", "nonsense/1")
        );
    }

    #[test]
    fn seek_accepts_seconds_and_minutes() {
        assert!(matches!(command("seek 90"), Command::SeekTo(d) if d == Duration::from_secs(90)));
        assert!(matches!(command("seek 1:30"), Command::SeekTo(d) if d == Duration::from_secs(90)));
        assert!(parse_line("seek -3").is_err());
    }

    #[test]
    fn relative_queue_edits() {
        assert!(matches!(command("swap 0 2"), Command::SwapRelative { from: 0, to: 2 }));
        assert!(matches!(command("move 3 1"), Command::MoveRelative { from: 3, to: 1 }));
        assert!(matches!(command("remove 4"), Command::RemoveRelative(4)));
        assert_eq!(
            parse_line("swap 1").unwrap_err(),
            usage("swap", "two offsets")
        );
    }

    #[test]
    fn modes() {
        assert!(matches!(command("repeat one"), Command::SetRepeatMode(RepeatMode::One)));
        assert!(matches!(command("shuffle on"), Command::SetShuffleMode(ShuffleMode::On)));
        assert!(parse_line("repeat sometimes").is_err());
    }

    #[test]
    fn search_prefix_sets_focus() {
        match command("search artist: The Band") {
            Command::PlayFromSearch { query, hints } => {
                assert_eq!(query, "The Band");
                assert_eq!(hints.focus, SearchFocus::Artist);
            }
            other => panic!("unexpected {other:?}"),
        }
        match command("search") {
            Command::PlayFromSearch { query, hints } => {
                assert!(query.is_empty());
                assert_eq!(hints.focus, SearchFocus::Any);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn custom_action_with_extras() {
        match command(r#"action swap_relative {"from": 1, "to": 2}"#) {
            Command::CustomAction { name, extras } => {
                assert_eq!(name, "SWAP_RELATIVE");
                assert_eq!(extras, json!({"from": 1, "to": 2}));
            }
            other => panic!("unexpected {other:?}"),
        }
        match command("action FORWARD_30") {
            Command::CustomAction { extras, .. } => assert_eq!(extras, json!({})),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_line("dance").unwrap_err(),
            ParseError::Unknown("dance".to_string())
        );
    }
}
