use crate::ring::KeyAction;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Focus(usize),
    PointerDown(Option<f64>),
    PointerMove(Option<f64>),
    PointerUp,
    PointerCancel,
    Key(KeyAction),
    KeyRelease,
    Resize(f64),
    Visibility { section: usize, ratio: f64 },
    ConfigReload,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}'")]
    Unknown(String),
    #[error("Missing argument for '{0}'")]
    MissingArgument(&'static str),
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Unknown key '{0}'")]
    UnknownKey(String),
    #[error("Unexpected trailing input '{0}'")]
    Trailing(String),
}

fn number<T: FromStr>(raw: &str) -> Result<T, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

fn required<'a>(
    verb: &'static str,
    arg: Option<&'a str>,
) -> Result<&'a str, CommandError> {
    arg.ok_or(CommandError::MissingArgument(verb))
}

impl FromStr for AppEvent {
    type Err = CommandError;

    /// Parses one line of the control protocol, e.g. `down 120` or `visible 1 0.4`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();

        let event = match verb.as_str() {
            "focus" => AppEvent::Focus(number(required("focus", words.next())?)?),
            "down" => AppEvent::PointerDown(words.next().map(number).transpose()?),
            "move" => AppEvent::PointerMove(words.next().map(number).transpose()?),
            "up" => AppEvent::PointerUp,
            "cancel" => AppEvent::PointerCancel,
            "key" => {
                let raw = required("key", words.next())?;
                AppEvent::Key(
                    raw.parse()
                        .map_err(|_| CommandError::UnknownKey(raw.to_string()))?,
                )
            }
            "keyup" => AppEvent::KeyRelease,
            "resize" => AppEvent::Resize(number(required("resize", words.next())?)?),
            "visible" => AppEvent::Visibility {
                section: number(required("visible", words.next())?)?,
                ratio: number(required("visible", words.next())?)?,
            },
            "reload" => AppEvent::ConfigReload,
            _ => return Err(CommandError::Unknown(verb)),
        };

        let rest: Vec<&str> = words.collect();
        if !rest.is_empty() {
            return Err(CommandError::Trailing(rest.join(" ")));
        }
        Ok(event)
    }
}

impl fmt::Display for AppEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEvent::Focus(i) => write!(f, "focus {i}"),
            AppEvent::PointerDown(Some(x)) => write!(f, "down {x}"),
            AppEvent::PointerDown(None) => write!(f, "down"),
            AppEvent::PointerMove(Some(x)) => write!(f, "move {x}"),
            AppEvent::PointerMove(None) => write!(f, "move"),
            AppEvent::PointerUp => write!(f, "up"),
            AppEvent::PointerCancel => write!(f, "cancel"),
            AppEvent::Key(key) => write!(f, "key {key}"),
            AppEvent::KeyRelease => write!(f, "keyup"),
            AppEvent::Resize(width) => write!(f, "resize {width}"),
            AppEvent::Visibility { section, ratio } => write!(f, "visible {section} {ratio}"),
            AppEvent::ConfigReload => write!(f, "reload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cases = vec![
            ("focus 2", AppEvent::Focus(2)),
            ("down 120.5", AppEvent::PointerDown(Some(120.5))),
            ("DOWN", AppEvent::PointerDown(None)),
            ("move -40", AppEvent::PointerMove(Some(-40.0))),
            ("  up  ", AppEvent::PointerUp),
            ("cancel", AppEvent::PointerCancel),
            ("key ArrowLeft", AppEvent::Key(KeyAction::Retreat)),
            ("key right", AppEvent::Key(KeyAction::Advance)),
            ("keyup", AppEvent::KeyRelease),
            ("resize 700", AppEvent::Resize(700.0)),
            (
                "visible 1 0.4",
                AppEvent::Visibility {
                    section: 1,
                    ratio: 0.4,
                },
            ),
            ("reload", AppEvent::ConfigReload),
        ];

        for (line, expected) in cases {
            assert_eq!(line.parse::<AppEvent>().unwrap(), expected, "{line}");
        }
    }

    #[test]
    fn test_parse_errors() {
        let cases = vec![
            ("", CommandError::Empty),
            ("spin 4", CommandError::Unknown("spin".to_string())),
            ("focus", CommandError::MissingArgument("focus")),
            ("focus -1", CommandError::InvalidNumber("-1".to_string())),
            ("down left", CommandError::InvalidNumber("left".to_string())),
            ("key up", CommandError::UnknownKey("up".to_string())),
            ("visible 1", CommandError::MissingArgument("visible")),
            ("up now", CommandError::Trailing("now".to_string())),
            ("cancel 5", CommandError::Trailing("5".to_string())),
            ("keyup left", CommandError::Trailing("left".to_string())),
            ("reload foo bar", CommandError::Trailing("foo bar".to_string())),
            ("down 1 2", CommandError::Trailing("2".to_string())),
            ("visible 0 0.5 1", CommandError::Trailing("1".to_string())),
        ];

        for (line, expected) in cases {
            assert_eq!(line.parse::<AppEvent>().unwrap_err(), expected, "{line}");
        }
    }

    #[test]
    fn test_display_parses_back() {
        let events = vec![
            AppEvent::Focus(3),
            AppEvent::PointerDown(Some(-12.25)),
            AppEvent::PointerMove(None),
            AppEvent::Key(KeyAction::Advance),
            AppEvent::Resize(1280.0),
            AppEvent::Visibility {
                section: 0,
                ratio: 0.15,
            },
        ];

        for event in events {
            assert_eq!(event.to_string().parse::<AppEvent>().unwrap(), event);
        }
    }
}
