//! Domain types with their own text representation

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::decode::FromField;

/// A value that does not belong to a domain type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseTextError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseTextError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Implement [`FromField`] for a type through its `FromStr`
macro_rules! text_field {
    ($t:ty, $kind:literal) => {
        impl FromField for $t {
            const KIND: &'static str = $kind;

            fn from_field(raw: &str) -> std::result::Result<Self, String> {
                raw.parse::<$t>().map_err(|e| e.to_string())
            }
        }
    };
}

// ============================================================================
// Log level
// ============================================================================

/// One of the four levels used by the server log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Error = 1,
    Warning = 2,
    Debug = 3,
    Info = 4,
}

impl FromStr for LogLevel {
    type Err = ParseTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" | "1" => Ok(LogLevel::Error),
            "warning" | "2" => Ok(LogLevel::Warning),
            "debug" | "3" => Ok(LogLevel::Debug),
            "info" | "4" => Ok(LogLevel::Info),
            _ => Err(ParseTextError::new("log level", s)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
        }
    }
}

text_field!(LogLevel, "log level");

// ============================================================================
// Voice codec
// ============================================================================

/// Voice codec of a channel, sent as its numeric id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Codec {
    SpeexNarrowband = 0,
    SpeexWideband = 1,
    SpeexUltrawideband = 2,
    CeltMono = 3,
    OpusVoice = 4,
    OpusMusic = 5,
}

impl Codec {
    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Codec::SpeexNarrowband => "Speex Narrowband",
            Codec::SpeexWideband => "Speex Wideband",
            Codec::SpeexUltrawideband => "Speex Ultrawideband",
            Codec::CeltMono => "Celt Mono",
            Codec::OpusVoice => "Opus Voice",
            Codec::OpusMusic => "Opus Music",
        }
    }
}

impl FromStr for Codec {
    type Err = ParseTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Codec::SpeexNarrowband),
            "1" => Ok(Codec::SpeexWideband),
            "2" => Ok(Codec::SpeexUltrawideband),
            "3" => Ok(Codec::CeltMono),
            "4" => Ok(Codec::OpusVoice),
            "5" => Ok(Codec::OpusMusic),
            _ => Err(ParseTextError::new("codec", s)),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

text_field!(Codec, "codec");

// ============================================================================
// Group list
// ============================================================================

/// Comma separated list of group ids, e.g. `client_servergroups=6,8`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupList(pub Vec<u32>);

impl GroupList {
    pub fn contains(&self, group: u32) -> bool {
        self.0.contains(&group)
    }

    pub fn iter(&self) -> impl Iterator<Item = &u32> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for GroupList {
    type Err = ParseTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(GroupList::default());
        }
        s.split(',')
            .map(|g| {
                g.trim()
                    .parse::<u32>()
                    .map_err(|_| ParseTextError::new("group list", s))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(GroupList)
    }
}

impl fmt::Display for GroupList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, g) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", g)?;
        }
        Ok(())
    }
}

text_field!(GroupList, "group list");

// ============================================================================
// Reason
// ============================================================================

/// Why a client or channel changed, sent as `reasonid`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reason {
    MovedItself = 0,
    Moved = 1,
    Timeout = 3,
    KickedFromChannel = 4,
    KickedFromServer = 5,
    Banned = 6,
    Left = 8,
    Edited = 10,
    ServerShutdown = 11,
}

impl FromStr for Reason {
    type Err = ParseTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Reason::MovedItself),
            "1" => Ok(Reason::Moved),
            "3" => Ok(Reason::Timeout),
            "4" => Ok(Reason::KickedFromChannel),
            "5" => Ok(Reason::KickedFromServer),
            "6" => Ok(Reason::Banned),
            "8" => Ok(Reason::Left),
            "10" => Ok(Reason::Edited),
            "11" => Ok(Reason::ServerShutdown),
            _ => Err(ParseTextError::new("reason", s)),
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Reason::MovedItself => "Moved itself",
            Reason::Moved => "Moved",
            Reason::Timeout => "Timeout",
            Reason::KickedFromChannel => "Kicked from channel",
            Reason::KickedFromServer => "Kicked from server",
            Reason::Banned => "Banned",
            Reason::Left => "Left",
            Reason::Edited => "Edited",
            Reason::ServerShutdown => "Server shutdown",
        };
        f.write_str(text)
    }
}

text_field!(Reason, "reason");

// ============================================================================
// API key scope
// ============================================================================

/// Permission scope of a web query API key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Manage,
    Write,
    Read,
    /// A scope this client does not know about
    Other(String),
}

impl FromStr for Scope {
    type Err = ParseTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "manage" => Scope::Manage,
            "write" => Scope::Write,
            "read" => Scope::Read,
            other => Scope::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Manage => f.write_str("manage"),
            Scope::Write => f.write_str("write"),
            Scope::Read => f.write_str("read"),
            Scope::Other(s) => f.write_str(s),
        }
    }
}

text_field!(Scope, "scope");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!(LogLevel::Debug.to_string(), "DEBUG");
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(LogLevel::Error < LogLevel::Info);
    }

    #[test]
    fn test_codec() {
        assert_eq!(Codec::from_field("4"), Ok(Codec::OpusVoice));
        assert_eq!(Codec::OpusMusic.to_string(), "Opus Music");
        assert_eq!(Codec::CeltMono.id(), 3);
        assert_eq!(
            Codec::from_field("9").unwrap_err(),
            "invalid codec: \"9\""
        );
    }

    #[test]
    fn test_group_list() {
        let list = GroupList::from_field("6,8,12").unwrap();
        assert_eq!(list, GroupList(vec![6, 8, 12]));
        assert!(list.contains(8));
        assert_eq!(list.to_string(), "6,8,12");
        assert!(GroupList::from_field("").unwrap().is_empty());
        assert!(GroupList::from_field("6,x").is_err());
    }

    #[test]
    fn test_reason() {
        assert_eq!("5".parse::<Reason>(), Ok(Reason::KickedFromServer));
        assert_eq!(Reason::ServerShutdown.to_string(), "Server shutdown");
        assert!("2".parse::<Reason>().is_err());
    }

    #[test]
    fn test_scope() {
        assert_eq!("manage".parse::<Scope>(), Ok(Scope::Manage));
        assert_eq!(
            "custom".parse::<Scope>(),
            Ok(Scope::Other("custom".to_string()))
        );
    }
}
