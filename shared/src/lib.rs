//! Wire protocol shared by the word duel server and the console client.
//!
//! Every frame is a single line of colon-delimited text. Clients send
//! [`ClientFrame`]s, the server answers with [`ServerFrame`]s. Both sides
//! decode into these enums before acting on a line, so argument counts and
//! numeric ids are validated in exactly one place.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const FRAME_DELIMITER: char = ':';
pub const BLANK: char = '_';
/// Longest line, in bytes, either side accepts before dropping the peer
pub const MAX_FRAME_LENGTH: usize = 4096;

pub const GREETING: &str = "Hello, please enter your password";
pub const WRONG_PASSWORD: &str = "Wrong password. Disconnecting...";
pub const MATCH_WON: &str = "Match WON";
pub const MATCH_LOST: &str = "Match LOST";

pub type ClientId = u32;
pub type MatchId = u64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Unknown command token or wrong number of arguments
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    /// Right shape, unusable value (non-numeric id, empty word or guess)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A server line that claims a known tag but cannot be parsed
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

/// Which side of a match a participant plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The challenger; sets the word and hint
    Client,
    /// The responder; guesses for the whole match
    Opponent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Opponent => "OPPONENT",
        }
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLIENT" => Ok(Role::Client),
            "OPPONENT" => Ok(Role::Opponent),
            other => Err(ProtocolError::MalformedFrame(format!("unknown role {other}"))),
        }
    }
}

/// Frames sent from a client to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Password {
        secret: String,
    },
    ListOpponents,
    RequestMatch {
        opponent_id: ClientId,
        word: String,
        hint: String,
    },
    Guess {
        match_id: MatchId,
        guess: String,
    },
}

impl ClientFrame {
    /// Decodes one inbound line.
    ///
    /// Line terminators and surrounding whitespace are ignored. The hint of a
    /// `REQUEST_MATCH` is the rest of the line after the word, so it may
    /// contain the delimiter itself.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        let (command, rest) = match line.split_once(FRAME_DELIMITER) {
            Some((command, rest)) => (command, Some(rest)),
            None => (line, None),
        };

        match (command, rest) {
            ("PASSWORD", Some(secret)) => Ok(ClientFrame::Password {
                secret: secret.to_string(),
            }),
            ("LIST_OPPONENTS", None) | ("LIST_OPPONENTS", Some("")) => {
                Ok(ClientFrame::ListOpponents)
            }
            ("REQUEST_MATCH", Some(args)) => {
                let mut parts = args.splitn(3, FRAME_DELIMITER);
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(opponent), Some(word), Some(hint)) => {
                        let opponent_id = parse_id::<ClientId>(opponent, "opponent id")?;
                        if word.is_empty() {
                            return Err(ProtocolError::InvalidArgument(
                                "word must not be empty".to_string(),
                            ));
                        }
                        Ok(ClientFrame::RequestMatch {
                            opponent_id,
                            word: word.to_string(),
                            hint: hint.to_string(),
                        })
                    }
                    _ => Err(ProtocolError::InvalidCommand(line.to_string())),
                }
            }
            ("GUESS", Some(args)) => match args.split_once(FRAME_DELIMITER) {
                Some((match_id, guess)) => {
                    let match_id = parse_id::<MatchId>(match_id, "match id")?;
                    if guess.is_empty() {
                        return Err(ProtocolError::InvalidArgument(
                            "guess must not be empty".to_string(),
                        ));
                    }
                    Ok(ClientFrame::Guess {
                        match_id,
                        guess: guess.to_string(),
                    })
                }
                None => Err(ProtocolError::InvalidCommand(line.to_string())),
            },
            _ => Err(ProtocolError::InvalidCommand(line.to_string())),
        }
    }
}

fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ProtocolError> {
    raw.parse::<T>()
        .map_err(|_| ProtocolError::InvalidArgument(format!("{what} {raw:?} is not a number")))
}

impl fmt::Display for ClientFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientFrame::Password { secret } => write!(f, "PASSWORD:{secret}"),
            ClientFrame::ListOpponents => write!(f, "LIST_OPPONENTS"),
            ClientFrame::RequestMatch {
                opponent_id,
                word,
                hint,
            } => write!(f, "REQUEST_MATCH:{opponent_id}:{word}:{hint}"),
            ClientFrame::Guess { match_id, guess } => write!(f, "GUESS:{match_id}:{guess}"),
        }
    }
}

/// Frames sent from the server to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    Greeting,
    WrongPassword,
    Id(ClientId),
    Opponents(Vec<ClientId>),
    MatchConfirmed { match_id: MatchId, role: Role },
    MakeGuess(MatchId),
    /// Free-text progress and result lines
    Status(String),
    Error(String),
}

impl ServerFrame {
    pub fn status(text: impl Into<String>) -> Self {
        ServerFrame::Status(text.into())
    }

    pub fn error(reason: impl Into<String>) -> Self {
        ServerFrame::Error(reason.into())
    }
}

impl fmt::Display for ServerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerFrame::Greeting => f.write_str(GREETING),
            ServerFrame::WrongPassword => f.write_str(WRONG_PASSWORD),
            ServerFrame::Id(id) => write!(f, "ID:{id}"),
            ServerFrame::Opponents(ids) => {
                let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                write!(f, "OPPONENTS:{}", joined.join(","))
            }
            ServerFrame::MatchConfirmed { match_id, role } => {
                write!(f, "MATCH_CONFIRMED:{match_id}:{}", role.as_str())
            }
            ServerFrame::MakeGuess(match_id) => write!(f, "MAKE_GUESS:{match_id}"),
            ServerFrame::Status(text) => f.write_str(text),
            ServerFrame::Error(reason) => write!(f, "ERROR:{reason}"),
        }
    }
}

impl FromStr for ServerFrame {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == GREETING {
            return Ok(ServerFrame::Greeting);
        }
        if line == WRONG_PASSWORD {
            return Ok(ServerFrame::WrongPassword);
        }

        let malformed = || ProtocolError::MalformedFrame(line.to_string());
        let Some((tag, rest)) = line.split_once(FRAME_DELIMITER) else {
            return Ok(ServerFrame::Status(line.to_string()));
        };

        match tag {
            "ID" => rest.parse().map(ServerFrame::Id).map_err(|_| malformed()),
            "OPPONENTS" => {
                if rest.is_empty() {
                    return Ok(ServerFrame::Opponents(Vec::new()));
                }
                rest.split(',')
                    .map(|id| id.parse::<ClientId>())
                    .collect::<Result<Vec<_>, _>>()
                    .map(ServerFrame::Opponents)
                    .map_err(|_| malformed())
            }
            "MATCH_CONFIRMED" => {
                let (match_id, role) = rest.split_once(FRAME_DELIMITER).ok_or_else(malformed)?;
                Ok(ServerFrame::MatchConfirmed {
                    match_id: match_id.parse().map_err(|_| malformed())?,
                    role: role.parse()?,
                })
            }
            "MAKE_GUESS" => rest
                .parse()
                .map(ServerFrame::MakeGuess)
                .map_err(|_| malformed()),
            "ERROR" => Ok(ServerFrame::Error(rest.to_string())),
            _ => Ok(ServerFrame::Status(line.to_string())),
        }
    }
}
