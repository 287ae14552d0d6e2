//! Server error types.

use shared::{ClientId, MatchId, ProtocolError, ServerFrame};
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Errors raised while handling a single client request.
///
/// None of these are fatal to the connection; each one maps to an
/// `ERROR:<reason>` reply for the client that sent the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("opponent {0} not found")]
    OpponentNotFound(ClientId),

    #[error("match {0} does not exist")]
    InvalidMatchId(MatchId),

    #[error("client {guesser} may not guess in match {match_id}")]
    NotYourTurn { match_id: MatchId, guesser: ClientId },

    #[error("match {0} is already over")]
    MatchOver(MatchId),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl GameError {
    /// The frame sent back to the requester
    pub fn reply(&self) -> ServerFrame {
        let reason = match self {
            GameError::OpponentNotFound(_) => "Opponent not found",
            GameError::InvalidMatchId(_) => "Invalid Match ID",
            GameError::NotYourTurn { .. } => "Not your turn",
            GameError::MatchOver(_) => "Match is over",
            GameError::Protocol(ProtocolError::InvalidArgument(_)) => "Invalid argument",
            GameError::Protocol(_) => "Invalid request",
        };
        ServerFrame::error(reason)
    }
}

/// Errors that stop the server or one of its listeners
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("frame error: {0}")]
    Frame(#[from] LinesCodecError),

    #[error("connection idle for too long")]
    IdleTimeout,

    #[error("coordinator is no longer running")]
    ChannelClosed,
}
