//! # Word Duel Server Library
//!
//! This library provides the authoritative server for a password-gated,
//! two-player word guessing game. Clients connect over a stream, prove they
//! know the shared secret, discover each other, and challenge one another to
//! guess a secret word one letter (or one whole word) at a time.
//!
//! ## Core Responsibilities
//!
//! ### Connection Gateway
//! Every new connection is greeted and must answer with exactly one
//! `PASSWORD:<secret>` frame. A wrong answer ends the connection; a right one
//! earns a unique client id and access to the rest of the protocol.
//!
//! ### Match Engine
//! A challenge names an opponent, a secret word and a hint. The challenger
//! sets the puzzle and the responder guesses for the whole match. The
//! engine validates guesses, reveals letters, counts attempts and decides
//! who won.
//!
//! ## Architecture Design
//!
//! ### Single Coordinator
//! Connection tasks never touch shared state. They forward decoded traffic
//! to one coordinator task over a channel, and that task owns the client
//! roster and the match registry. All mutations therefore happen on one
//! serialized path, and no locks are needed.
//!
//! ### Id-Based Addressing
//! Matches refer to participants by client id. Outgoing frames are resolved
//! to a live connection through the roster at send time, so a client that
//! disconnects mid-match never leaves a stale transport behind.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Roster of authenticated clients: id allocation, registration, opponent
//! listing and frame delivery.
//!
//! ### Game Module (`game`)
//! Match state and the guess evaluation state machine.
//!
//! ### Match Manager Module (`match_manager`)
//! Registry of matches with monotonic id allocation.
//!
//! ### Router Module (`router`)
//! Decodes client frames and dispatches them to the roster or the engine.
//!
//! ### Network Module (`network`)
//! Listeners, the per-connection password gateway and the coordinator loop.
//!
//! ### Inspect Module (`inspect`)
//! Read-only HTTP endpoint listing every match as JSON.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         tcp_addr: "127.0.0.1:3000".to_string(),
//!         inspect_addr: Some("127.0.0.1:8080".to_string()),
//!         password: "hunter2".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod error;
pub mod game;
pub mod inspect;
pub mod match_manager;
pub mod network;
pub mod router;
