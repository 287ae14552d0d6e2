//! # Word Duel Client Library
//!
//! Line-oriented operator console for the word duel server. The operator
//! authenticates, lists opponents, challenges someone with a word and a hint,
//! and answers guess prompts when challenged.
//!
//! ## Module Organization
//!
//! ### Console Module (`console`)
//! Pure state machine deciding what to print, what to send and which prompt
//! comes next, given a server frame or a line of operator input.
//!
//! ### Network Module (`network`)
//! Connects to the server and shuttles lines between the socket, the
//! console and the terminal.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network;
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = network::connect("127.0.0.1:3000").await?;
//!     let stdin = BufReader::new(tokio::io::stdin());
//!     network::drive(stream, stdin, &mut tokio::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod console;
pub mod network;
