//! Match state and guess evaluation
//!
//! A match pairs a challenger, who sets a secret word and a hint, with a
//! responder, who guesses until the word is found or the attempts run out.
//! The responder holds the turn for the whole match.
//!
//! Every operation returns the frames it wants delivered as [`Outgoing`]
//! values instead of writing to a transport, so the rules can be exercised
//! without any I/O.

use crate::error::GameError;
use log::info;
use serde::Serialize;
use shared::{ClientId, MatchId, Role, ServerFrame, BLANK, MATCH_LOST, MATCH_WON};

/// Attempts granted on top of the word length
pub const EXTRA_ATTEMPTS: usize = 3;

/// A frame addressed to one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub to: ClientId,
    pub frame: ServerFrame,
}

impl Outgoing {
    pub fn new(to: ClientId, frame: ServerFrame) -> Self {
        Self { to, frame }
    }
}

/// Where a match is in its lifecycle.
///
/// `Won` and `Lost` are from the responder's side: `Won` means the word was
/// found, `Lost` means the challenger's word held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    Created,
    AwaitingFirstGuess,
    InProgress,
    Won,
    Lost,
}

impl MatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchState::Won | MatchState::Lost)
    }
}

/// Read-only view of a match for inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: MatchId,
    pub client_a: ClientId,
    pub client_b: ClientId,
    pub attempts: usize,
    pub hint: String,
    pub progress: String,
    pub state: MatchState,
}

#[derive(Debug, Clone)]
pub struct Match {
    pub id: MatchId,
    pub hint: String,
    pub challenger: ClientId,
    pub responder: ClientId,
    pub turn_holder: ClientId,
    secret: Vec<char>,
    revealed: Vec<bool>,
    attempts_remaining: usize,
    state: MatchState,
}

impl Match {
    pub fn new(
        id: MatchId,
        challenger: ClientId,
        responder: ClientId,
        word: &str,
        hint: &str,
    ) -> Self {
        let secret: Vec<char> = word.chars().collect();
        Self {
            id,
            hint: hint.to_string(),
            challenger,
            responder,
            turn_holder: responder,
            revealed: vec![false; secret.len()],
            attempts_remaining: secret.len() + EXTRA_ATTEMPTS,
            secret,
            state: MatchState::Created,
        }
    }

    pub fn progress(&self) -> String {
        self.secret
            .iter()
            .zip(&self.revealed)
            .map(|(c, shown)| if *shown { *c } else { BLANK })
            .collect()
    }

    pub fn attempts_remaining(&self) -> usize {
        self.attempts_remaining
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn is_participant(&self, client_id: ClientId) -> bool {
        client_id == self.challenger || client_id == self.responder
    }

    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            id: self.id,
            client_a: self.challenger,
            client_b: self.responder,
            attempts: self.attempts_remaining,
            hint: self.hint.clone(),
            progress: self.progress(),
            state: self.state,
        }
    }

    /// Confirms a freshly created match to both participants and prompts the
    /// responder for the first guess.
    pub fn confirm(&mut self) -> Vec<Outgoing> {
        self.state = MatchState::AwaitingFirstGuess;
        info!(
            "Match {} confirmed: client {} set a {}-letter word for client {}",
            self.id,
            self.challenger,
            self.secret.len(),
            self.responder
        );

        vec![
            Outgoing::new(
                self.challenger,
                ServerFrame::MatchConfirmed {
                    match_id: self.id,
                    role: Role::Client,
                },
            ),
            Outgoing::new(
                self.responder,
                ServerFrame::MatchConfirmed {
                    match_id: self.id,
                    role: Role::Opponent,
                },
            ),
            Outgoing::new(self.responder, ServerFrame::MakeGuess(self.id)),
        ]
    }

    /// Evaluates one guess from `guesser`.
    ///
    /// Order of checks: an exhausted budget ends the match as a loss
    /// whatever the guess is, even the exact word; a full-length guess ends
    /// the match either way; any other guess that is not a single letter is
    /// rejected without cost; a single letter costs one attempt and reveals
    /// every position holding it.
    pub fn apply_guess(
        &mut self,
        guesser: ClientId,
        guess: &str,
    ) -> Result<Vec<Outgoing>, GameError> {
        if self.state.is_terminal() {
            return Err(GameError::MatchOver(self.id));
        }
        if guesser != self.turn_holder {
            return Err(GameError::NotYourTurn {
                match_id: self.id,
                guesser,
            });
        }

        self.state = MatchState::InProgress;
        let guess_chars: Vec<char> = guess.chars().collect();
        let mut out = vec![self.to_responder(ServerFrame::status(format!(
            "Word hint: {}. Word to guess: {}.",
            self.hint,
            self.progress()
        )))];

        if self.attempts_remaining == 0 {
            self.finish(false, &mut out);
            return Ok(out);
        }

        if guess_chars.len() == self.secret.len() {
            let solved = guess_chars == self.secret;
            self.finish(solved, &mut out);
            return Ok(out);
        }

        let letter = match guess_chars.as_slice() {
            [letter] => *letter,
            _ => {
                let text = format!(
                    "{guess} is incorrect, only letters or full word guess are allowed"
                );
                self.notify_both(&text, &mut out);
                out.push(self.prompt());
                return Ok(out);
            }
        };

        self.attempts_remaining -= 1;
        let found = self.reveal(letter);
        let verdict = if found { "correct" } else { "incorrect" };
        let text = format!(
            "{letter} is {verdict}, attempts remaining: {}. Word to guess: {}",
            self.attempts_remaining,
            self.progress()
        );
        self.notify_both(&text, &mut out);

        if found && self.is_solved() {
            self.finish(true, &mut out);
        } else {
            out.push(self.prompt());
        }
        Ok(out)
    }

    /// Ends a live match because `leaver` disconnected; the remaining
    /// participant wins.
    pub fn forfeit(&mut self, leaver: ClientId) -> Vec<Outgoing> {
        if self.state.is_terminal() || !self.is_participant(leaver) {
            return Vec::new();
        }

        let (remaining, state) = if leaver == self.challenger {
            (self.responder, MatchState::Won)
        } else {
            (self.challenger, MatchState::Lost)
        };
        self.state = state;
        info!(
            "Match {} forfeited by client {}, client {} wins",
            self.id, leaver, remaining
        );

        vec![
            Outgoing::new(remaining, ServerFrame::status("Opponent disconnected")),
            Outgoing::new(remaining, ServerFrame::status(MATCH_WON)),
        ]
    }

    /// Marks every position holding `letter` as revealed.
    ///
    /// Returns whether any position matched; the first position counts like
    /// any other.
    fn reveal(&mut self, letter: char) -> bool {
        let mut found = false;
        for (c, shown) in self.secret.iter().zip(self.revealed.iter_mut()) {
            if *c == letter {
                *shown = true;
                found = true;
            }
        }
        found
    }

    fn is_solved(&self) -> bool {
        self.revealed.iter().all(|shown| *shown)
    }

    fn finish(&mut self, responder_won: bool, out: &mut Vec<Outgoing>) {
        let (challenger_line, responder_line, state) = if responder_won {
            (MATCH_LOST, MATCH_WON, MatchState::Won)
        } else {
            (MATCH_WON, MATCH_LOST, MatchState::Lost)
        };
        self.state = state;
        info!(
            "Match {} over: responder {} {}",
            self.id,
            self.responder,
            if responder_won { "won" } else { "lost" }
        );

        out.push(Outgoing::new(
            self.challenger,
            ServerFrame::status(challenger_line),
        ));
        out.push(Outgoing::new(
            self.responder,
            ServerFrame::status(responder_line),
        ));
    }

    fn notify_both(&self, text: &str, out: &mut Vec<Outgoing>) {
        out.push(Outgoing::new(self.challenger, ServerFrame::status(text)));
        out.push(Outgoing::new(self.responder, ServerFrame::status(text)));
    }

    fn prompt(&self) -> Outgoing {
        self.to_responder(ServerFrame::MakeGuess(self.id))
    }

    fn to_responder(&self, frame: ServerFrame) -> Outgoing {
        Outgoing::new(self.responder, frame)
    }
}
