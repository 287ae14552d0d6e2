//! Registry of every match created since the server started.
//!
//! Ids are handed out from a counter starting at 1 and are never reused.
//! Finished matches stay registered so they remain visible to inspection.

use crate::game::{Match, MatchSummary};
use shared::{ClientId, MatchId};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct MatchManager {
    matches: BTreeMap<MatchId, Match>,
    next_match_id: MatchId,
}

impl Default for MatchManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchManager {
    pub fn new() -> Self {
        Self {
            matches: BTreeMap::new(),
            next_match_id: 1,
        }
    }

    /// Allocates an id and stores a new match in the `Created` state
    pub fn create_match(
        &mut self,
        challenger: ClientId,
        responder: ClientId,
        word: &str,
        hint: &str,
    ) -> &mut Match {
        let match_id = self.next_match_id;
        self.next_match_id += 1;

        self.matches
            .entry(match_id)
            .or_insert_with(|| Match::new(match_id, challenger, responder, word, hint))
    }

    pub fn get_mut(&mut self, match_id: MatchId) -> Option<&mut Match> {
        self.matches.get_mut(&match_id)
    }

    /// Live matches the client takes part in
    pub fn active_matches_for(&mut self, client_id: ClientId) -> impl Iterator<Item = &mut Match> {
        self.matches
            .values_mut()
            .filter(move |m| !m.state().is_terminal() && m.is_participant(client_id))
    }

    /// Whether some live match is waiting on `client_id` to guess
    pub fn holds_turn(&self, client_id: ClientId) -> bool {
        self.matches
            .values()
            .any(|m| !m.state().is_terminal() && m.turn_holder == client_id)
    }

    /// Snapshot of every match, ordered by id
    pub fn summaries(&self) -> Vec<MatchSummary> {
        self.matches.values().map(Match::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
