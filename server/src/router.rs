//! Request dispatch for authenticated clients
//!
//! [`ProtocolRouter`] owns the client roster and the match registry. It is
//! driven from a single coordinator task, so every registry and match
//! mutation happens on one serialized path. Frames produced by the match
//! engine are delivered by resolving each recipient through the roster at
//! send time.

use crate::client_manager::{Client, ClientManager, Outbound};
use crate::error::GameError;
use crate::game::{MatchSummary, Outgoing};
use crate::match_manager::MatchManager;
use log::{debug, info};
use shared::{ClientFrame, ClientId, ProtocolError, ServerFrame};

#[derive(Debug, Default)]
pub struct ProtocolRouter {
    clients: ClientManager,
    matches: MatchManager,
}

impl ProtocolRouter {
    pub fn new() -> Self {
        Self {
            clients: ClientManager::new(),
            matches: MatchManager::new(),
        }
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn matches(&self) -> &MatchManager {
        &self.matches
    }

    /// Registers a freshly authenticated connection and tells it its id
    pub fn connect(&mut self, outbound: Outbound) -> ClientId {
        let client_id = self.clients.allocate_id(&mut rand::thread_rng());
        let registered = self.clients.register(Client::new(client_id, outbound));
        debug_assert!(registered, "allocated id {client_id} is already registered");
        self.clients.send(client_id, ServerFrame::Id(client_id));
        client_id
    }

    /// Removes a client and forfeits every live match it was part of
    pub fn disconnect(&mut self, client_id: ClientId) {
        if !self.clients.remove_client(client_id) {
            return;
        }

        let forfeits: Vec<Outgoing> = self
            .matches
            .active_matches_for(client_id)
            .flat_map(|m| m.forfeit(client_id))
            .collect();
        self.deliver(forfeits);
    }

    /// Handles one inbound line from an authenticated client
    pub fn handle_frame(&mut self, sender: ClientId, line: &str) {
        let outgoing = match self.route(sender, line) {
            Ok(outgoing) => outgoing,
            Err(e) => {
                debug!("Rejected request from client {}: {}", sender, e);
                vec![Outgoing::new(sender, e.reply())]
            }
        };
        self.deliver(outgoing);
    }

    /// Whether an idle client is holding up a live match
    pub fn holds_turn(&self, client_id: ClientId) -> bool {
        self.matches.holds_turn(client_id)
    }

    pub fn summaries(&self) -> Vec<MatchSummary> {
        self.matches.summaries()
    }

    fn route(&mut self, sender: ClientId, line: &str) -> Result<Vec<Outgoing>, GameError> {
        match ClientFrame::decode(line)? {
            ClientFrame::ListOpponents => Ok(vec![Outgoing::new(
                sender,
                ServerFrame::Opponents(self.clients.list_others(sender)),
            )]),
            ClientFrame::RequestMatch {
                opponent_id,
                word,
                hint,
            } => self.create_match(sender, opponent_id, &word, &hint),
            ClientFrame::Guess { match_id, guess } => {
                debug!("Guess from client {} in match {}", sender, match_id);
                self.matches
                    .get_mut(match_id)
                    .ok_or(GameError::InvalidMatchId(match_id))?
                    .apply_guess(sender, &guess)
            }
            ClientFrame::Password { .. } => {
                Err(ProtocolError::InvalidCommand("PASSWORD after authentication".to_string()).into())
            }
        }
    }

    fn create_match(
        &mut self,
        challenger: ClientId,
        opponent_id: ClientId,
        word: &str,
        hint: &str,
    ) -> Result<Vec<Outgoing>, GameError> {
        if opponent_id == challenger || !self.clients.contains(opponent_id) {
            return Err(GameError::OpponentNotFound(opponent_id));
        }

        let new_match = self
            .matches
            .create_match(challenger, opponent_id, word, hint);
        info!(
            "Client {} challenged client {} (match {})",
            challenger, opponent_id, new_match.id
        );
        Ok(new_match.confirm())
    }

    fn deliver(&self, outgoing: Vec<Outgoing>) {
        for Outgoing { to, frame } in outgoing {
            self.clients.send(to, frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchState;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn connect(router: &mut ProtocolRouter) -> (ClientId, UnboundedReceiver<ServerFrame>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = router.connect(tx);
        assert_eq!(rx.try_recv().ok(), Some(ServerFrame::Id(id)));
        (id, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerFrame>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            lines.push(frame.to_string());
        }
        lines
    }

    #[test]
    fn test_connect_assigns_distinct_ids() {
        let mut router = ProtocolRouter::new();
        let (a, _rx_a) = connect(&mut router);
        let (b, _rx_b) = connect(&mut router);

        assert_ne!(a, b);
        assert_eq!(router.clients().len(), 2);
    }

    #[test]
    fn test_list_opponents() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);
        let (b, _rx_b) = connect(&mut router);

        router.handle_frame(a, "LIST_OPPONENTS");
        assert_eq!(drain(&mut rx_a), vec![format!("OPPONENTS:{b}")]);
    }

    #[test]
    fn test_invalid_request() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);

        router.handle_frame(a, "DANCE");
        router.handle_frame(a, "PASSWORD:again");
        router.handle_frame(a, "GUESS:1");
        assert_eq!(
            drain(&mut rx_a),
            vec![
                "ERROR:Invalid request",
                "ERROR:Invalid request",
                "ERROR:Invalid request"
            ]
        );
    }

    #[test]
    fn test_non_numeric_ids_are_invalid_arguments() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);

        router.handle_frame(a, "REQUEST_MATCH:abc:apple:fruit");
        router.handle_frame(a, "GUESS:x:p");
        assert_eq!(
            drain(&mut rx_a),
            vec!["ERROR:Invalid argument", "ERROR:Invalid argument"]
        );
        assert!(router.matches().is_empty());
    }

    #[test]
    fn test_request_match_unknown_opponent() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);
        let unknown = a.wrapping_add(1).max(1);

        router.handle_frame(a, &format!("REQUEST_MATCH:{unknown}:apple:fruit"));
        assert_eq!(drain(&mut rx_a), vec!["ERROR:Opponent not found"]);
        assert!(router.matches().is_empty());
    }

    #[test]
    fn test_request_match_against_self() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);

        router.handle_frame(a, &format!("REQUEST_MATCH:{a}:apple:fruit"));
        assert_eq!(drain(&mut rx_a), vec!["ERROR:Opponent not found"]);
        assert!(router.matches().is_empty());
    }

    #[test]
    fn test_request_match_confirms_both_sides() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);
        let (b, mut rx_b) = connect(&mut router);

        router.handle_frame(a, &format!("REQUEST_MATCH:{b}:apple:fruit"));

        assert_eq!(drain(&mut rx_a), vec!["MATCH_CONFIRMED:1:CLIENT"]);
        assert_eq!(
            drain(&mut rx_b),
            vec!["MATCH_CONFIRMED:1:OPPONENT", "MAKE_GUESS:1"]
        );
        assert_eq!(router.matches().len(), 1);
    }

    #[test]
    fn test_guess_unknown_match() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);

        router.handle_frame(a, "GUESS:99:p");
        assert_eq!(drain(&mut rx_a), vec!["ERROR:Invalid Match ID"]);
    }

    #[test]
    fn test_full_match_flow() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);
        let (b, mut rx_b) = connect(&mut router);

        router.handle_frame(a, &format!("REQUEST_MATCH:{b}:apple:fruit"));
        drain(&mut rx_a);
        drain(&mut rx_b);

        router.handle_frame(b, "GUESS:1:p");
        assert_eq!(
            drain(&mut rx_b),
            vec![
                "Word hint: fruit. Word to guess: _____.",
                "p is correct, attempts remaining: 7. Word to guess: _pp__",
                "MAKE_GUESS:1",
            ]
        );
        assert_eq!(
            drain(&mut rx_a),
            vec!["p is correct, attempts remaining: 7. Word to guess: _pp__"]
        );

        router.handle_frame(a, "GUESS:1:e");
        assert_eq!(drain(&mut rx_a), vec!["ERROR:Not your turn"]);

        router.handle_frame(b, "GUESS:1:apple");
        assert_eq!(
            drain(&mut rx_b),
            vec!["Word hint: fruit. Word to guess: _pp__.", "Match WON"]
        );
        assert_eq!(drain(&mut rx_a), vec!["Match LOST"]);

        router.handle_frame(b, "GUESS:1:a");
        assert_eq!(drain(&mut rx_b), vec!["ERROR:Match is over"]);
    }

    #[test]
    fn test_disconnect_forfeits_live_matches() {
        let mut router = ProtocolRouter::new();
        let (a, mut rx_a) = connect(&mut router);
        let (b, _rx_b) = connect(&mut router);

        router.handle_frame(a, &format!("REQUEST_MATCH:{b}:apple:fruit"));
        drain(&mut rx_a);

        router.disconnect(b);
        assert_eq!(drain(&mut rx_a), vec!["Opponent disconnected", "Match WON"]);
        assert_eq!(router.summaries()[0].state, MatchState::Lost);
        assert_eq!(router.clients().list_others(a), Vec::<ClientId>::new());

        router.handle_frame(a, &format!("REQUEST_MATCH:{b}:pear:fruit"));
        assert_eq!(drain(&mut rx_a), vec!["ERROR:Opponent not found"]);
    }

    #[test]
    fn test_holds_turn_tracks_the_guesser() {
        let mut router = ProtocolRouter::new();
        let (a, _rx_a) = connect(&mut router);
        let (b, _rx_b) = connect(&mut router);
        assert!(!router.holds_turn(a));
        assert!(!router.holds_turn(b));

        router.handle_frame(a, &format!("REQUEST_MATCH:{b}:apple:fruit"));
        assert!(!router.holds_turn(a));
        assert!(router.holds_turn(b));

        router.handle_frame(b, "GUESS:1:apple");
        assert!(!router.holds_turn(b));
    }

    #[test]
    fn test_disconnect_unknown_client_is_noop() {
        let mut router = ProtocolRouter::new();
        router.disconnect(12345);
        assert!(router.clients().is_empty());
    }

    #[test]
    fn test_summaries_do_not_mutate() {
        let mut router = ProtocolRouter::new();
        let (a, _rx_a) = connect(&mut router);
        let (b, _rx_b) = connect(&mut router);
        router.handle_frame(a, &format!("REQUEST_MATCH:{b}:apple:fruit"));

        let first = router.summaries();
        let second = router.summaries();
        assert_eq!(first, second);
        assert_eq!(first[0].attempts, 8);
        assert_eq!(first[0].progress, "_____");
    }
}
