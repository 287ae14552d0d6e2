//! Menu-driven console state machine
//!
//! [`Console`] turns server frames and operator input into [`Action`]s without
//! doing any I/O itself. The network layer performs the actions and shows the
//! current prompt.

use shared::{ClientFrame, ClientId, MatchId, Role, ServerFrame, MATCH_LOST, MATCH_WON};

pub const MENU: &str = "\n--- Menu ---\n1. List Opponents\n2. Challenge Someone\n3. Exit";

/// What the console is waiting for the operator to type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Password,
    Menu,
    OpponentId,
    Word { opponent_id: ClientId },
    Hint { opponent_id: ClientId, word: String },
    Guess { match_id: MatchId },
    /// Waiting on the server
    Idle,
}

impl Prompt {
    pub fn text(&self) -> Option<&'static str> {
        match self {
            Prompt::Password => Some("Enter password: "),
            Prompt::Menu => Some("Select an option: "),
            Prompt::OpponentId => Some("Enter opponent ID: "),
            Prompt::Word { .. } => Some("Enter word to guess: "),
            Prompt::Hint { .. } => Some("Enter word hint: "),
            Prompt::Guess { .. } => Some("Make a guess: "),
            Prompt::Idle => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Print(String),
    Send(ClientFrame),
    Exit,
}

#[derive(Debug)]
pub struct Console {
    prompt: Prompt,
    client_id: Option<ClientId>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            prompt: Prompt::Idle,
            client_id: None,
        }
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    /// Reacts to one frame from the server
    pub fn on_server_frame(&mut self, frame: ServerFrame) -> Vec<Action> {
        match frame {
            ServerFrame::Greeting => {
                self.prompt = Prompt::Password;
                vec![Action::Print(frame.to_string())]
            }
            ServerFrame::WrongPassword => {
                self.prompt = Prompt::Idle;
                vec![Action::Print(frame.to_string()), Action::Exit]
            }
            ServerFrame::Id(id) => {
                self.client_id = Some(id);
                self.show_menu(format!("Client ID assigned: {id}"))
            }
            ServerFrame::Opponents(ids) => {
                let listing = if ids.is_empty() {
                    "No opponents available".to_string()
                } else {
                    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                    format!("Available opponents: {}", ids.join(", "))
                };
                self.show_menu(listing)
            }
            ServerFrame::MatchConfirmed { match_id, role } => {
                let mut actions = vec![Action::Print(format!(
                    "Match confirmed. Match ID: {match_id}"
                ))];
                match role {
                    Role::Client => {
                        self.prompt = Prompt::Idle;
                        actions.push(Action::Print(
                            "You set the word. Waiting for your opponent to guess.".to_string(),
                        ));
                    }
                    Role::Opponent => {
                        actions.push(Action::Print("You are guessing.".to_string()));
                    }
                }
                actions
            }
            ServerFrame::MakeGuess(match_id) => {
                self.prompt = Prompt::Guess { match_id };
                Vec::new()
            }
            ServerFrame::Status(text) => {
                if text == MATCH_WON || text == MATCH_LOST {
                    self.show_menu(text)
                } else {
                    vec![Action::Print(text)]
                }
            }
            ServerFrame::Error(reason) => self.show_menu(format!("Server error: {reason}")),
        }
    }

    /// Reacts to one line typed by the operator
    pub fn on_input(&mut self, line: &str) -> Vec<Action> {
        let line = line.trim();

        match std::mem::replace(&mut self.prompt, Prompt::Idle) {
            Prompt::Password => vec![Action::Send(ClientFrame::Password {
                secret: line.to_string(),
            })],
            Prompt::Menu => match line {
                "1" => vec![Action::Send(ClientFrame::ListOpponents)],
                "2" => {
                    self.prompt = Prompt::OpponentId;
                    Vec::new()
                }
                "3" => vec![Action::Exit],
                _ => self.show_menu("Invalid option. Please try again."),
            },
            Prompt::OpponentId => match line.parse::<ClientId>() {
                Ok(opponent_id) => {
                    self.prompt = Prompt::Word { opponent_id };
                    Vec::new()
                }
                Err(_) => self.show_menu("Opponent ID must be a number."),
            },
            Prompt::Word { opponent_id } => {
                if line.is_empty() || line.contains(shared::FRAME_DELIMITER) {
                    self.prompt = Prompt::Word { opponent_id };
                    return vec![Action::Print(
                        "The word must be non-empty and must not contain ':'.".to_string(),
                    )];
                }
                self.prompt = Prompt::Hint {
                    opponent_id,
                    word: line.to_string(),
                };
                Vec::new()
            }
            Prompt::Hint { opponent_id, word } => vec![Action::Send(ClientFrame::RequestMatch {
                opponent_id,
                word,
                hint: line.to_string(),
            })],
            Prompt::Guess { match_id } => {
                if line.is_empty() {
                    self.prompt = Prompt::Guess { match_id };
                    return Vec::new();
                }
                vec![Action::Send(ClientFrame::Guess {
                    match_id,
                    guess: line.to_string(),
                })]
            }
            Prompt::Idle => vec![Action::Print("Waiting for the server...".to_string())],
        }
    }

    fn show_menu(&mut self, message: impl Into<String>) -> Vec<Action> {
        self.prompt = Prompt::Menu;
        vec![Action::Print(message.into()), Action::Print(MENU.to_string())]
    }
}
