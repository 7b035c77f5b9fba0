//! Interactive console session
//!
//! Per-provider chat histories and the provider-selection menu shown after
//! each answer. I/O lives in the `advisor` binary.

use crate::gateway::LlmGateway;
use crate::history::{ChatHistory, ChatTurn};
use crate::providers::ProviderOutcome;
use std::collections::HashMap;

/// Turns kept per provider history
pub const HISTORY_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Select(Selection),
    Continue,
    Exit,
    Invalid,
}

/// `exit` or `quit`, any case
pub fn is_exit_command(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}

pub struct ChatSession {
    providers: Vec<String>,
    histories: HashMap<String, ChatHistory>,
    selection: Selection,
}

impl ChatSession {
    pub fn new(gateway: &LlmGateway) -> Self {
        Self::with_providers(gateway.provider_names().into_iter().map(String::from).collect())
    }

    pub fn with_providers(providers: Vec<String>) -> Self {
        let histories = providers
            .iter()
            .map(|name| (name.clone(), ChatHistory::new()))
            .collect();

        Self {
            providers,
            histories,
            selection: Selection::All,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn history(&self, provider: &str) -> Option<&ChatHistory> {
        self.histories.get(provider)
    }

    pub fn is_selected(&self, provider: &str) -> bool {
        match self.selection {
            Selection::All => self.providers.iter().any(|p| p == provider),
            Selection::Only(index) => self.providers.get(index).is_some_and(|p| p == provider),
        }
    }

    /// History to send to `provider`, `None` when it is not selected
    pub fn history_for(&self, provider: &str) -> Option<Vec<ChatTurn>> {
        if !self.is_selected(provider) {
            return None;
        }
        self.histories
            .get(provider)
            .map(|history| history.turns().to_vec())
    }

    pub async fn ask(&self, gateway: &LlmGateway, query: &str) -> Vec<ProviderOutcome> {
        gateway.ask_each(query, |name| self.history_for(name)).await
    }

    /// Only real answers enter a provider's history
    pub fn record(&mut self, query: &str, outcomes: &[ProviderOutcome]) {
        for outcome in outcomes {
            let Ok(answer) = &outcome.result else {
                continue;
            };
            if let Some(history) = self.histories.get_mut(&outcome.provider) {
                history.record_exchange(query, answer);
                history.trim_to_recent(HISTORY_WINDOW);
            }
        }
    }

    /// Menu text for the current selection
    pub fn menu(&self) -> String {
        match self.selection {
            Selection::All => {
                let mut menu = String::from("Select which response you prefer:\n");
                for (i, name) in self.providers.iter().enumerate() {
                    menu.push_str(&format!("{}. {}\n", i + 1, name));
                }
                let n = self.providers.len();
                menu.push_str(&format!("{}. All\n{}. Exit\n", n + 1, n + 2));
                menu
            }
            Selection::Only(_) => "Type exit to quit, or press enter to continue\n".to_string(),
        }
    }

    pub fn parse_choice(&self, input: &str) -> MenuChoice {
        let input = input.trim();
        if is_exit_command(input) {
            return MenuChoice::Exit;
        }

        match self.selection {
            Selection::Only(_) if input.is_empty() => MenuChoice::Continue,
            Selection::Only(_) => MenuChoice::Invalid,
            Selection::All if input.eq_ignore_ascii_case("all") => {
                MenuChoice::Select(Selection::All)
            }
            Selection::All => {
                let n = self.providers.len();
                match input.parse::<usize>() {
                    Ok(i) if (1..=n).contains(&i) => MenuChoice::Select(Selection::Only(i - 1)),
                    Ok(i) if i == n + 1 => MenuChoice::Select(Selection::All),
                    Ok(i) if i == n + 2 => MenuChoice::Exit,
                    _ => MenuChoice::Invalid,
                }
            }
        }
    }

    pub fn select(&mut self, selection: Selection) {
        self.selection = selection;
    }
}
