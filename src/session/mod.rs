//! In-memory conversation history for one interactive session.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::settings::DEFAULT_MAX_TURNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Speaker label used in the plain-text transcript.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "你",
            Role::Assistant => "Chatbot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only turn list. Once `max_turns` is reached the oldest turns are dropped,
/// and a leading assistant turn goes with them so the transcript opens on a question.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: Uuid,
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
    evicted: usize,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl ConversationSession {
    /// `max_turns == 0` keeps every turn.
    pub fn new(max_turns: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            turns: VecDeque::new(),
            max_turns,
            evicted: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn append_turn(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push_back(ConversationTurn {
            role,
            content: content.into(),
            created_at: Utc::now(),
        });

        if self.max_turns > 0 {
            while self.turns.len() > self.max_turns {
                self.turns.pop_front();
                self.evicted += 1;
            }
            // an answer is never kept without its question
            while self.turns.front().is_some_and(|turn| turn.role == Role::Assistant) {
                self.turns.pop_front();
                self.evicted += 1;
            }
        }
    }

    /// Retained turns, oldest first.
    pub fn transcript(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn render_transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Number of turns dropped by retention so far.
    pub fn evicted(&self) -> usize {
        self.evicted
    }
}
