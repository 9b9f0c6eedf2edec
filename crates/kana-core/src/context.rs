//! In-memory conversation state: bounded turn history and session identity.
//!
//! The backend runs a single active conversation. The Gateway owns one
//! `ConversationContext` behind a mutex; concurrent requests serialize on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single entry in the conversation history. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded in-memory turn history plus session identity.
///
/// The session id is created lazily on the first turn and discarded on
/// reset; durable rows in the store keep the old id.
#[derive(Debug, Default)]
pub struct ConversationContext {
    session_id: Option<String>,
    turns: Vec<Turn>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session id for the active conversation, creating one if absent.
    pub fn ensure_session_id(&mut self) -> String {
        self.session_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }

    /// Append a turn. Turns are only ever appended, never mutated.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn::new(role, content));
    }

    /// The most recent `n` turns, oldest first — the window sent to the model.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// All turns of the active session, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// End the session: clear history and discard the identifier.
    /// A later turn gets a fresh identifier.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.session_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_created_lazily_and_stable() {
        let mut ctx = ConversationContext::new();
        let a = ctx.ensure_session_id();
        let b = ctx.ensure_session_id();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reset_discards_session_id() {
        let mut ctx = ConversationContext::new();
        let before = ctx.ensure_session_id();
        ctx.push(Role::User, "hi");
        ctx.reset();
        assert!(ctx.is_empty());
        let after = ctx.ensure_session_id();
        assert_ne!(before, after);
    }

    #[test]
    fn test_recent_bounds_the_window() {
        let mut ctx = ConversationContext::new();
        for i in 0..30 {
            ctx.push(Role::User, format!("m{i}"));
        }
        let window = ctx.recent(20);
        assert_eq!(window.len(), 20);
        assert_eq!(window[0].content, "m10");
        assert_eq!(window[19].content, "m29");
    }

    #[test]
    fn test_recent_smaller_than_window() {
        let mut ctx = ConversationContext::new();
        ctx.push(Role::User, "only");
        assert_eq!(ctx.recent(20).len(), 1);
    }
}
