//! Effects produced by round transitions

use crate::display::{DisplayItem, TextKind};
use crate::session::{ToolRequest, Turn};

/// Effects to be executed after a transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a turn to the session ledger
    AppendTurn(Turn),

    /// Push an item onto the display stack
    Display(DisplayItem),

    /// Start an agent round over the current ledger (spawns a background task)
    RequestAgent,

    /// Run a batch of tool requests (one background task each)
    ExecuteTools(Vec<ToolRequest>),

    /// Persist the session
    SaveSession,
}

impl Effect {
    pub fn display(kind: TextKind, text: impl Into<String>) -> Self {
        Effect::Display(DisplayItem::text(kind, text))
    }
}
