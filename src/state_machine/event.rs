//! Events that drive a round

use crate::agent::{AgentError, RoundOutcome};
use crate::session::ToolResult;

/// Events that trigger round transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// User submitted text from the editor
    UserSubmit { text: String },

    /// The agent round finished
    AgentReplied(RoundOutcome),
    AgentFailed(AgentError),

    /// One tool request of the current batch finished
    ToolCompleted(ToolResult),
}
