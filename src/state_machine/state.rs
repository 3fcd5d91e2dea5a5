//! Round state types

use crate::materializer::Materializer;
use crate::session::{ToolRequest, ToolResult};

/// Where the current round stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RoundState {
    /// Waiting for user input
    #[default]
    Ready,

    /// One agent request is in flight
    WaitingOnAgent,

    /// A batch of tool requests is running
    ///
    /// `completed[i]` holds the result for `requests[i]` once it arrives;
    /// results are buffered here so they reach the ledger in request order.
    ExecutingTools {
        requests: Vec<ToolRequest>,
        completed: Vec<Option<ToolResult>>,
    },
}

impl RoundState {
    pub fn executing(requests: Vec<ToolRequest>) -> Self {
        let completed = vec![None; requests.len()];
        RoundState::ExecutingTools {
            requests,
            completed,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RoundState::Ready)
    }

    /// Names of tools in the current batch that have not finished yet
    pub fn pending_tools(&self) -> Vec<&str> {
        match self {
            RoundState::ExecutingTools {
                requests,
                completed,
            } => requests
                .iter()
                .zip(completed)
                .filter(|(_, done)| done.is_none())
                .map(|(r, _)| r.tool_name.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Short status for the UI, `None` when idle
    pub fn status_line(&self) -> Option<String> {
        match self {
            RoundState::Ready => None,
            RoundState::WaitingOnAgent => Some("Thinking...".to_string()),
            RoundState::ExecutingTools { .. } => {
                Some(format!("Executing: {}...", self.pending_tools().join(", ")))
            }
        }
    }
}

/// Immutable inputs to the transition function
#[derive(Debug, Default)]
pub struct RoundContext {
    pub materializer: Materializer,
}

impl RoundContext {
    pub fn new(materializer: Materializer) -> Self {
        Self { materializer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(id: &str, name: &str) -> ToolRequest {
        ToolRequest::new(id, name, serde_json::Map::new())
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(RoundState::Ready.status_line(), None);
        assert_eq!(
            RoundState::WaitingOnAgent.status_line().as_deref(),
            Some("Thinking...")
        );

        let mut state = RoundState::executing(vec![req("1", "search_media"), req("2", "get_similar")]);
        assert_eq!(
            state.status_line().as_deref(),
            Some("Executing: search_media, get_similar...")
        );
        if let RoundState::ExecutingTools { completed, .. } = &mut state {
            completed[0] = Some(ToolResult::ok("1", "[]"));
        }
        assert_eq!(state.pending_tools(), vec!["get_similar"]);
    }
}
