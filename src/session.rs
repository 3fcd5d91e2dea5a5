//! Conversation ledger
//!
//! A [`Session`] owns the ordered, append-only turn history that is replayed
//! to the agent every round. [`Session::append`] is the only mutator and it
//! enforces tool-result pairing: every result answers a request from the most
//! recent agent turn, and no new user or agent turn lands while requests are
//! still outstanding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

pub const MAX_TITLE_CHARS: usize = 50;
const TRUNCATION_MARKER: &str = "...";

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    ToolResult,
}

/// A tool invocation requested by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Compact one-line rendering used in the transcript, e.g.
    /// `search_media(genres: ["thriller"])`
    pub fn summary(&self) -> String {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}: {s}"),
                other => format!("{k}: {other}"),
            })
            .collect();
        format!("{}({})", self.tool_name, args.join(", "))
    }
}

/// Outcome of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub request_id: String,
    pub payload: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(request_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            payload: payload.into(),
            is_error: false,
        }
    }

    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            payload: message.into(),
            is_error: true,
        }
    }
}

/// One entry of the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_requests: Vec<ToolRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::bare(Role::User, text.into())
    }

    pub fn agent(text: impl Into<String>, tool_requests: Vec<ToolRequest>) -> Self {
        Self {
            tool_requests,
            ..Self::bare(Role::Agent, text.into())
        }
    }

    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            result_request_id: Some(result.request_id),
            is_error: result.is_error,
            ..Self::bare(Role::ToolResult, result.payload)
        }
    }

    fn bare(role: Role, text: String) -> Self {
        Self {
            role,
            text,
            tool_requests: Vec::new(),
            result_request_id: None,
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// The result carried by a `ToolResult` turn
    pub fn as_tool_result(&self) -> Option<ToolResult> {
        match (self.role, &self.result_request_id) {
            (Role::ToolResult, Some(id)) => Some(ToolResult {
                request_id: id.clone(),
                payload: self.text.clone(),
                is_error: self.is_error,
            }),
            _ => None,
        }
    }
}

/// Ledger invariant violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("tool result for '{0}' does not answer any request from the latest agent turn")]
    UnexpectedToolResult(String),
    #[error("tool request '{0}' already has a result")]
    DuplicateToolResult(String),
    #[error("{0} tool request(s) still awaiting results")]
    OutstandingRequests(usize),
    #[error("tool result turn is missing its request id")]
    MissingRequestId,
}

/// One interactive conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    turns: Vec<Turn>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            title: String::new(),
            turns: Vec::new(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn, stamping it and refreshing `updated_at`.
    ///
    /// The first non-blank user turn names the session when no title is set.
    pub fn append(&mut self, mut turn: Turn) -> Result<(), LedgerError> {
        self.check_pairing(&turn)?;

        let now = Utc::now();
        turn.timestamp = now;
        self.updated_at = now;

        if turn.role == Role::User && self.title.is_empty() && !turn.text.trim().is_empty() {
            self.title = derive_title(&turn.text);
        }

        self.turns.push(turn);
        Ok(())
    }

    fn check_pairing(&self, turn: &Turn) -> Result<(), LedgerError> {
        match turn.role {
            Role::User | Role::Agent => {
                let outstanding = self.outstanding_requests().len();
                if outstanding > 0 {
                    return Err(LedgerError::OutstandingRequests(outstanding));
                }
            }
            Role::ToolResult => {
                let id = turn
                    .result_request_id
                    .as_deref()
                    .ok_or(LedgerError::MissingRequestId)?;
                let (requested, answered) = self.latest_round();
                if !requested.iter().any(|r| r.id == id) {
                    return Err(LedgerError::UnexpectedToolResult(id.to_string()));
                }
                if answered.contains(id) {
                    return Err(LedgerError::DuplicateToolResult(id.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Requests of the latest agent turn plus the ids already answered after it
    fn latest_round(&self) -> (&[ToolRequest], HashSet<&str>) {
        let Some(agent_idx) = self.turns.iter().rposition(|t| t.role == Role::Agent) else {
            return (&[], HashSet::new());
        };
        let answered = self.turns[agent_idx + 1..]
            .iter()
            .filter_map(|t| t.result_request_id.as_deref())
            .collect();
        (&self.turns[agent_idx].tool_requests, answered)
    }

    /// Requests from the latest agent turn that have no result yet
    pub fn outstanding_requests(&self) -> Vec<&ToolRequest> {
        let (requested, answered) = self.latest_round();
        requested
            .iter()
            .filter(|r| !answered.contains(r.id.as_str()))
            .collect()
    }

    /// Answer every outstanding request with an error result.
    ///
    /// A session saved mid-round (quit while tools ran) would otherwise
    /// refuse the next user turn after being resumed.
    pub fn close_outstanding(&mut self, reason: &str) -> usize {
        let pending: Vec<String> = self
            .outstanding_requests()
            .into_iter()
            .map(|r| r.id.clone())
            .collect();
        for id in &pending {
            tracing::warn!(session = %self.id, request = %id, "Closing interrupted tool request");
            if let Err(e) = self.append(Turn::tool_result(ToolResult::error(id.clone(), reason))) {
                tracing::error!(session = %self.id, request = %id, error = %e, "Could not close tool request");
            }
        }
        pending.len()
    }
}

/// Derive a short session title from the first user message.
///
/// Whitespace is collapsed; anything longer than [`MAX_TITLE_CHARS`] is cut
/// back to a word boundary (when one exists past the midpoint) and marked with
/// `...`. Applying it to its own output is a no-op.
pub fn derive_title(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_TITLE_CHARS {
        return collapsed;
    }

    let budget = MAX_TITLE_CHARS - TRUNCATION_MARKER.len();
    let head: Vec<char> = collapsed.chars().take(budget).collect();
    let cut = head
        .iter()
        .rposition(|c| *c == ' ')
        .filter(|idx| *idx > budget / 2)
        .unwrap_or(head.len());

    let mut title: String = head[..cut].iter().collect();
    title.truncate(title.trim_end().len());
    title.push_str(TRUNCATION_MARKER);
    title
}
