//! Mock implementations for testing
//!
//! These mocks drive the runtime without network or disk I/O.

use super::traits::*;
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, ToolDefinition};
use crate::session::{Session, ToolRequest, ToolResult};
use crate::session_store::SessionStoreError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock LLM
// ============================================================================

/// Agent backend that replays queued responses
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Option<Duration>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Tool Runner
// ============================================================================

/// Canned outcome for one tool name
#[derive(Clone)]
enum Canned {
    Ok(String),
    Err(String),
}

/// Tool runner with per-tool payloads and delays
///
/// Clones share recorded calls, so a test can keep a handle after moving
/// one into the runtime.
#[derive(Clone, Default)]
pub struct MockToolRunner {
    outcomes: HashMap<String, Canned>,
    delays: HashMap<String, Duration>,
    calls: Arc<Mutex<Vec<ToolRequest>>>,
    completed: Arc<Mutex<Vec<String>>>,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, tool: &str, payload: impl Into<String>) -> Self {
        self.outcomes.insert(tool.to_string(), Canned::Ok(payload.into()));
        self
    }

    pub fn with_error(mut self, tool: &str, message: impl Into<String>) -> Self {
        self.outcomes.insert(tool.to_string(), Canned::Err(message.into()));
        self
    }

    pub fn with_delay(mut self, tool: &str, delay: Duration) -> Self {
        self.delays.insert(tool.to_string(), delay);
        self
    }

    pub fn recorded_calls(&self) -> Vec<ToolRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Request ids in the order their runs finished
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn run(&self, request: &ToolRequest) -> ToolResult {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delays.get(&request.tool_name) {
            tokio::time::sleep(*delay).await;
        }
        let result = match self.outcomes.get(&request.tool_name) {
            Some(Canned::Ok(payload)) => ToolResult::ok(&request.id, payload.clone()),
            Some(Canned::Err(message)) => ToolResult::error(&request.id, message.clone()),
            None => ToolResult::error(&request.id, format!("Unknown tool: {}", request.tool_name)),
        };
        self.completed.lock().unwrap().push(request.id.clone());
        result
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut names: Vec<&String> = self.outcomes.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| ToolDefinition {
                name: name.clone(),
                description: format!("Mock {name}"),
                input_schema: serde_json::json!({ "type": "object", "properties": {} }),
            })
            .collect()
    }
}

// ============================================================================
// In-memory persistence
// ============================================================================

/// Keeps every saved snapshot in memory
#[derive(Default)]
pub struct MemoryPersistence {
    saved: Mutex<Vec<Session>>,
    fail: bool,
}

impl MemoryPersistence {
    /// Persistence whose every save fails
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<Session> {
        self.saved.lock().unwrap().last().cloned()
    }
}

impl SessionPersistence for MemoryPersistence {
    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        if self.fail {
            return Err(SessionStoreError::Io {
                path: "memory".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.saved.lock().unwrap().push(session.clone());
        Ok(())
    }
}
