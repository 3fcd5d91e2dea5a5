//! Agent round-trip coordinator
//!
//! One call to [`Coordinator::send_round`] is one outbound request: the whole
//! ledger plus the tool catalog go out, and either a final answer or a batch
//! of tool requests comes back. There are no retries here; the caller decides
//! what a failure means for the round.

use crate::llm::{
    ContentBlock, LlmError, LlmMessage, LlmRequest, LlmService, MessageRole, SystemContent,
    ToolDefinition,
};
use crate::session::{Role, ToolRequest, Turn};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

pub const SYSTEM_PROMPT: &str = r#"You are cinechat, a movie and TV recommendation assistant running in the user's terminal.

Tools available to you:
- search_media: discover titles on TMDb by genre, year, rating, language, streaming service, actors or studios
- get_media_details: full information about one title
- get_streaming_providers: where a title can be streamed, rented or bought
- get_similar: titles similar to a known one
- search_by_title: look up a title the user names, to get its TMDb id
- get_trakt_watchlist / get_trakt_history: the user's Trakt watchlist and recent history, when connected
- generate_recommendations: free-form suggestions for moods and requests that filters cannot express

Guidelines:
1. Prefer search_media when the request maps onto concrete filters.
2. When the user names a title, call search_by_title first and then get_similar.
3. Mention where each title can be watched when you know it.
4. Use generate_recommendations for subjective or mood-based requests.

Answer with numbered lists, ratings out of 10 and one line on why each pick fits.
Keep it short. Ask a clarifying question when the request is ambiguous."#;

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Outcome of one agent round
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    FinalAnswer(String),
    /// Tool requests plus any text the agent said alongside them
    ToolRequests {
        text: String,
        requests: Vec<ToolRequest>,
    },
}

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error(transparent)]
    Transport(#[from] LlmError),
    #[error("agent protocol error: {0}")]
    Protocol(String),
}

/// Sends the ledger to the agent backend
#[derive(Clone)]
pub struct Coordinator {
    llm: Arc<dyn LlmService>,
    system_prompt: String,
    max_tokens: u32,
}

impl Coordinator {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Run exactly one agent round over the given turns
    pub async fn send_round(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<RoundOutcome, AgentError> {
        let request = LlmRequest {
            system: vec![SystemContent::cached(&self.system_prompt)],
            messages: build_messages(turns),
            tools: tools.to_vec(),
            max_tokens: Some(self.max_tokens),
        };

        let response = self.llm.complete(&request).await?;

        let mut seen = HashSet::new();
        let mut requests = Vec::new();
        for (id, name, input) in response.tool_uses() {
            if !seen.insert(id) {
                return Err(AgentError::Protocol(format!("duplicate tool request id '{id}'")));
            }
            let arguments = match input {
                Value::Object(map) => map.clone(),
                Value::Null => serde_json::Map::new(),
                other => {
                    return Err(AgentError::Protocol(format!(
                        "arguments for '{name}' are not an object: {other}"
                    )))
                }
            };
            requests.push(ToolRequest::new(id, name, arguments));
        }

        let text = response.text();
        tracing::debug!(
            stop_reason = ?response.stop_reason,
            tool_requests = requests.len(),
            "Agent round finished"
        );

        if requests.is_empty() {
            Ok(RoundOutcome::FinalAnswer(text))
        } else {
            Ok(RoundOutcome::ToolRequests { text, requests })
        }
    }
}

/// Translate ledger turns into provider-neutral messages
///
/// Consecutive messages with the same role are merged, so a batch of tool
/// results travels as one user message right after the agent turn that
/// asked for them.
pub fn build_messages(turns: &[Turn]) -> Vec<LlmMessage> {
    let mut messages: Vec<LlmMessage> = Vec::new();

    for turn in turns {
        let (role, blocks) = match turn.role {
            Role::User => (MessageRole::User, vec![ContentBlock::text(&turn.text)]),
            Role::Agent => {
                let mut blocks = Vec::new();
                if !turn.text.is_empty() {
                    blocks.push(ContentBlock::text(&turn.text));
                }
                blocks.extend(turn.tool_requests.iter().map(|r| {
                    ContentBlock::tool_use(&r.id, &r.tool_name, Value::Object(r.arguments.clone()))
                }));
                if blocks.is_empty() {
                    continue;
                }
                (MessageRole::Assistant, blocks)
            }
            Role::ToolResult => {
                let Some(result) = turn.as_tool_result() else {
                    continue;
                };
                (
                    MessageRole::User,
                    vec![ContentBlock::tool_result(
                        result.request_id,
                        result.payload,
                        result.is_error,
                    )],
                )
            }
        };

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(LlmMessage {
                role,
                content: blocks,
            }),
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmErrorKind, LlmResponse, StopReason, Usage};
    use crate::session::ToolResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedLlm {
        reply: Mutex<Option<Result<LlmResponse, LlmError>>>,
        seen: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        fn new(reply: Result<LlmResponse, LlmError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmService for ScriptedLlm {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(LlmError::unknown("no scripted reply")))
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    fn tool_response(blocks: Vec<ContentBlock>) -> LlmResponse {
        LlmResponse {
            content: blocks,
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }

    #[tokio::test]
    async fn test_final_answer() {
        let llm = ScriptedLlm::new(Ok(LlmResponse::text_only("Try Heat (1995).")));
        let coordinator = Coordinator::new(llm.clone());
        let outcome = coordinator
            .send_round(&[Turn::user("crime film?")], &[])
            .await
            .unwrap();
        assert_eq!(outcome, RoundOutcome::FinalAnswer("Try Heat (1995).".into()));

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 1);
        assert_eq!(seen[0].system[0].text, SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_empty_response_is_empty_final_answer() {
        let llm = ScriptedLlm::new(Ok(tool_response(vec![])));
        let outcome = Coordinator::new(llm)
            .send_round(&[Turn::user("hi")], &[])
            .await
            .unwrap();
        assert_eq!(outcome, RoundOutcome::FinalAnswer(String::new()));
    }

    #[tokio::test]
    async fn test_tool_requests_keep_order_and_text() {
        let llm = ScriptedLlm::new(Ok(tool_response(vec![
            ContentBlock::text("Let me look."),
            ContentBlock::tool_use("a", "search_media", json!({"genres": ["thriller"]})),
            ContentBlock::tool_use("b", "search_by_title", json!({"title": "Se7en"})),
        ])));
        let outcome = Coordinator::new(llm)
            .send_round(&[Turn::user("dark thriller")], &[])
            .await
            .unwrap();
        let RoundOutcome::ToolRequests { text, requests } = outcome else {
            panic!("expected tool requests");
        };
        assert_eq!(text, "Let me look.");
        let ids: Vec<&str> = requests.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(requests[0].arguments["genres"], json!(["thriller"]));
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_protocol_errors() {
        let llm = ScriptedLlm::new(Ok(tool_response(vec![
            ContentBlock::tool_use("x", "search_media", json!({})),
            ContentBlock::tool_use("x", "get_similar", json!({})),
        ])));
        let err = Coordinator::new(llm)
            .send_round(&[Turn::user("q")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_non_object_arguments_are_protocol_errors() {
        let llm = ScriptedLlm::new(Ok(tool_response(vec![ContentBlock::tool_use(
            "x",
            "search_media",
            json!("thriller"),
        )])));
        let err = Coordinator::new(llm)
            .send_round(&[Turn::user("q")], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not an object"));
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let llm = ScriptedLlm::new(Err(LlmError::rate_limit("slow down")));
        let err = Coordinator::new(llm)
            .send_round(&[Turn::user("q")], &[])
            .await
            .unwrap_err();
        let AgentError::Transport(inner) = err else {
            panic!("expected transport error");
        };
        assert_eq!(inner.kind, LlmErrorKind::RateLimit);
    }

    #[test]
    fn test_build_messages_merges_tool_results() {
        let requests = vec![
            ToolRequest::new("1", "search_media", serde_json::Map::new()),
            ToolRequest::new("2", "get_similar", serde_json::Map::new()),
        ];
        let turns = vec![
            Turn::user("find something"),
            Turn::agent("", requests),
            Turn::tool_result(ToolResult::ok("1", "[]")),
            Turn::tool_result(ToolResult::error("2", "Error: boom")),
            Turn::agent("Nothing found.", vec![]),
            Turn::agent("", vec![]),
            Turn::user("thanks"),
        ];
        let messages = build_messages(&turns);
        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(messages[1].content.len(), 2);
        assert_eq!(messages[2].content.len(), 2);
        assert_eq!(
            messages[2].content[1],
            ContentBlock::tool_result("2", "Error: boom", true)
        );
    }
}
