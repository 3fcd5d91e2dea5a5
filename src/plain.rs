//! Non-interactive mode: one query, printed results
//!
//! Runs a single agent round with at most one batch of tool calls, then
//! prints the cards it produced followed by the agent's answer.

use crate::agent::{AgentError, Coordinator, RoundOutcome};
use crate::display::{stars, DisplayItem};
use crate::materializer::{MediaCard, Materializer};
use crate::media::{truncate_words, MediaKind};
use crate::runtime::ToolRunner;
use crate::session::{LedgerError, Session, Turn};
use std::io::{self, Write};
use thiserror::Error;

/// Upper bound for `-n`
pub const MAX_RESULTS: usize = 10;
const OVERVIEW_CHARS: usize = 150;

#[derive(Debug, Error)]
pub enum PlainError {
    #[error("Agent request failed: {0}")]
    Agent(#[from] AgentError),
    #[error("Conversation became inconsistent: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Could not write output: {0}")]
    Io(#[from] io::Error),
}

/// Answer `query` and print to `out`; returns the finished session
pub async fn run<T, W>(
    coordinator: &Coordinator,
    tools: &T,
    materializer: &Materializer,
    query: &str,
    limit: usize,
    out: &mut W,
) -> Result<Session, PlainError>
where
    T: ToolRunner + ?Sized,
    W: Write,
{
    let limit = limit.clamp(1, MAX_RESULTS);
    let definitions = tools.definitions();
    let mut session = Session::new();
    session.append(Turn::user(query))?;
    writeln!(out, "🎬 Searching for: {query}\n")?;

    let (text, requests) = match coordinator.send_round(session.turns(), &definitions).await? {
        RoundOutcome::FinalAnswer(text) => {
            session.append(Turn::agent(&text, vec![]))?;
            print_answer(out, &text)?;
            return Ok(session);
        }
        RoundOutcome::ToolRequests { text, requests } => (text, requests),
    };

    session.append(Turn::agent(&text, requests.clone()))?;
    for request in &requests {
        writeln!(out, "→ {}", request.summary())?;
    }

    let results = tools.run_batch(&requests).await;
    let mut cards = Vec::new();
    for (request, result) in requests.iter().zip(results) {
        match materializer.classify(&request.tool_name, &result) {
            Some(DisplayItem::Cards(group)) => cards.extend(group.cards),
            Some(DisplayItem::Text(block)) if result.is_error => writeln!(out, "✗ {}", block.text)?,
            _ => {}
        }
        session.append(Turn::tool_result(result))?;
    }
    writeln!(out)?;
    print_cards(out, &cards, limit)?;

    match coordinator.send_round(session.turns(), &definitions).await? {
        RoundOutcome::FinalAnswer(text) => {
            session.append(Turn::agent(&text, vec![]))?;
            print_answer(out, &text)?;
        }
        RoundOutcome::ToolRequests { text, requests } => {
            tracing::info!(requested = requests.len(), "Skipping further tool calls in plain mode");
            session.append(Turn::agent(&text, vec![]))?;
            print_answer(out, &text)?;
        }
    }
    Ok(session)
}

fn print_answer<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    writeln!(out, "{}", text.trim())
}

/// Numbered card list, at most `limit` entries
pub fn print_cards<W: Write>(out: &mut W, cards: &[MediaCard], limit: usize) -> io::Result<()> {
    for (i, card) in cards.iter().take(limit).enumerate() {
        let glyph = match card.media_type {
            MediaKind::Movie => "🎬",
            MediaKind::Show => "📺",
        };
        if card.year.is_empty() {
            writeln!(out, "{}. {glyph} {}", i + 1, card.title)?;
        } else {
            writeln!(out, "{}. {glyph} {} ({})", i + 1, card.title, card.year)?;
        }
        writeln!(out, "   {} {:.1}/10", stars(card.rating), card.rating)?;
        if !card.providers.is_empty() {
            writeln!(out, "   📍 {}", card.providers.join(", "))?;
        }
        if !card.rationale.is_empty() {
            writeln!(out, "   💡 {}", card.rationale)?;
        }
        if !card.overview.is_empty() {
            writeln!(out, "   {}", truncate_words(&card.overview, OVERVIEW_CHARS))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ContentBlock, LlmResponse, StopReason, Usage};
    use crate::runtime::testing::{MockLlm, MockToolRunner};
    use crate::session::Role;
    use serde_json::json;
    use std::sync::Arc;

    fn tool_call(id: &str, name: &str) -> LlmResponse {
        LlmResponse {
            content: vec![
                ContentBlock::text("Let me look."),
                ContentBlock::tool_use(id, name, json!({"genres": ["comedy"]})),
            ],
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }

    fn entries(n: usize) -> String {
        let items: Vec<_> = (0..n)
            .map(|i| json!({"id": i + 1, "title": format!("Film {i}"), "year": "1999", "media_type": "movie", "rating": 7.0}))
            .collect();
        serde_json::Value::Array(items).to_string()
    }

    async fn run_plain(llm: Arc<MockLlm>, tools: &MockToolRunner, limit: usize) -> (Session, String) {
        let coordinator = Coordinator::new(llm);
        let mut out = Vec::new();
        let session = run(
            &coordinator,
            tools,
            &Materializer::default(),
            "feel-good comedy from the 90s",
            limit,
            &mut out,
        )
        .await
        .unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let llm = Arc::new(MockLlm::new());
        llm.queue_response(LlmResponse::text_only("Try Groundhog Day."));
        let (session, out) = run_plain(llm, &MockToolRunner::new(), 5).await;

        assert_eq!(session.turns().len(), 2);
        assert!(out.starts_with("🎬 Searching for: feel-good comedy from the 90s"));
        assert!(out.ends_with("Try Groundhog Day.\n"));
    }

    #[tokio::test]
    async fn test_cards_limited_and_answer_printed() {
        let llm = Arc::new(MockLlm::new());
        llm.queue_response(tool_call("t1", "search_media"));
        llm.queue_response(LlmResponse::text_only("All crowd pleasers."));
        let tools = MockToolRunner::new().with_result("search_media", entries(6));
        let (session, out) = run_plain(llm, &tools, 3).await;

        assert!(out.contains("→ search_media"));
        assert!(out.contains("1. 🎬 Film 0 (1999)"));
        assert!(out.contains("3. 🎬 Film 2 (1999)"));
        assert!(!out.contains("Film 3"));
        assert!(out.contains("★★★★☆ 7.0/10"));
        assert!(out.trim_end().ends_with("All crowd pleasers."));

        let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, [Role::User, Role::Agent, Role::ToolResult, Role::Agent]);
    }

    #[tokio::test]
    async fn test_second_tool_round_is_not_executed() {
        let llm = Arc::new(MockLlm::new());
        llm.queue_response(tool_call("t1", "search_media"));
        llm.queue_response(tool_call("t2", "get_similar"));
        let tools = MockToolRunner::new()
            .with_result("search_media", entries(1))
            .with_result("get_similar", entries(1));
        let (session, _) = run_plain(llm, &tools, 10).await;

        assert_eq!(tools.recorded_calls().len(), 1);
        assert!(session.outstanding_requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_tool_is_reported() {
        let llm = Arc::new(MockLlm::new());
        llm.queue_response(tool_call("t1", "get_trakt_watchlist"));
        llm.queue_response(LlmResponse::text_only("Connect Trakt first."));
        let tools = MockToolRunner::new()
            .with_error("get_trakt_watchlist", "Error: Trakt is not configured.");
        let (_, out) = run_plain(llm, &tools, 10).await;

        assert!(out.contains("✗ get_trakt_watchlist: Error: Trakt is not configured."));
    }

    #[tokio::test]
    async fn test_agent_failure_propagates() {
        let llm = Arc::new(MockLlm::new());
        let coordinator = Coordinator::new(llm);
        let mut out = Vec::new();
        let err = run(
            &coordinator,
            &MockToolRunner::new(),
            &Materializer::default(),
            "anything",
            5,
            &mut out,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PlainError::Agent(AgentError::Transport(_))));
    }
}
