//! Property-based tests for the round state machine

use super::transition::*;
use super::*;
use crate::agent::{AgentError, RoundOutcome};
use crate::llm::LlmError;
use crate::session::{Role, Session, ToolRequest, ToolResult};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn arb_tool_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("search_media".to_string()),
        Just("get_similar".to_string()),
        Just("get_trakt_watchlist".to_string()),
        Just("get_media_details".to_string()),
        "[a-z_]{3,12}",
    ]
}

/// Batch of requests with unique ids
fn arb_requests() -> impl Strategy<Value = Vec<ToolRequest>> {
    prop::collection::vec(arb_tool_name(), 1..6).prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| ToolRequest::new(format!("toolu_{i}"), name, serde_json::Map::new()))
            .collect()
    })
}

fn arb_payload() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(r#"[{"title": "Heat", "rating": 8.3}]"#.to_string()),
        Just(r#"{"summary": "s", "recommendations": [{"title": "Up"}]}"#.to_string()),
        "[a-zA-Z0-9 ]{0,40}",
    ]
}

/// A batch plus the order in which its results come back
fn arb_batch_with_completion_order() -> impl Strategy<Value = (Vec<ToolRequest>, Vec<usize>)> {
    arb_requests().prop_flat_map(|requests| {
        let order: Vec<usize> = (0..requests.len()).collect();
        (Just(requests), Just(order).prop_shuffle())
    })
}

fn arb_state() -> impl Strategy<Value = RoundState> {
    prop_oneof![
        Just(RoundState::Ready),
        Just(RoundState::WaitingOnAgent),
        arb_requests().prop_map(RoundState::executing),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|text| Event::UserSubmit { text }),
        "[a-z ]{0,20}".prop_map(|t| Event::AgentReplied(RoundOutcome::FinalAnswer(t))),
        arb_requests().prop_map(|requests| Event::AgentReplied(RoundOutcome::ToolRequests {
            text: String::new(),
            requests
        })),
        Just(Event::AgentFailed(AgentError::Transport(LlmError::server_error("503")))),
        Just(Event::AgentFailed(AgentError::Protocol("duplicate id".into()))),
        ("toolu_[0-9]", any::<bool>(), arb_payload()).prop_map(|(id, is_error, payload)| {
            Event::ToolCompleted(ToolResult {
                request_id: id,
                payload,
                is_error,
            })
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Results reach the ledger in request order whatever order they finish in
    #[test]
    fn prop_results_follow_request_order(
        (requests, order) in arb_batch_with_completion_order(),
        payloads in prop::collection::vec(arb_payload(), 6),
    ) {
        let ctx = RoundContext::default();
        let mut state = RoundState::executing(requests.clone());
        let mut appended = Vec::new();

        for (step, idx) in order.iter().enumerate() {
            let result = ToolResult::ok(&requests[*idx].id, payloads[*idx].clone());
            let out = transition(&state, &ctx, Event::ToolCompleted(result)).unwrap();
            let last = step + 1 == order.len();
            if last {
                prop_assert_eq!(&out.new_state, &RoundState::WaitingOnAgent);
                prop_assert_eq!(out.effects.last(), Some(&Effect::RequestAgent));
            } else {
                prop_assert!(out.effects.is_empty());
            }
            appended.extend(out.effects.into_iter().filter_map(|e| match e {
                Effect::AppendTurn(t) => t.result_request_id,
                _ => None,
            }));
            state = out.new_state;
        }

        let expected: Vec<String> = requests.iter().map(|r| r.id.clone()).collect();
        prop_assert_eq!(appended, expected);
    }

    /// RequestAgent is only ever emitted on the way into WaitingOnAgent
    #[test]
    fn prop_agent_requested_only_when_waiting(state in arb_state(), event in arb_event()) {
        if let Ok(out) = transition(&state, &RoundContext::default(), event) {
            let requests_agent = out.effects.iter().any(|e| matches!(e, Effect::RequestAgent));
            if requests_agent {
                prop_assert_eq!(&out.new_state, &RoundState::WaitingOnAgent);
            }
            let executes = out.effects.iter().any(|e| matches!(e, Effect::ExecuteTools(_)));
            if executes {
                let is_executing = matches!(out.new_state, RoundState::ExecutingTools { .. });
                prop_assert!(is_executing);
            }
        }
    }

    /// Submissions are accepted only from Ready
    #[test]
    fn prop_busy_rejects_submit(state in arb_state(), text in "[a-z]{1,10}") {
        let result = transition(&state, &RoundContext::default(), Event::UserSubmit { text });
        if state.is_ready() {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.unwrap_err(), TransitionError::AgentBusy);
        }
    }

    /// Appending the effects of any accepted event sequence keeps the ledger valid
    #[test]
    fn prop_effects_keep_ledger_consistent(events in prop::collection::vec(arb_event(), 0..40)) {
        let ctx = RoundContext::default();
        let mut state = RoundState::Ready;
        let mut session = Session::new();

        for event in events {
            let Ok(out) = transition(&state, &ctx, event) else {
                continue;
            };
            for effect in out.effects {
                if let Effect::AppendTurn(turn) = effect {
                    prop_assert!(session.append(turn).is_ok());
                }
            }
            state = out.new_state;
        }

        if state.is_ready() {
            prop_assert!(session.outstanding_requests().is_empty());
        }
        let user_turns = session.turns().iter().filter(|t| t.role == Role::User).count();
        prop_assert!(user_turns <= session.turns().len());
    }
}
