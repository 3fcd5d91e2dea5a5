//! Pure round transition function

use super::{Effect, Event, RoundContext, RoundState};
use crate::agent::RoundOutcome;
use crate::display::TextKind;
use crate::session::{ToolResult, Turn};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: RoundState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: RoundState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Agent is busy, wait for the current round to finish")]
    AgentBusy,
    #[error("Nothing to send")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O
/// happens in the runtime when it executes the returned effects.
pub fn transition(
    state: &RoundState,
    context: &RoundContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Ready + UserSubmit -> WaitingOnAgent
        (RoundState::Ready, Event::UserSubmit { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            Ok(TransitionResult::new(RoundState::WaitingOnAgent)
                .with_effect(Effect::AppendTurn(Turn::user(text)))
                .with_effect(Effect::display(TextKind::User, text))
                .with_effect(Effect::RequestAgent))
        }

        (RoundState::WaitingOnAgent | RoundState::ExecutingTools { .. }, Event::UserSubmit { .. }) => {
            Err(TransitionError::AgentBusy)
        }

        // WaitingOnAgent + FinalAnswer -> Ready (round complete)
        (RoundState::WaitingOnAgent, Event::AgentReplied(RoundOutcome::FinalAnswer(text))) => {
            let display = (!text.trim().is_empty()).then(|| Effect::display(TextKind::Agent, &text));
            Ok(TransitionResult::new(RoundState::Ready)
                .with_effect(Effect::AppendTurn(Turn::agent(text, vec![])))
                .with_effects(display)
                .with_effect(Effect::SaveSession))
        }

        // WaitingOnAgent + ToolRequests -> ExecutingTools
        (
            RoundState::WaitingOnAgent,
            Event::AgentReplied(RoundOutcome::ToolRequests { text, requests }),
        ) => {
            if requests.is_empty() {
                return Err(TransitionError::InvalidTransition(
                    "tool round without requests".to_string(),
                ));
            }
            let said = (!text.trim().is_empty()).then(|| Effect::display(TextKind::Agent, &text));
            let calls: Vec<Effect> = requests
                .iter()
                .map(|r| Effect::display(TextKind::ToolCall, r.summary()))
                .collect();

            Ok(TransitionResult::new(RoundState::executing(requests.clone()))
                .with_effect(Effect::AppendTurn(Turn::agent(text, requests.clone())))
                .with_effects(said)
                .with_effects(calls)
                .with_effect(Effect::ExecuteTools(requests)))
        }

        // WaitingOnAgent + failure -> Ready; the ledger is left as it was
        (RoundState::WaitingOnAgent, Event::AgentFailed(error)) => {
            Ok(TransitionResult::new(RoundState::Ready)
                .with_effect(Effect::display(TextKind::Error, format!("Agent error: {error}")))
                .with_effect(Effect::SaveSession))
        }

        // ExecutingTools + ToolCompleted -> buffer, or loop back once the batch is whole
        (
            RoundState::ExecutingTools {
                requests,
                completed,
            },
            Event::ToolCompleted(result),
        ) => {
            let Some(idx) = requests.iter().position(|r| r.id == result.request_id) else {
                return Err(TransitionError::InvalidTransition(format!(
                    "result for unknown tool request '{}'",
                    result.request_id
                )));
            };
            if completed[idx].is_some() {
                return Err(TransitionError::InvalidTransition(format!(
                    "tool request '{}' already completed",
                    result.request_id
                )));
            }

            let mut completed = completed.clone();
            completed[idx] = Some(result);

            if completed.iter().any(Option::is_none) {
                return Ok(TransitionResult::new(RoundState::ExecutingTools {
                    requests: requests.clone(),
                    completed,
                }));
            }

            let results: Vec<ToolResult> = completed.into_iter().flatten().collect();
            let mut effects = Vec::with_capacity(results.len() * 2 + 2);
            for (request, result) in requests.iter().zip(results) {
                if let Some(item) = context.materializer.classify(&request.tool_name, &result) {
                    effects.push(Effect::Display(item));
                }
                effects.push(Effect::AppendTurn(Turn::tool_result(result)));
            }

            Ok(TransitionResult::new(RoundState::WaitingOnAgent)
                .with_effects(effects)
                .with_effect(Effect::SaveSession)
                .with_effect(Effect::RequestAgent))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} in state {state:?}"
        ))),
    }
}
