//! Chat runtime executor
//!
//! Owns every piece of in-process state (ledger, round state, focus, editor,
//! display stack) and mutates it only from the task that calls into it.
//! Agent rounds and tool calls run as spawned tasks that report back through
//! the event channel.

use super::traits::{SessionPersistence, ToolRunner};
use crate::agent::Coordinator;
use crate::display::{self, card_detail, DisplayItem, DisplayStack, TextKind};
use crate::editor::Editor;
use crate::focus::{navigate, Focus, NavEffect, NavEvent};
use crate::llm::ToolDefinition;
use crate::session::{Session, ToolRequest};
use crate::state_machine::{transition, Effect, Event, RoundContext, RoundState, TransitionError};
use std::sync::Arc;
use tokio::sync::mpsc;

const EVENT_CHANNEL_SIZE: usize = 64;
const INTERRUPTED: &str = "Error: interrupted before the tool finished";

/// Single-session chat runtime, generic over tool and storage implementations
pub struct ChatRuntime<T, P>
where
    T: ToolRunner + 'static,
    P: SessionPersistence,
{
    session: Session,
    state: RoundState,
    context: RoundContext,
    focus: Focus,
    editor: Editor,
    display: DisplayStack,
    coordinator: Coordinator,
    tools: Arc<T>,
    tool_definitions: Vec<ToolDefinition>,
    persistence: P,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
}

impl<T, P> ChatRuntime<T, P>
where
    T: ToolRunner + 'static,
    P: SessionPersistence,
{
    /// Build a runtime around a new or resumed session
    ///
    /// Requests left unanswered by an interrupted run are closed with error
    /// results, and the existing ledger is replayed into the display.
    pub fn new(
        mut session: Session,
        coordinator: Coordinator,
        tools: T,
        persistence: P,
        context: RoundContext,
    ) -> Self {
        let closed = session.close_outstanding(INTERRUPTED);
        if closed > 0 {
            tracing::info!(session = %session.id, closed, "Closed interrupted tool requests");
        }

        let mut display = DisplayStack::new();
        for item in display::replay(session.turns(), &context.materializer) {
            display.push(item, true);
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let tool_definitions = tools.definitions();

        Self {
            session,
            state: RoundState::Ready,
            context,
            focus: Focus::Input,
            editor: Editor::new(),
            display,
            coordinator,
            tools: Arc::new(tools),
            tool_definitions,
            persistence,
            event_rx,
            event_tx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn display(&self) -> &DisplayStack {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayStack {
        &mut self.display
    }

    pub fn model_id(&self) -> &str {
        self.coordinator.model_id()
    }

    /// Activity shown under the transcript, `None` when idle
    pub fn status_line(&self) -> Option<String> {
        self.state.status_line()
    }

    /// Push a system line into the transcript
    pub fn notice(&mut self, kind: TextKind, text: impl Into<String>) {
        self.push_display(DisplayItem::text(kind, text));
    }

    fn push_display(&mut self, item: DisplayItem) {
        self.display.push(item, self.focus.follows_output());
    }

    /// Wait for the next event from a background task
    pub async fn next_event(&mut self) -> Option<Event> {
        self.event_rx.recv().await
    }

    /// Submit text as if typed into the editor
    pub fn submit(&mut self, text: impl Into<String>) {
        self.process_event(Event::UserSubmit { text: text.into() });
    }

    /// Drive events until the round settles back in Ready
    #[cfg(test)]
    pub async fn run_until_ready(&mut self) {
        while !self.state.is_ready() {
            let Some(event) = self.next_event().await else {
                break;
            };
            self.process_event(event);
        }
    }

    /// Apply one focus/navigation event
    pub fn navigate(&mut self, event: NavEvent) {
        let result = navigate(self.focus, self.display.latest_card_group(), event);
        if result.focus != self.focus {
            tracing::debug!(from = ?self.focus, to = ?result.focus, "Focus changed");
        }
        self.focus = result.focus;

        for effect in result.effects {
            match effect {
                NavEffect::ScrollUp => self.display.viewport.scroll_up(1),
                NavEffect::ScrollDown => self.display.viewport.scroll_down(1),
                NavEffect::HalfPageUp => self.display.viewport.half_page_up(),
                NavEffect::HalfPageDown => self.display.viewport.half_page_down(),
                NavEffect::ScrollTop => self.display.viewport.top(),
                NavEffect::ScrollBottom => self.display.viewport.bottom(),
                NavEffect::Edit(op) => self.editor.apply(op),
                NavEffect::ExpandCard {
                    display_item_index,
                    card_index,
                } => {
                    if let Some(card) = self.display.card(display_item_index, card_index) {
                        let detail = card_detail(card);
                        self.push_display(DisplayItem::text(TextKind::System, detail));
                    }
                }
                NavEffect::SubmitInput => {
                    if self.editor.is_blank() {
                        continue;
                    }
                    if !self.state.is_ready() {
                        // Keep the draft; the round will finish eventually
                        self.notice(TextKind::System, TransitionError::AgentBusy.to_string());
                        continue;
                    }
                    let text = self.editor.take();
                    self.submit(text);
                }
            }
        }
    }

    /// Run one event through the state machine and execute its effects
    pub fn process_event(&mut self, event: Event) {
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e @ (TransitionError::AgentBusy | TransitionError::EmptyMessage)) => {
                self.notice(TextKind::System, e.to_string());
                return;
            }
            Err(e) => {
                // Late results from abandoned work land here
                tracing::warn!(error = %e, state = ?self.state, "Ignoring event");
                return;
            }
        };

        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendTurn(turn) => {
                if let Err(e) = self.session.append(turn) {
                    tracing::error!(session = %self.session.id, error = %e, "Ledger rejected turn");
                    self.notice(TextKind::Error, format!("Ledger error: {e}"));
                }
            }

            Effect::Display(item) => self.push_display(item),

            Effect::RequestAgent => self.spawn_agent_round(),

            Effect::ExecuteTools(requests) => {
                for request in requests {
                    self.spawn_tool(request);
                }
            }

            Effect::SaveSession => self.save(),
        }
    }

    fn spawn_agent_round(&self) {
        let coordinator = self.coordinator.clone();
        let turns = self.session.turns().to_vec();
        let tools = self.tool_definitions.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            tracing::info!(turns = turns.len(), "Making agent request (background)");
            let event = match coordinator.send_round(&turns, &tools).await {
                Ok(outcome) => Event::AgentReplied(outcome),
                Err(e) => {
                    tracing::warn!(error = %e, "Agent round failed");
                    Event::AgentFailed(e)
                }
            };
            let _ = event_tx.send(event).await;
        });
    }

    fn spawn_tool(&self, request: ToolRequest) {
        let tools = self.tools.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = tools.run(&request).await;
            let _ = event_tx.send(Event::ToolCompleted(result)).await;
        });
    }

    /// Persist the session; failures are shown, never fatal
    pub fn save(&mut self) {
        if self.session.is_empty() {
            return;
        }
        if let Err(e) = self.persistence.save(&self.session) {
            tracing::error!(session = %self.session.id, error = %e, "Failed to save session");
            self.notice(TextKind::Error, format!("Could not save session: {e}"));
        }
    }

    /// Save and hand back the session; in-flight work is abandoned
    pub fn quit(mut self) -> Session {
        if !self.state.is_ready() {
            tracing::info!(state = ?self.state, "Quitting with a round in flight");
        }
        self.save();
        self.session
    }
}
