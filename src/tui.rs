//! Interactive terminal surface
//!
//! Terminal input is read on a dedicated blocking thread and forwarded over
//! a channel; the async loop multiplexes it with runtime events and redraws
//! after each one.

mod keys;
mod render;

use crate::runtime::{ChatRuntime, SessionPersistence, ToolRunner};
use crate::session::Session;
use crossterm::event::{self, Event as TermEvent, KeyEvent};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use keys::{map_key, KeyAction};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const INPUT_POLL: Duration = Duration::from_millis(100);

enum Input {
    Key(KeyEvent),
    Resize,
}

/// Restores the terminal on every exit path, including panics
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<(Self, Terminal<CrosstermBackend<Stdout>>)> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok((Self, terminal))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

fn spawn_input_reader(tx: mpsc::Sender<Input>, cancel: CancellationToken) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !cancel.is_cancelled() {
            match event::poll(INPUT_POLL) {
                Ok(false) => {}
                Ok(true) => {
                    let input = match event::read() {
                        Ok(TermEvent::Key(key)) => Input::Key(key),
                        Ok(TermEvent::Resize(..)) => Input::Resize,
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::error!(error = %e, "Terminal read failed");
                            break;
                        }
                    };
                    if tx.blocking_send(input).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Terminal poll failed");
                    break;
                }
            }
        }
    })
}

/// Run the interactive loop until the user quits
///
/// Returns the session as saved on the way out.
pub async fn run<T, P>(mut rt: ChatRuntime<T, P>) -> io::Result<Session>
where
    T: ToolRunner + 'static,
    P: SessionPersistence,
{
    let (guard, mut terminal) = TerminalGuard::enter()?;
    let cancel = CancellationToken::new();
    let (input_tx, mut input_rx) = mpsc::channel(64);
    let reader = spawn_input_reader(input_tx, cancel.clone());

    tracing::info!(session = %rt.session().id, model = %rt.model_id(), "Interactive session started");

    let result = event_loop(&mut rt, &mut terminal, &mut input_rx).await;

    cancel.cancel();
    let session = rt.quit();
    drop(terminal);
    drop(guard);
    if reader.join().is_err() {
        tracing::warn!("Input thread panicked");
    }
    tracing::info!(session = %session.id, turns = session.turns().len(), "Interactive session ended");

    result.map(|()| session)
}

async fn event_loop<T, P>(
    rt: &mut ChatRuntime<T, P>,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    input_rx: &mut mpsc::Receiver<Input>,
) -> io::Result<()>
where
    T: ToolRunner + 'static,
    P: SessionPersistence,
{
    loop {
        terminal.draw(|frame| render::draw(frame, rt))?;

        tokio::select! {
            Some(event) = rt.next_event() => rt.process_event(event),
            input = input_rx.recv() => match input {
                Some(Input::Key(key)) => match map_key(rt.focus(), key) {
                    Some(KeyAction::Quit) => return Ok(()),
                    Some(KeyAction::Nav(nav)) => rt.navigate(nav),
                    None => {}
                },
                Some(Input::Resize) => {}
                None => return Ok(()),
            },
        }
    }
}
