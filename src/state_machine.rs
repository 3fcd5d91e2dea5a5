//! Round-trip state machine
//!
//! Elm-style: [`transition`] is pure and returns the next state plus the
//! effects the runtime must carry out. The machine is orthogonal to focus;
//! the user can scroll and browse cards while a round is in flight.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{RoundContext, RoundState};
pub use transition::{transition, TransitionError, TransitionResult};
