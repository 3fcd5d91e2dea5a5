//! Runtime for driving a chat session
//!
//! Executes the effects produced by the round state machine and feeds
//! background results back in as events.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use traits::*;
