//! Application events for the tao event loop.

use skriv_core::State;

use crate::hotkey::Activation;

/// Events injected into the tao event loop through its proxy. The proxy is
/// the only channel that wakes a waiting loop, so everything the loop must
/// react to arrives this way.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The coordinator state changed
    StateChanged(State),
    /// A hotkey chord fired
    Activation(Activation),
}
