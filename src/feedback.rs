//! Bridges background channels onto the event loop.
//!
//! State transitions and hotkey activations originate on worker and hook
//! threads; the event loop proxy is how they wake the tao loop. Without a
//! loop (batch runs) the state stream is drained into the log instead.

use std::sync::mpsc::Receiver;
use std::thread;

use skriv_core::State;
use tao::event_loop::EventLoopProxy;
use tracing::debug;

use crate::event::AppEvent;
use crate::hotkey::Activation;

/// Forwards state transitions to the event loop until the machine drops.
pub fn spawn_state_forwarder(rx: Receiver<State>, proxy: EventLoopProxy<AppEvent>) {
    spawn_named("state-feedback", move || {
        for state in rx {
            if proxy.send_event(AppEvent::StateChanged(state)).is_err() {
                break;
            }
        }
    });
}

/// Forwards fired chords to the event loop until the hook drops.
pub fn spawn_activation_forwarder(rx: Receiver<Activation>, proxy: EventLoopProxy<AppEvent>) {
    spawn_named("activation-feedback", move || {
        for activation in rx {
            if proxy.send_event(AppEvent::Activation(activation)).is_err() {
                break;
            }
        }
    });
}

/// Headless drain so the feedback channel never piles up.
pub fn spawn_state_logger(rx: Receiver<State>) {
    spawn_named("state-feedback", move || {
        for state in rx {
            debug!(%state, "state");
        }
    });
}

fn spawn_named(name: &str, body: impl FnOnce() + Send + 'static) {
    // Forwarders are daemon-like; spawn failure here means the process is
    // in far deeper trouble than missing feedback.
    thread::Builder::new().name(name.into()).spawn(body).ok();
}
