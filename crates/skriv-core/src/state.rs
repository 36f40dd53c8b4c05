//! Coordinator state and the transition API.
//!
//! The state is a display and gating signal shared by every long-running
//! activity: it gates new recording starts and file-scanner prompts, and it
//! drives the status indicator. It does not serialize recording against
//! transcription; those overlap legitimately.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// The coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing in flight, listening for activations
    Idle,
    /// A recording session is capturing audio
    Recording,
    /// The worker is busy or holds queued jobs
    Processing,
    /// A file-scanner confirmation prompt is pending
    Waiting,
}

impl State {
    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, State::Recording)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Idle => "idle",
            State::Recording => "recording",
            State::Processing => "processing",
            State::Waiting => "waiting",
        };
        f.write_str(name)
    }
}

/// Single source of truth for the coordinator state.
///
/// Every transition happens inside one locked section, so two interleaved
/// activations can never both observe Idle and both start recordings. Each
/// applied transition is published to the feedback receiver without blocking
/// the caller.
pub struct StateMachine {
    current: Mutex<State>,
    changed: Condvar,
    feedback: Sender<State>,
}

impl StateMachine {
    /// Creates the machine in `Idle` along with the receiving end of the
    /// feedback stream. Dropping the machine closes the stream.
    pub fn new() -> (Self, Receiver<State>) {
        let (feedback, rx) = mpsc::channel();
        let machine = Self {
            current: Mutex::new(State::Idle),
            changed: Condvar::new(),
            feedback,
        };
        (machine, rx)
    }

    /// Reads the current state.
    pub fn current(&self) -> State {
        *self.current.lock()
    }

    /// Idle|Processing -> Recording. Returns false when a recording is
    /// already active or a prompt is pending, so only one activation of a
    /// racing pair can start a session.
    pub fn begin_recording(&self) -> bool {
        let mut state = self.current.lock();
        match *state {
            State::Idle | State::Processing => {
                self.apply(&mut state, State::Recording);
                true
            }
            State::Recording | State::Waiting => false,
        }
    }

    /// Idle -> Waiting, entered when the file scanner found candidates and a
    /// confirmation prompt is about to be shown.
    pub fn begin_waiting(&self) -> bool {
        let mut state = self.current.lock();
        if state.is_idle() {
            self.apply(&mut state, State::Waiting);
            true
        } else {
            false
        }
    }

    /// Recording -> Processing. This is the stop signal: the capture
    /// session wakes from [`wait_while_recording`](Self::wait_while_recording)
    /// and flushes. Returns false when no recording is active.
    pub fn request_stop(&self) -> bool {
        let mut state = self.current.lock();
        if state.is_recording() {
            self.apply(&mut state, State::Processing);
            true
        } else {
            false
        }
    }

    /// Called by the capture session after flushing its buffer. Corrects
    /// Processing back to Idle when the flush produced no job and nothing is
    /// queued; otherwise the state stays Processing.
    pub fn recording_flushed(&self, has_work: bool) {
        let mut state = self.current.lock();
        if *state == State::Processing {
            let next = if has_work {
                State::Processing
            } else {
                State::Idle
            };
            self.apply(&mut state, next);
        }
    }

    /// Waiting -> Processing when the prompt enqueued at least one job,
    /// Waiting -> Idle otherwise.
    pub fn resolve_waiting(&self, enqueued: bool) {
        let mut state = self.current.lock();
        if *state == State::Waiting {
            let next = if enqueued {
                State::Processing
            } else {
                State::Idle
            };
            self.apply(&mut state, next);
        }
    }

    /// Called by the worker after each job, success or failure. Processing
    /// drops to Idle once the queue is empty; if a concurrent recording owns
    /// the state the call is a no-op and the session's own flush decides.
    pub fn job_done(&self, queue_empty: bool) {
        let mut state = self.current.lock();
        if *state == State::Processing {
            let next = if queue_empty {
                State::Idle
            } else {
                State::Processing
            };
            self.apply(&mut state, next);
        }
    }

    /// Blocks the calling capture session until the state leaves Recording.
    pub fn wait_while_recording(&self) {
        let mut state = self.current.lock();
        while state.is_recording() {
            self.changed.wait(&mut state);
        }
    }

    fn apply(&self, state: &mut State, next: State) {
        if *state != next {
            debug!(from = %state, to = %next, "state transition");
        }
        *state = next;
        self.changed.notify_all();
        // Publishing must never block; a full/closed receiver is the
        // feedback sink's problem, not the transition's.
        self.feedback.send(next).ok();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_idle() {
        let (machine, _rx) = StateMachine::new();
        assert_eq!(machine.current(), State::Idle);
    }

    #[test]
    fn recording_happy_path() {
        let (machine, _rx) = StateMachine::new();
        assert!(machine.begin_recording());
        assert_eq!(machine.current(), State::Recording);
        assert!(machine.request_stop());
        assert_eq!(machine.current(), State::Processing);
        machine.recording_flushed(true);
        assert_eq!(machine.current(), State::Processing);
        machine.job_done(false);
        assert_eq!(machine.current(), State::Processing);
        machine.job_done(true);
        assert_eq!(machine.current(), State::Idle);
    }

    #[test]
    fn empty_recording_falls_back_to_idle() {
        let (machine, _rx) = StateMachine::new();
        assert!(machine.begin_recording());
        assert!(machine.request_stop());
        machine.recording_flushed(false);
        assert_eq!(machine.current(), State::Idle);
    }

    #[test]
    fn no_double_start() {
        let (machine, _rx) = StateMachine::new();
        assert!(machine.begin_recording());
        assert!(!machine.begin_recording());
    }

    #[test]
    fn racing_activations_start_exactly_one_recording() {
        let (machine, _rx) = StateMachine::new();
        let machine = Arc::new(machine);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let machine = machine.clone();
                thread::spawn(move || machine.begin_recording())
            })
            .collect();
        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(started, 1);
    }

    #[test]
    fn recording_allowed_while_processing() {
        let (machine, _rx) = StateMachine::new();
        assert!(machine.begin_recording());
        assert!(machine.request_stop());
        machine.recording_flushed(true);
        assert_eq!(machine.current(), State::Processing);
        // New capture may start while the worker is busy.
        assert!(machine.begin_recording());
        assert_eq!(machine.current(), State::Recording);
        // A finishing job must not clobber the recording display.
        machine.job_done(true);
        assert_eq!(machine.current(), State::Recording);
    }

    #[test]
    fn waiting_gates_recording_and_resolves() {
        let (machine, _rx) = StateMachine::new();
        assert!(machine.begin_waiting());
        assert!(!machine.begin_recording());
        assert!(!machine.begin_waiting());
        machine.resolve_waiting(true);
        assert_eq!(machine.current(), State::Processing);
        machine.job_done(true);

        assert!(machine.begin_waiting());
        machine.resolve_waiting(false);
        assert_eq!(machine.current(), State::Idle);
    }

    #[test]
    fn stop_request_wakes_a_waiting_session() {
        let (machine, _rx) = StateMachine::new();
        let machine = Arc::new(machine);
        assert!(machine.begin_recording());

        let waiter = {
            let machine = machine.clone();
            thread::spawn(move || machine.wait_while_recording())
        };
        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!waiter.is_finished());

        assert!(machine.request_stop());
        waiter.join().unwrap();
    }

    #[test]
    fn transitions_are_published_in_order() {
        let (machine, rx) = StateMachine::new();
        machine.begin_recording();
        machine.request_stop();
        machine.recording_flushed(false);
        drop(machine);
        let seen: Vec<State> = rx.iter().collect();
        assert_eq!(seen, vec![State::Recording, State::Processing, State::Idle]);
    }
}
