//! Hotkey chords over the raw global key hook.
//!
//! rdev reports physical key codes, so alphabetic keys already arrive
//! layout-independent. Normalization here collapses left/right modifier
//! pairs into one identity and feeds a pressed-set that chords are matched
//! against as subsets.

use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use rdev::{Event, EventType, Key};
use tracing::{debug, error};

/// Layout-independent key identity used in chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordKey {
    Ctrl,
    Alt,
    Shift,
    Meta,
    /// Any non-modifier key, by physical code.
    Key(Key),
}

/// Collapses a raw key into its chord identity.
pub fn normalize(key: Key) -> ChordKey {
    match key {
        Key::ControlLeft | Key::ControlRight => ChordKey::Ctrl,
        Key::Alt | Key::AltGr => ChordKey::Alt,
        Key::ShiftLeft | Key::ShiftRight => ChordKey::Shift,
        Key::MetaLeft | Key::MetaRight => ChordKey::Meta,
        other => ChordKey::Key(other),
    }
}

/// A configured key combination, parsed once at startup.
#[derive(Debug, Clone)]
pub struct Chord {
    keys: HashSet<ChordKey>,
}

impl Chord {
    /// Parses specs like `"ctrl+alt+w"`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut keys = HashSet::new();
        for token in spec.split('+') {
            let token = token.trim().to_ascii_lowercase();
            if token.is_empty() {
                bail!("empty key in chord '{spec}'");
            }
            let key = key_token(&token)
                .with_context(|| format!("unknown key '{token}' in chord '{spec}'"))?;
            keys.insert(key);
        }
        if keys.is_empty() {
            bail!("chord '{spec}' has no keys");
        }
        Ok(Self { keys })
    }

    /// True when every key of the chord is currently pressed.
    pub fn matches(&self, pressed: &HashSet<ChordKey>) -> bool {
        self.keys.is_subset(pressed)
    }
}

fn key_token(token: &str) -> Option<ChordKey> {
    let key = match token {
        "ctrl" | "control" => return Some(ChordKey::Ctrl),
        "alt" => return Some(ChordKey::Alt),
        "shift" => return Some(ChordKey::Shift),
        "meta" | "super" | "win" | "cmd" => return Some(ChordKey::Meta),
        "a" => Key::KeyA,
        "b" => Key::KeyB,
        "c" => Key::KeyC,
        "d" => Key::KeyD,
        "e" => Key::KeyE,
        "f" => Key::KeyF,
        "g" => Key::KeyG,
        "h" => Key::KeyH,
        "i" => Key::KeyI,
        "j" => Key::KeyJ,
        "k" => Key::KeyK,
        "l" => Key::KeyL,
        "m" => Key::KeyM,
        "n" => Key::KeyN,
        "o" => Key::KeyO,
        "p" => Key::KeyP,
        "q" => Key::KeyQ,
        "r" => Key::KeyR,
        "s" => Key::KeyS,
        "t" => Key::KeyT,
        "u" => Key::KeyU,
        "v" => Key::KeyV,
        "w" => Key::KeyW,
        "x" => Key::KeyX,
        "y" => Key::KeyY,
        "z" => Key::KeyZ,
        "0" => Key::Num0,
        "1" => Key::Num1,
        "2" => Key::Num2,
        "3" => Key::Num3,
        "4" => Key::Num4,
        "5" => Key::Num5,
        "6" => Key::Num6,
        "7" => Key::Num7,
        "8" => Key::Num8,
        "9" => Key::Num9,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "space" => Key::Space,
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        _ => return None,
    };
    Some(ChordKey::Key(key))
}

/// What a fired chord asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Primary,
    Fragment,
}

struct Binding {
    chord: Chord,
    activation: Activation,
    // Set while the chord is held so it fires once per press.
    fired: bool,
}

/// Translates normalized key events into activation requests. Activations
/// are pushed onto a channel so the key hook callback never blocks on
/// downstream work.
pub struct HotkeyDispatcher {
    bindings: Vec<Binding>,
    pressed: HashSet<ChordKey>,
    activations: Sender<Activation>,
}

impl HotkeyDispatcher {
    pub fn new(primary: Chord, fragment: Chord, activations: Sender<Activation>) -> Self {
        let bindings = vec![
            Binding {
                chord: primary,
                activation: Activation::Primary,
                fired: false,
            },
            Binding {
                chord: fragment,
                activation: Activation::Fragment,
                fired: false,
            },
        ];
        Self {
            bindings,
            pressed: HashSet::new(),
            activations,
        }
    }

    /// Feeds one raw event from the hook.
    pub fn handle(&mut self, event: &Event) {
        match event.event_type {
            EventType::KeyPress(key) => self.key_down(normalize(key)),
            EventType::KeyRelease(key) => self.key_up(normalize(key)),
            _ => {}
        }
    }

    fn key_down(&mut self, key: ChordKey) {
        // Key-repeat shows up as repeated presses; only the first counts.
        if !self.pressed.insert(key) {
            return;
        }
        for binding in &mut self.bindings {
            if binding.chord.matches(&self.pressed) && !binding.fired {
                binding.fired = true;
                debug!(activation = ?binding.activation, "chord fired");
                self.activations.send(binding.activation).ok();
            }
        }
    }

    fn key_up(&mut self, key: ChordKey) {
        self.pressed.remove(&key);
        for binding in &mut self.bindings {
            if !binding.chord.matches(&self.pressed) {
                binding.fired = false;
            }
        }
    }

    /// Runs the global hook on its own thread for the life of the process.
    pub fn spawn(mut self) -> Result<()> {
        thread::Builder::new()
            .name("hotkey".into())
            .spawn(move || {
                if let Err(e) = rdev::listen(move |event| self.handle(&event)) {
                    error!("key hook terminated: {:?}", e);
                }
            })
            .map(|_| ())
            .map_err(|e| anyhow!("failed to spawn hotkey thread: {e}"))
    }
}
