//! Input-hook fallback backend built on `rdev`
//!
//! Used where no X display is available (Wayland sessions, macOS, Windows).
//! rdev delivers raw key press/release events; held modifiers are tracked
//! here and each press is compared against the full binding set on exact
//! (key, modifiers) equality.
//!
//! `rdev::listen` cannot be unhooked once installed. On stop the cleared
//! running flag makes the loop inert and the listener's bounded join leaks
//! the thread with a warning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rdev::{Event, EventType, Key};
use tracing::{debug, warn};

use super::backend::{Backend, ResolvedBinding};
use super::keys::{KeySpec, Modifiers};
use super::listener::HotkeyError;

/// A binding resolved to an rdev key
struct HookBinding {
    key: Key,
    mods: Modifiers,
    binding: ResolvedBinding,
}

pub(crate) struct HookBackend {
    bindings: Vec<HookBinding>,
}

impl HookBackend {
    /// Resolve the full binding set up front; combinations rdev cannot
    /// express are skipped with a warning.
    pub(crate) fn new(bindings: &[ResolvedBinding]) -> Self {
        let mut resolved = Vec::new();
        for binding in bindings {
            match rdev_key(&binding.hotkey.key) {
                Some(key) => resolved.push(HookBinding {
                    key,
                    mods: binding.hotkey.mods,
                    binding: binding.clone(),
                }),
                None => {
                    warn!(pattern = %binding.pattern, "input hook cannot map hotkey, skipping");
                }
            }
        }
        Self { bindings: resolved }
    }
}

impl Backend for HookBackend {
    fn name(&self) -> &'static str {
        "input-hook"
    }

    fn run(&mut self, running: Arc<AtomicBool>) -> Result<(), HotkeyError> {
        let bindings = std::mem::take(&mut self.bindings);
        let mut held = Modifiers::default();

        let callback = move |event: Event| {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            match event.event_type {
                EventType::KeyPress(key) => {
                    if apply_modifier(&mut held, key, true) {
                        return;
                    }
                    for hook in &bindings {
                        if hook.key == key && hook.mods == held {
                            debug!(pattern = %hook.binding.pattern, "hotkey matched");
                            (hook.binding.callback)();
                        }
                    }
                }
                EventType::KeyRelease(key) => {
                    apply_modifier(&mut held, key, false);
                }
                _ => {}
            }
        };

        // listen() blocks for the life of the process; it only returns on
        // an initialization error.
        rdev::listen(callback)
            .map_err(|e| HotkeyError::BackendInit(format!("input hook failed: {:?}", e)))
    }
}

/// Update held-modifier state; returns true when `key` is a modifier.
fn apply_modifier(held: &mut Modifiers, key: Key, pressed: bool) -> bool {
    match key {
        Key::ControlLeft | Key::ControlRight => held.control = pressed,
        Key::ShiftLeft | Key::ShiftRight => held.shift = pressed,
        Key::Alt | Key::AltGr => held.alt = pressed,
        Key::MetaLeft | Key::MetaRight => held.os = pressed,
        _ => return false,
    }
    true
}

/// Map a parsed key onto rdev's key enum.
fn rdev_key(key: &KeySpec) -> Option<Key> {
    match key {
        KeySpec::Space => Some(Key::Space),
        KeySpec::Return => Some(Key::Return),
        KeySpec::Tab => Some(Key::Tab),
        KeySpec::Escape => Some(Key::Escape),
        KeySpec::Backspace => Some(Key::Backspace),
        KeySpec::Char(c) => char_key(*c),
        KeySpec::Named(name) => named_key(name),
    }
}

fn char_key(c: char) -> Option<Key> {
    let key = match c.to_ascii_lowercase() {
        'a' => Key::KeyA,
        'b' => Key::KeyB,
        'c' => Key::KeyC,
        'd' => Key::KeyD,
        'e' => Key::KeyE,
        'f' => Key::KeyF,
        'g' => Key::KeyG,
        'h' => Key::KeyH,
        'i' => Key::KeyI,
        'j' => Key::KeyJ,
        'k' => Key::KeyK,
        'l' => Key::KeyL,
        'm' => Key::KeyM,
        'n' => Key::KeyN,
        'o' => Key::KeyO,
        'p' => Key::KeyP,
        'q' => Key::KeyQ,
        'r' => Key::KeyR,
        's' => Key::KeyS,
        't' => Key::KeyT,
        'u' => Key::KeyU,
        'v' => Key::KeyV,
        'w' => Key::KeyW,
        'x' => Key::KeyX,
        'y' => Key::KeyY,
        'z' => Key::KeyZ,
        '0' => Key::Num0,
        '1' => Key::Num1,
        '2' => Key::Num2,
        '3' => Key::Num3,
        '4' => Key::Num4,
        '5' => Key::Num5,
        '6' => Key::Num6,
        '7' => Key::Num7,
        '8' => Key::Num8,
        '9' => Key::Num9,
        _ => return None,
    };
    Some(key)
}

fn named_key(name: &str) -> Option<Key> {
    let key = match name {
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
        "delete" => Key::Delete,
        "insert" => Key::Insert,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "capslock" => Key::CapsLock,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rdev_key_mapping() {
        assert_eq!(rdev_key(&KeySpec::Space), Some(Key::Space));
        assert_eq!(rdev_key(&KeySpec::Char('v')), Some(Key::KeyV));
        assert_eq!(rdev_key(&KeySpec::Char('7')), Some(Key::Num7));
        assert_eq!(
            rdev_key(&KeySpec::Named("f5".to_string())),
            Some(Key::F5)
        );
        assert_eq!(rdev_key(&KeySpec::Named("oddball".to_string())), None);
        assert_eq!(rdev_key(&KeySpec::Char('%')), None);
    }

    #[test]
    fn test_modifier_tracking() {
        let mut held = Modifiers::default();

        assert!(apply_modifier(&mut held, Key::ControlLeft, true));
        assert!(apply_modifier(&mut held, Key::ShiftRight, true));
        assert!(held.control && held.shift);

        assert!(apply_modifier(&mut held, Key::ControlLeft, false));
        assert!(!held.control && held.shift);

        // Non-modifier keys leave the state alone
        assert!(!apply_modifier(&mut held, Key::KeyV, true));
        assert!(held.shift);
    }
}
