//! Global hotkey capture
//!
//! Parses human-authored patterns ("Ctrl+Shift+Space") and intercepts the
//! combinations system-wide on a dedicated thread. Two backends are
//! available, an X11 key grab on Linux and an rdev input hook everywhere
//! else, selected by a capability probe when the listener starts.

mod backend;
mod hook;
mod keys;
mod listener;

#[cfg(target_os = "linux")]
mod x11;

pub use keys::{KeySpec, Modifiers, ParsedHotkey};
pub use listener::{HotkeyError, HotkeyListener};
