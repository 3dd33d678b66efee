//! snipd: daemon core for a desktop snippet manager
//!
//! Two services form the core:
//! - [`hotkey::HotkeyListener`] intercepts global key combinations on a
//!   background thread and dispatches callbacks when they fire.
//! - [`insert::TextInserter`] places snippet text on the clipboard,
//!   restores focus to the previously active window, and synthesizes the
//!   platform paste keystroke.
//!
//! The `snipd` binary wires both together as a headless daemon; the
//! snippet libraries and the selection UI belong to the surrounding
//! application.

pub mod config;
pub mod events;
pub mod hotkey;
pub mod insert;
pub mod lifecycle;

pub use config::{ClipboardConfig, Config, HotkeyConfig};
pub use events::CoreEvent;
pub use hotkey::HotkeyListener;
pub use insert::TextInserter;
