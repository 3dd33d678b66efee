//! Clipboard-mediated text insertion
//!
//! The insertion sequence is deliberately ordered and timing-sensitive:
//! clipboard write, a settle delay for transient UI to close, best-effort
//! focus restoration, then the paste keystroke.

use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::ClipboardConfig;

use super::ops::{InsertOps, NativeOps, PasteKeys, WindowHandle};

/// Delay between the clipboard write and the paste keystroke, giving any
/// transient UI (tray menu, selection popup) time to close and focus to
/// return to the target window
const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Delay after re-activating the saved window, letting the window manager
/// finish the focus change
const ACTIVATE_DELAY: Duration = Duration::from_millis(50);

/// Inserts snippet text into the previously focused window via the system
/// clipboard and a synthesized paste keystroke.
///
/// `insert` is a blocking sequence; callers are responsible for not
/// invoking it concurrently on one instance.
pub struct TextInserter {
    config: ClipboardConfig,
    ops: Box<dyn InsertOps>,
    saved_window: Option<WindowHandle>,
}

impl TextInserter {
    pub fn new(config: ClipboardConfig) -> Self {
        Self::with_ops(config, Box::new(NativeOps::new()))
    }

    pub(crate) fn with_ops(config: ClipboardConfig, ops: Box<dyn InsertOps>) -> Self {
        Self {
            config,
            ops,
            saved_window: None,
        }
    }

    /// Capture the window that currently has keyboard focus.
    ///
    /// Must be called before any selection surface is shown: once a popup
    /// is up, the active window is the popup itself. On platforms without
    /// a window query the handle stays empty and insertion skips
    /// re-activation.
    pub fn save_active_window(&mut self) {
        self.saved_window = match self.ops.query_active_window() {
            Ok(Some(window)) => {
                info!(window = %window, "saved active window");
                Some(window)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "could not save active window");
                None
            }
        };
    }

    /// The window captured by the last `save_active_window` call
    pub fn saved_window(&self) -> Option<&WindowHandle> {
        self.saved_window.as_ref()
    }

    /// Insert `text` at the cursor of the previously active window.
    ///
    /// The text goes onto the clipboard verbatim (no escaping, no length
    /// limit) and a paste keystroke is synthesized after a settle delay.
    /// Returns false when the clipboard write or the keystroke fails; a
    /// failed window re-activation is logged and insertion continues
    /// best-effort.
    pub fn insert(&mut self, text: &str) -> bool {
        if self.config.restore_previous {
            // Read the outgoing clipboard contents. Writing them back after
            // the paste is disabled: the restore raced the paste keystroke
            // in practice, so the snippet stays on the clipboard and
            // `_previous` is never used.
            let _previous = self.ops.read_clipboard().ok();
        }

        info!(chars = text.chars().count(), "inserting snippet");

        if let Err(e) = self.ops.write_clipboard(text) {
            error!(error = %e, "clipboard write failed, aborting insertion");
            return false;
        }

        // Let the selection surface finish closing and focus drift back
        thread::sleep(SETTLE_DELAY);

        if let Some(window) = self.saved_window.clone() {
            match self.ops.activate_window(&window) {
                Ok(()) => thread::sleep(ACTIVATE_DELAY),
                Err(e) => {
                    warn!(window = %window, error = %e, "could not re-activate window, pasting anyway");
                }
            }
        }

        if let Err(e) = self.ops.send_paste(PasteKeys::for_host()) {
            error!(error = %e, "paste keystroke failed");
            return false;
        }

        true
    }
}
