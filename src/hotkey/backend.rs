//! Platform backend selection for the hotkey listener
//!
//! A single `Backend` trait with one implementation per interception
//! mechanism, chosen once by a host-capability probe when the listener
//! thread starts.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[cfg(target_os = "linux")]
use tracing::warn;

use super::hook::HookBackend;
use super::keys::ParsedHotkey;
use super::listener::HotkeyError;

/// A hotkey binding resolved for dispatch: the parsed combination plus the
/// callback to invoke when it fires.
#[derive(Clone)]
pub(crate) struct ResolvedBinding {
    pub pattern: String,
    pub hotkey: ParsedHotkey,
    pub callback: Arc<dyn Fn() + Send + Sync>,
}

impl fmt::Debug for ResolvedBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedBinding")
            .field("pattern", &self.pattern)
            .field("hotkey", &self.hotkey)
            .finish_non_exhaustive()
    }
}

/// A listener backend.
///
/// Implementations own whatever platform resources they need (display
/// connection, key grabs) and release them when dropped. Backends are
/// constructed on the listener thread and never leave it, so they may hold
/// thread-affine handles.
pub(crate) trait Backend {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Run the event loop on the current thread until `running` is cleared
    fn run(&mut self, running: Arc<AtomicBool>) -> Result<(), HotkeyError>;
}

/// Pick the best interception mechanism available on this host.
///
/// On Linux the X11 key-grab backend is preferred: grabs are precise,
/// cheap, and released on stop. When it cannot initialize (no X display,
/// e.g. a Wayland-only session) the input-hook backend takes over. Other
/// platforms go straight to the hook.
pub(crate) fn select(bindings: &[ResolvedBinding]) -> Box<dyn Backend> {
    #[cfg(target_os = "linux")]
    {
        match super::x11::X11Backend::new(bindings) {
            Ok(backend) => return Box::new(backend),
            Err(e) => {
                warn!(error = %e, "X11 key-grab backend unavailable, falling back to input hook");
            }
        }
    }

    Box::new(HookBackend::new(bindings))
}
