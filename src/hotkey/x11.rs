//! X11 key-grab backend
//!
//! Grabs each hotkey on the root window with XGrabKey, once with the exact
//! modifier mask and once with Num Lock added, so bindings fire regardless
//! of Num Lock state. Incoming key presses have the Num Lock bit masked off
//! and must then match a grabbed (keycode, mask) pair exactly.
//!
//! The display connection and all grabs are owned by this backend and
//! released on drop, which runs on every exit path of the listener thread.

use std::ffi::CString;
use std::os::raw::{c_int, c_uint};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use x11_dl::xlib;

use super::backend::{Backend, ResolvedBinding};
use super::keys::{KeySpec, Modifiers};
use super::listener::HotkeyError;

/// Sleep between polls while no X events are pending
const IDLE_POLL: Duration = Duration::from_millis(30);

/// One armed grab: keycode plus base modifier mask (without Num Lock)
struct Grab {
    keycode: c_int,
    mask: c_uint,
    binding: usize,
}

pub(crate) struct X11Backend {
    xlib: xlib::Xlib,
    display: *mut xlib::Display,
    root: xlib::Window,
    bindings: Vec<ResolvedBinding>,
    grabs: Vec<Grab>,
    grabbed: bool,
}

impl X11Backend {
    /// Connect to the X display and resolve every binding to a keycode.
    ///
    /// Fails only when no display is reachable; bindings the display cannot
    /// express are skipped with a warning.
    pub(crate) fn new(bindings: &[ResolvedBinding]) -> Result<Self, HotkeyError> {
        let xlib = xlib::Xlib::open()
            .map_err(|e| HotkeyError::BackendInit(format!("Xlib unavailable: {}", e)))?;

        let display = unsafe { (xlib.XOpenDisplay)(ptr::null()) };
        if display.is_null() {
            return Err(HotkeyError::BackendInit("cannot open X display".to_string()));
        }

        let root = unsafe { (xlib.XDefaultRootWindow)(display) };

        let mut backend = Self {
            xlib,
            display,
            root,
            bindings: bindings.to_vec(),
            grabs: Vec::new(),
            grabbed: false,
        };
        backend.resolve_grabs();
        Ok(backend)
    }

    /// Map each parsed hotkey onto an X keycode + modifier mask.
    fn resolve_grabs(&mut self) {
        for (idx, binding) in self.bindings.iter().enumerate() {
            match self.keycode_for(&binding.hotkey.key) {
                Some(keycode) => self.grabs.push(Grab {
                    keycode,
                    mask: x11_mask(binding.hotkey.mods),
                    binding: idx,
                }),
                None => {
                    warn!(pattern = %binding.pattern, "no X keycode for hotkey, skipping");
                }
            }
        }
    }

    fn keycode_for(&self, key: &KeySpec) -> Option<c_int> {
        for name in keysym_names(key) {
            let Ok(cname) = CString::new(name) else {
                continue;
            };
            let keysym = unsafe { (self.xlib.XStringToKeysym)(cname.as_ptr()) };
            if keysym == 0 {
                continue;
            }
            let keycode = unsafe { (self.xlib.XKeysymToKeycode)(self.display, keysym) };
            if keycode != 0 {
                return Some(keycode as c_int);
            }
        }
        None
    }

    fn grab_all(&mut self) {
        unsafe {
            (self.xlib.XSetErrorHandler)(Some(forgiving_error_handler));
            (self.xlib.XSelectInput)(self.display, self.root, xlib::KeyPressMask);
            for grab in &self.grabs {
                for mask in [grab.mask, grab.mask | xlib::Mod2Mask] {
                    (self.xlib.XGrabKey)(
                        self.display,
                        grab.keycode,
                        mask,
                        self.root,
                        xlib::False,
                        xlib::GrabModeAsync,
                        xlib::GrabModeAsync,
                    );
                }
            }
            (self.xlib.XSync)(self.display, xlib::False);
        }
        self.grabbed = true;
        info!(grabs = self.grabs.len(), "X11 key grabs armed");
    }
}

impl Backend for X11Backend {
    fn name(&self) -> &'static str {
        "x11-grab"
    }

    fn run(&mut self, running: Arc<AtomicBool>) -> Result<(), HotkeyError> {
        self.grab_all();

        let mut event: xlib::XEvent = unsafe { std::mem::zeroed() };
        while running.load(Ordering::SeqCst) {
            let pending = unsafe { (self.xlib.XPending)(self.display) };
            if pending == 0 {
                thread::sleep(IDLE_POLL);
                continue;
            }

            unsafe { (self.xlib.XNextEvent)(self.display, &mut event) };
            if event.get_type() != xlib::KeyPress {
                continue;
            }

            let key_event = unsafe { event.key };
            let keycode = key_event.keycode as c_int;
            // Num Lock must not affect matching
            let state = key_event.state & !xlib::Mod2Mask;

            for grab in &self.grabs {
                if grab.keycode == keycode && grab.mask == state {
                    let binding = &self.bindings[grab.binding];
                    debug!(pattern = %binding.pattern, "hotkey matched");
                    (binding.callback)();
                }
            }
        }

        Ok(())
    }
}

impl Drop for X11Backend {
    fn drop(&mut self) {
        unsafe {
            if self.grabbed {
                for grab in &self.grabs {
                    for mask in [grab.mask, grab.mask | xlib::Mod2Mask] {
                        (self.xlib.XUngrabKey)(self.display, grab.keycode, mask, self.root);
                    }
                }
                (self.xlib.XSync)(self.display, xlib::False);
            }
            (self.xlib.XCloseDisplay)(self.display);
        }
        debug!("X11 backend released");
    }
}

/// Xlib's default error handler exits the process; a conflicting grab from
/// another client (BadAccess) must only cost the one binding.
unsafe extern "C" fn forgiving_error_handler(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    let code = (*event).error_code;
    warn!(code, "X11 error while managing key grabs");
    0
}

/// Candidate keysym names for a parsed key, in lookup order.
///
/// X keysym names are case-sensitive ("Return", "Prior"); tokens the table
/// does not know are tried verbatim and then with the first letter
/// upper-cased.
fn keysym_names(key: &KeySpec) -> Vec<String> {
    match key {
        KeySpec::Space => vec!["space".to_string()],
        KeySpec::Return => vec!["Return".to_string()],
        KeySpec::Tab => vec!["Tab".to_string()],
        KeySpec::Escape => vec!["Escape".to_string()],
        KeySpec::Backspace => vec!["BackSpace".to_string()],
        KeySpec::Char(c) => vec![c.to_string()],
        KeySpec::Named(name) => {
            let known = match name.as_str() {
                "delete" => Some("Delete"),
                "insert" => Some("Insert"),
                "home" => Some("Home"),
                "end" => Some("End"),
                "pageup" => Some("Prior"),
                "pagedown" => Some("Next"),
                "up" => Some("Up"),
                "down" => Some("Down"),
                "left" => Some("Left"),
                "right" => Some("Right"),
                "capslock" => Some("Caps_Lock"),
                _ => None,
            };
            if let Some(known) = known {
                return vec![known.to_string()];
            }
            if let Some(digits) = name.strip_prefix('f') {
                if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                    return vec![format!("F{}", digits)];
                }
            }
            let mut candidates = vec![name.clone()];
            let mut chars = name.chars();
            if let Some(first) = chars.next() {
                candidates.push(first.to_uppercase().collect::<String>() + chars.as_str());
            }
            candidates
        }
    }
}

fn x11_mask(mods: Modifiers) -> c_uint {
    let mut mask = 0;
    if mods.control {
        mask |= xlib::ControlMask;
    }
    if mods.shift {
        mask |= xlib::ShiftMask;
    }
    if mods.alt {
        mask |= xlib::Mod1Mask;
    }
    if mods.os {
        mask |= xlib::Mod4Mask;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keysym_names_for_named_keys() {
        assert_eq!(
            keysym_names(&KeySpec::Named("f5".to_string())),
            vec!["F5".to_string()]
        );
        assert_eq!(
            keysym_names(&KeySpec::Named("pageup".to_string())),
            vec!["Prior".to_string()]
        );
        assert_eq!(
            keysym_names(&KeySpec::Backspace),
            vec!["BackSpace".to_string()]
        );
    }

    #[test]
    fn test_unknown_names_get_capitalized_candidate() {
        let candidates = keysym_names(&KeySpec::Named("menu".to_string()));
        assert_eq!(candidates, vec!["menu".to_string(), "Menu".to_string()]);
    }

    #[test]
    fn test_x11_mask_combines_modifiers() {
        let mods = Modifiers {
            control: true,
            shift: true,
            alt: false,
            os: false,
        };
        assert_eq!(x11_mask(mods), xlib::ControlMask | xlib::ShiftMask);
        assert_eq!(x11_mask(Modifiers::default()), 0);
    }
}
