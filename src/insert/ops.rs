//! OS integration for text insertion
//!
//! Everything the inserter asks of the desktop (clipboard access, window
//! queries, window activation, synthetic paste keystrokes) goes through
//! the `InsertOps` trait so the sequencing logic stays testable. The
//! production implementation prefers xdotool on Linux (it sends keystrokes
//! to whichever window holds focus, i.e. the one just re-activated) and
//! falls back to rdev key simulation elsewhere.

use std::fmt;
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Errors from the insertion surface
#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("window query failed: {0}")]
    WindowQuery(String),

    #[error("window activation failed: {0}")]
    Activation(String),

    #[error("paste synthesis failed: {0}")]
    Paste(String),
}

/// Opaque identifier of an OS window, as reported by the window system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowHandle(String);

impl WindowHandle {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The paste key combination for the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteKeys {
    ControlV,
    CommandV,
}

impl PasteKeys {
    /// Command+V where a Command modifier exists, Control+V elsewhere
    pub fn for_host() -> Self {
        if cfg!(target_os = "macos") {
            PasteKeys::CommandV
        } else {
            PasteKeys::ControlV
        }
    }
}

/// External calls made during an insertion, behind one mockable seam
pub trait InsertOps: Send {
    fn read_clipboard(&mut self) -> Result<String, InsertError>;

    fn write_clipboard(&mut self, text: &str) -> Result<(), InsertError>;

    /// The window currently holding keyboard focus, when the platform can say
    fn query_active_window(&mut self) -> Result<Option<WindowHandle>, InsertError>;

    fn activate_window(&mut self, window: &WindowHandle) -> Result<(), InsertError>;

    fn send_paste(&mut self, keys: PasteKeys) -> Result<(), InsertError>;
}

/// Production implementation: arboard clipboard, xdotool window control on
/// Linux, rdev keystroke simulation as the paste fallback.
pub struct NativeOps {
    clipboard: Option<arboard::Clipboard>,
    xdotool: bool,
}

impl NativeOps {
    pub fn new() -> Self {
        let xdotool = cfg!(target_os = "linux") && xdotool_available();
        if xdotool {
            debug!("xdotool found, using it for window control and paste");
        }
        Self {
            clipboard: None,
            xdotool,
        }
    }

    /// Open the clipboard on first use and keep it; on X11 the written
    /// selection is only served while its owner is alive.
    fn clipboard(&mut self) -> Result<&mut arboard::Clipboard, InsertError> {
        if self.clipboard.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| InsertError::Clipboard(e.to_string()))?;
            self.clipboard = Some(clipboard);
        }
        Ok(self.clipboard.as_mut().unwrap())
    }
}

impl Default for NativeOps {
    fn default() -> Self {
        Self::new()
    }
}

impl InsertOps for NativeOps {
    fn read_clipboard(&mut self) -> Result<String, InsertError> {
        self.clipboard()?
            .get_text()
            .map_err(|e| InsertError::Clipboard(e.to_string()))
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), InsertError> {
        self.clipboard()?
            .set_text(text.to_string())
            .map_err(|e| InsertError::Clipboard(e.to_string()))
    }

    fn query_active_window(&mut self) -> Result<Option<WindowHandle>, InsertError> {
        if !self.xdotool {
            return Ok(None);
        }
        let output = Command::new("xdotool")
            .arg("getactivewindow")
            .output()
            .map_err(|e| InsertError::WindowQuery(e.to_string()))?;
        if !output.status.success() {
            return Err(InsertError::WindowQuery(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            Ok(None)
        } else {
            Ok(Some(WindowHandle::new(id)))
        }
    }

    fn activate_window(&mut self, window: &WindowHandle) -> Result<(), InsertError> {
        if !self.xdotool {
            return Err(InsertError::Activation(
                "no window activation tool available".to_string(),
            ));
        }
        let status = Command::new("xdotool")
            .args(["windowactivate", "--sync", window.id()])
            .status()
            .map_err(|e| InsertError::Activation(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(InsertError::Activation(format!(
                "xdotool exited with {}",
                status
            )))
        }
    }

    fn send_paste(&mut self, keys: PasteKeys) -> Result<(), InsertError> {
        if self.xdotool {
            let status = Command::new("xdotool")
                .args(["key", "--clearmodifiers", "ctrl+v"])
                .status()
                .map_err(|e| InsertError::Paste(e.to_string()))?;
            if !status.success() {
                return Err(InsertError::Paste(format!("xdotool exited with {}", status)));
            }
            return Ok(());
        }
        simulate_paste(keys)
    }
}

fn xdotool_available() -> bool {
    Command::new("xdotool")
        .arg("version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Press/release sequence with short gaps so slower toolkits register the
/// chord.
fn simulate_paste(keys: PasteKeys) -> Result<(), InsertError> {
    use rdev::{simulate, EventType, Key};

    let gap = Duration::from_millis(20);
    let modifier = match keys {
        PasteKeys::CommandV => Key::MetaLeft,
        PasteKeys::ControlV => Key::ControlLeft,
    };

    for event in [
        EventType::KeyPress(modifier),
        EventType::KeyPress(Key::KeyV),
        EventType::KeyRelease(Key::KeyV),
        EventType::KeyRelease(modifier),
    ] {
        simulate(&event).map_err(|e| InsertError::Paste(format!("{:?}", e)))?;
        thread::sleep(gap);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paste_keys_for_host() {
        let keys = PasteKeys::for_host();
        if cfg!(target_os = "macos") {
            assert_eq!(keys, PasteKeys::CommandV);
        } else {
            assert_eq!(keys, PasteKeys::ControlV);
        }
    }

    #[test]
    fn test_window_handle_is_opaque_text() {
        let handle = WindowHandle::new("0x4a0000f");
        assert_eq!(handle.to_string(), "0x4a0000f");
        assert_eq!(handle, WindowHandle::new("0x4a0000f".to_string()));
    }
}
