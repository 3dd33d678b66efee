//! Configuration loading and management

/// Daemon configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Hotkey bindings
    pub hotkey: HotkeyConfig,

    /// Clipboard handling during insertion
    pub clipboard: ClipboardConfig,
}

/// Hotkey bindings
#[derive(Debug, Clone)]
pub struct HotkeyConfig {
    /// Pattern that summons the snippet selector
    pub summon: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            summon: "Ctrl+Shift+Space".to_string(),
        }
    }
}

/// Clipboard handling during insertion
#[derive(Debug, Clone)]
pub struct ClipboardConfig {
    /// Read the outgoing clipboard contents before overwriting them.
    /// Currently has no observable effect: the old contents are never
    /// written back (restoring raced the paste keystroke).
    pub restore_previous: bool,

    /// Delay before the (disabled) restore would run
    pub restore_delay_ms: u64,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            restore_previous: true,
            restore_delay_ms: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(summon) = std::env::var("SNIPD_SUMMON_HOTKEY") {
            if !summon.trim().is_empty() {
                config.hotkey.summon = summon;
            }
        }
        if let Ok(restore) = std::env::var("SNIPD_RESTORE_CLIPBOARD") {
            config.clipboard.restore_previous =
                matches!(restore.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(delay) = std::env::var("SNIPD_RESTORE_DELAY_MS") {
            if let Ok(delay) = delay.parse() {
                config.clipboard.restore_delay_ms = delay;
            }
        }

        config
    }
}
