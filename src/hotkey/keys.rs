//! Hotkey pattern grammar
//!
//! Parses human-authored patterns such as "Ctrl+Shift+Space" into a
//! platform-neutral key plus modifier set. Parsing is case-insensitive and
//! token-order-insensitive; backends map the result onto their own key
//! codes.

use tracing::warn;

/// Modifier keys that must be held for a hotkey to fire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Control key
    pub control: bool,
    /// Shift key
    pub shift: bool,
    /// Alt/Option key
    pub alt: bool,
    /// OS key: Command on macOS, Super/Windows elsewhere
    pub os: bool,
}

impl Modifiers {
    /// Check if no modifier is required
    pub fn is_empty(&self) -> bool {
        !self.control && !self.shift && !self.alt && !self.os
    }
}

/// The non-modifier key of a hotkey combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    Space,
    Return,
    Tab,
    Escape,
    Backspace,
    /// A single printable character, stored lowercase
    Char(char),
    /// Any other token, carried verbatim (lowercase) for the backend to resolve
    Named(String),
}

impl KeySpec {
    fn from_token(token: &str) -> Self {
        match token {
            "space" => KeySpec::Space,
            "enter" | "return" => KeySpec::Return,
            "tab" => KeySpec::Tab,
            "esc" | "escape" => KeySpec::Escape,
            "backspace" => KeySpec::Backspace,
            _ => {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeySpec::Char(c),
                    _ => KeySpec::Named(token.to_string()),
                }
            }
        }
    }
}

/// A parsed hotkey: one key plus the exact modifier set that must be held
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHotkey {
    pub key: KeySpec,
    pub mods: Modifiers,
}

impl ParsedHotkey {
    /// Parse a pattern such as "Ctrl+Shift+Space".
    ///
    /// Tokens are separated by `+` or whitespace and matched
    /// case-insensitively. Exactly one non-modifier token names the key;
    /// patterns with none (or several) are invalid and return `None`.
    pub fn parse(pattern: &str) -> Option<Self> {
        let mut mods = Modifiers::default();
        let mut key: Option<KeySpec> = None;

        for token in pattern.split(|c: char| c == '+' || c.is_whitespace()) {
            let token = token.trim().to_lowercase();
            if token.is_empty() {
                continue;
            }
            match token.as_str() {
                "ctrl" | "control" => mods.control = true,
                "shift" => mods.shift = true,
                "alt" | "meta" => mods.alt = true,
                "cmd" | "super" | "win" => mods.os = true,
                _ => {
                    if key.replace(KeySpec::from_token(&token)).is_some() {
                        warn!(pattern, "hotkey pattern has more than one key token");
                        return None;
                    }
                }
            }
        }

        match key {
            Some(key) => Some(Self { key, mods }),
            None => {
                warn!(pattern, "hotkey pattern has no key token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_order_insensitive() {
        let a = ParsedHotkey::parse("shift+ctrl+d").unwrap();
        let b = ParsedHotkey::parse("Ctrl+Shift+D").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key, KeySpec::Char('d'));
        assert!(a.mods.control && a.mods.shift);
        assert!(!a.mods.alt && !a.mods.os);
    }

    #[test]
    fn test_parse_named_keys() {
        let hotkey = ParsedHotkey::parse("Ctrl+Shift+Space").unwrap();
        assert_eq!(hotkey.key, KeySpec::Space);

        assert_eq!(
            ParsedHotkey::parse("ctrl+enter").unwrap().key,
            KeySpec::Return
        );
        assert_eq!(
            ParsedHotkey::parse("ctrl+return").unwrap().key,
            KeySpec::Return
        );
        assert_eq!(ParsedHotkey::parse("alt+esc").unwrap().key, KeySpec::Escape);
        assert_eq!(
            ParsedHotkey::parse("shift+backspace").unwrap().key,
            KeySpec::Backspace
        );
    }

    #[test]
    fn test_parse_whitespace_separator() {
        let a = ParsedHotkey::parse("ctrl shift space").unwrap();
        let b = ParsedHotkey::parse("Ctrl+Shift+Space").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_token_becomes_named_key() {
        let hotkey = ParsedHotkey::parse("ctrl+f5").unwrap();
        assert_eq!(hotkey.key, KeySpec::Named("f5".to_string()));
    }

    #[test]
    fn test_meta_is_alt_and_super_is_os() {
        let meta = ParsedHotkey::parse("meta+x").unwrap();
        assert!(meta.mods.alt && !meta.mods.os);

        let sup = ParsedHotkey::parse("super+x").unwrap();
        assert!(sup.mods.os && !sup.mods.alt);
        assert_eq!(sup, ParsedHotkey::parse("win+x").unwrap());
        assert_eq!(sup, ParsedHotkey::parse("cmd+x").unwrap());
    }

    #[test]
    fn test_modifier_only_pattern_is_invalid() {
        assert!(ParsedHotkey::parse("ctrl+shift").is_none());
        assert!(ParsedHotkey::parse("").is_none());
    }

    #[test]
    fn test_two_key_tokens_are_invalid() {
        assert!(ParsedHotkey::parse("ctrl+a+b").is_none());
    }

    #[test]
    fn test_bare_key_has_no_modifiers() {
        let hotkey = ParsedHotkey::parse("space").unwrap();
        assert_eq!(hotkey.key, KeySpec::Space);
        assert!(hotkey.mods.is_empty());
    }

    #[test]
    fn test_char_key_is_lowercased() {
        assert_eq!(
            ParsedHotkey::parse("ctrl+V").unwrap().key,
            KeySpec::Char('v')
        );
    }
}
