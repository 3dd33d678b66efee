//! Events emitted by the daemon core
//!
//! Serialized with serde so an out-of-process UI can subscribe to the
//! stream later.

use serde::{Deserialize, Serialize};

/// Events broadcast while the daemon runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    /// The summon hotkey fired
    SummonRequested,

    /// A snippet was placed at the cursor
    SnippetInserted {
        /// Number of characters inserted
        chars: usize,
    },

    /// An insertion attempt failed (details are in the log)
    InsertFailed,
}

impl std::fmt::Display for CoreEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreEvent::SummonRequested => write!(f, "SUMMON_REQUESTED"),
            CoreEvent::SnippetInserted { chars } => {
                write!(f, "SNIPPET_INSERTED ({} chars)", chars)
            }
            CoreEvent::InsertFailed => write!(f, "INSERT_FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::SnippetInserted { chars: 42 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("snippet_inserted"));
        assert!(json.contains("42"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"summon_requested"}"#;
        let event: CoreEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, CoreEvent::SummonRequested));
    }
}
