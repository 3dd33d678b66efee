//! Text insertion into the previously focused window
//!
//! `TextInserter` owns the clipboard-write, focus-restore, paste-keystroke
//! sequence; `InsertOps` is the seam to the host desktop.

mod inserter;
mod ops;

pub use inserter::TextInserter;
pub use ops::{InsertError, InsertOps, NativeOps, PasteKeys, WindowHandle};
