//! OS automation collaborators
//!
//! Thin async wrappers over `osascript` and `open`. Synchronous
//! request/response, no internal state machines; errors are reported back
//! to the dispatcher, never allowed to crash it.

mod apps;
mod files;
mod messenger;
mod music;
mod osascript;
mod search;

pub use apps::{AppControl, MacAppControl};
pub use files::{FileOps, LocalFileOps, NAVIGATION_PREFIX};
pub use messenger::{MessageSender, WhatsAppMessenger};
pub use music::{MacMusicControl, MusicControl};
pub use osascript::run_osascript;
pub use search::{SafariSearch, WebSearch};
