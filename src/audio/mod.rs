//! Audio output pipeline
//!
//! Readiness detection for externally-written files and playback through
//! an external player process.

mod readiness;
mod renderer;

pub use readiness::{FileReadinessWaiter, PendingFile, Readiness};
pub use renderer::{AfplayRenderer, RenderError, RenderOptions, Renderer};
