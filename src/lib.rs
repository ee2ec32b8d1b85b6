//! Editing core for a frame-by-frame 2D animation editor.
//!
//! An [`AnimationDocument`] holds layers of raster frames painted bottom to top. The
//! [`Editor`] wraps it with tools, gestures, clipboards and playback and is the surface a
//! shell drives.

pub mod brush;
pub mod compositor;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod fill;
pub mod history;
pub mod input;
pub mod io;
pub mod layer;
pub mod playback;
pub mod raster;
pub mod selection;
pub mod smoothing;

#[cfg(test)]
mod io_tests;

pub use brush::Tool;
pub use config::EditorConfig;
pub use document::{AnimationDocument, Direction};
pub use editor::{report, DocumentEvent, Editor};
pub use error::{Declined, EditorError, EditorResult};
pub use raster::{Color, RasterBuffer};
pub use selection::CursorShape;
