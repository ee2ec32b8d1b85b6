//! Error types shared by the editing core.

use std::fmt;

use thiserror::Error;

/// Why an operation was declined without touching the document.
///
/// These are not failures: the shell shows them as warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declined {
    GenesisState,
    NothingToRedo,
    LastFrame,
    LastLayer,
    LayerLocked,
    AtBoundary,
    NoSelection,
    NothingCopied,
    AlreadyFilled,
}

impl fmt::Display for Declined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Declined::GenesisState => "nothing left to undo",
            Declined::NothingToRedo => "nothing to redo",
            Declined::LastFrame => "cannot delete the only frame of a layer",
            Declined::LastLayer => "cannot delete the only layer",
            Declined::LayerLocked => "layer is locked",
            Declined::AtBoundary => "already at the end of the layer stack",
            Declined::NoSelection => "no active selection",
            Declined::NothingCopied => "clipboard is empty",
            Declined::AlreadyFilled => "region already has the fill colour",
        };
        f.write_str(msg)
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("invalid dimension {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("decode failure: {0}")]
    DecodeFailure(String),

    #[error("external tool failure: {0}")]
    ExternalToolFailure(String),

    #[error("declined: {0}")]
    Declined(Declined),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type EditorResult<T> = Result<T, EditorError>;

impl EditorError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalToolFailure(msg.into())
    }

    pub fn layer_index(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            what: "layer",
            index,
            len,
        }
    }

    pub fn frame_index(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            what: "frame",
            index,
            len,
        }
    }

    /// True for no-op outcomes that should surface as warnings.
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined(_))
    }
}

impl From<Declined> for EditorError {
    fn from(reason: Declined) -> Self {
        Self::Declined(reason)
    }
}
