use crate::config::EditorConfig;
use crate::document::AnimationDocument;
use crate::error::EditorResult;
use crate::raster::{Color, CompositionMode, RasterBuffer};

pub const MAX_ONION_DEPTH: usize = 5;

/// Translucent tinted neighbours drawn under the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct OnionSkin {
    pub enabled: bool,
    pub past_tint: Color,
    pub future_tint: Color,
    depth: usize,
    opacity: u8,
}

impl Default for OnionSkin {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl OnionSkin {
    pub fn from_config(config: &EditorConfig) -> Self {
        let mut onion = Self {
            enabled: false,
            past_tint: config.onion_past_tint,
            future_tint: config.onion_future_tint,
            depth: 1,
            opacity: 30,
        };
        onion.set_depth(config.onion_depth);
        onion.set_opacity(config.onion_opacity);
        onion
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth.clamp(1, MAX_ONION_DEPTH);
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity.min(100);
    }

    /// Opacity of the neighbour `k` frames away (1-based); fades linearly with distance.
    pub fn opacity_at(&self, k: usize) -> f32 {
        let n = self.depth as f32;
        self.opacity as f32 / 100.0 * (1.0 - (k.saturating_sub(1)) as f32 / n)
    }
}

/// Copy of `frame` with its colour replaced by `tint`, alpha untouched.
pub fn tinted(frame: &RasterBuffer, tint: Color) -> RasterBuffer {
    let mut out = frame.clone();
    let (w, h) = out.dimensions();
    out.fill_rect(0, 0, w, h, tint.with_alpha(255), CompositionMode::SourceAtop);
    out
}

/// A layer whose frame is drawn from a stand-in buffer instead of its stored content.
type Override<'a> = Option<(usize, &'a RasterBuffer)>;

fn paint_layers(
    out: &mut RasterBuffer,
    doc: &AnimationDocument,
    frame: usize,
    replacement: Override<'_>,
) {
    for layer in doc.layers().iter().filter(|l| l.visible) {
        let buf = match replacement {
            Some((index, stand_in)) if index == layer.index => Some(stand_in),
            _ => layer.frame(frame),
        };
        if let Some(buf) = buf {
            out.composite(
                buf,
                0,
                0,
                layer.opacity() as f32 / 100.0,
                CompositionMode::SourceOver,
            );
        }
    }
}

fn paint_tinted(
    out: &mut RasterBuffer,
    doc: &AnimationDocument,
    frame: usize,
    tint: Color,
    opacity: f32,
) {
    for layer in doc.layers().iter().filter(|l| l.visible) {
        if let Some(buf) = layer.frame(frame) {
            out.composite(&tinted(buf, tint), 0, 0, opacity, CompositionMode::SourceOver);
        }
    }
}

/// Visible layers at `frame` blended bottom to top over transparency.
pub fn render_frame(doc: &AnimationDocument, frame: usize) -> EditorResult<RasterBuffer> {
    let mut out = RasterBuffer::new(doc.width(), doc.height())?;
    paint_layers(&mut out, doc, frame, None);
    Ok(out)
}

/// `render_frame` with onion-skin neighbours underneath when enabled.
pub fn render_with_onion(
    doc: &AnimationDocument,
    frame: usize,
    onion: &OnionSkin,
) -> EditorResult<RasterBuffer> {
    render_onion_inner(doc, frame, onion, None)
}

/// Onion render with one layer's frame replaced, used for in-progress strokes and
/// selection transforms that are not yet committed.
pub fn render_preview(
    doc: &AnimationDocument,
    frame: usize,
    onion: &OnionSkin,
    layer_index: usize,
    replacement: &RasterBuffer,
) -> EditorResult<RasterBuffer> {
    render_onion_inner(doc, frame, onion, Some((layer_index, replacement)))
}

fn render_onion_inner(
    doc: &AnimationDocument,
    frame: usize,
    onion: &OnionSkin,
    replacement: Override<'_>,
) -> EditorResult<RasterBuffer> {
    let mut out = RasterBuffer::new(doc.width(), doc.height())?;
    if onion.enabled {
        let total = doc.frame_count();
        // farthest first so nearer frames land on top
        for k in (1..=onion.depth()).rev() {
            let opacity = onion.opacity_at(k);
            if let Some(past) = frame.checked_sub(k) {
                paint_tinted(&mut out, doc, past, onion.past_tint, opacity);
            }
            if frame + k < total {
                paint_tinted(&mut out, doc, frame + k, onion.future_tint, opacity);
            }
        }
    }
    paint_layers(&mut out, doc, frame, replacement);
    Ok(out)
}

/// Export rendering: starts from the opaque background colour.
pub fn render_export(doc: &AnimationDocument, frame: usize) -> EditorResult<RasterBuffer> {
    let mut out = RasterBuffer::new(doc.width(), doc.height())?;
    out.fill(doc.background.with_alpha(255));
    paint_layers(&mut out, doc, frame, None);
    Ok(out)
}
