use crate::error::EditorResult;
use crate::raster::{blend_pixel, Color, CompositionMode, RasterBuffer};

pub const ZOOM_IN_FACTOR: f32 = 1.1;
pub const ZOOM_OUT_FACTOR: f32 = 0.9;
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 10.0;
pub const PAN_STEP: f32 = 20.0;
/// Window area around the document.
pub const SURROUND: Color = Color::rgb(0x3a, 0x3a, 0x3a);

/// Pan/zoom mapping between window pixels and document pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub offset: (f32, f32),
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            offset: (0.0, 0.0),
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn to_document(&self, device: (f32, f32)) -> (f32, f32) {
        (
            (device.0 - self.offset.0) / self.scale,
            (device.1 - self.offset.1) / self.scale,
        )
    }

    pub fn to_device(&self, doc: (f32, f32)) -> (f32, f32) {
        (
            doc.0 * self.scale + self.offset.0,
            doc.1 * self.scale + self.offset.1,
        )
    }

    /// One zoom step about `cursor`; the document point under it stays put.
    pub fn zoom_at(&mut self, cursor: (f32, f32), zoom_in: bool) {
        let anchor = self.to_document(cursor);
        let factor = if zoom_in { ZOOM_IN_FACTOR } else { ZOOM_OUT_FACTOR };
        self.scale = (self.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.offset = (
            cursor.0 - anchor.0 * self.scale,
            cursor.1 - anchor.1 * self.scale,
        );
    }

    pub fn pan_horizontal(&mut self, notches: f32) {
        self.offset.0 += notches * PAN_STEP;
    }

    pub fn pan_vertical(&mut self, notches: f32) {
        self.offset.1 += notches * PAN_STEP;
    }

    /// Centre a `doc_w`x`doc_h` document in the window at the current zoom.
    pub fn center(&mut self, doc_w: u32, doc_h: u32, out_w: u32, out_h: u32) {
        self.offset = (
            (out_w as f32 - doc_w as f32 * self.scale) / 2.0,
            (out_h as f32 - doc_h as f32 * self.scale) / 2.0,
        );
    }

    /// Window-sized opaque image: the document over its background, surrounded by `SURROUND`.
    pub fn present(
        &self,
        image: &RasterBuffer,
        background: Color,
        out_w: u32,
        out_h: u32,
    ) -> EditorResult<RasterBuffer> {
        let mut out = RasterBuffer::new(out_w, out_h)?;
        out.fill(SURROUND);
        let backdrop = background.with_alpha(255).premultiplied();
        for y in 0..out_h {
            for x in 0..out_w {
                let (dx, dy) = self.to_document((x as f32 + 0.5, y as f32 + 0.5));
                let (px, py) = (dx.floor() as i64, dy.floor() as i64);
                if !image.contains(px, py) {
                    continue;
                }
                let dst = out.pixel_mut(x, y);
                dst.copy_from_slice(&backdrop);
                let src = image.get_pixel(px as u32, py as u32);
                blend_pixel(dst, src, 1.0, CompositionMode::SourceOver);
            }
        }
        Ok(out)
    }
}

/// Pointer-down to pointer-up point capture.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    pub drawing: bool,
    pub last_pos: Option<(f32, f32)>,
    points: Vec<(f32, f32)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_drawing(&mut self, pos: (f32, f32)) {
        self.drawing = true;
        self.last_pos = Some(pos);
        self.points.clear();
        self.points.push(pos);
    }

    /// Record a point while drawing; repeated positions are ignored.
    pub fn record(&mut self, pos: (f32, f32)) -> bool {
        if !self.drawing || self.last_pos == Some(pos) {
            return false;
        }
        self.last_pos = Some(pos);
        self.points.push(pos);
        true
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    pub fn stop_drawing(&mut self) -> Vec<(f32, f32)> {
        self.drawing = false;
        self.last_pos = None;
        std::mem::take(&mut self.points)
    }
}
