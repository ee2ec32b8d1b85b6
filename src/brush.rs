use crate::raster::{blend_pixel, Color, CompositionMode, RasterBuffer};

pub const MIN_PEN_SIZE: u32 = 1;
pub const MAX_PEN_SIZE: u32 = 50;
pub const MIN_AA_QUALITY: u8 = 1;
pub const MAX_AA_QUALITY: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Pencil,
    Eraser,
    Bucket,
    Selection,
}

/// Stroke edge rendering.
///
/// Quality sets how wide the soft edge is: 1 is half a pixel, 2 one pixel, 3 a pixel and a
/// half. Disabled strokes have hard edges, every pixel fully in or out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AntiAliasing {
    pub enabled: bool,
    quality: u8,
}

impl AntiAliasing {
    pub fn new(enabled: bool, quality: u8) -> Self {
        Self {
            enabled,
            quality: quality.clamp(MIN_AA_QUALITY, MAX_AA_QUALITY),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn set_quality(&mut self, quality: u8) {
        self.quality = quality.clamp(MIN_AA_QUALITY, MAX_AA_QUALITY);
    }

    /// Coverage of a pixel whose centre lies `distance` from the stroke's spine.
    fn coverage(&self, radius: f32, distance: f32) -> f32 {
        if !self.enabled {
            return if distance <= radius { 1.0 } else { 0.0 };
        }
        let band = self.quality as f32 * 0.5;
        ((radius + band / 2.0 - distance) / band).clamp(0.0, 1.0)
    }
}

impl Default for AntiAliasing {
    fn default() -> Self {
        Self::new(true, 2)
    }
}

/// Resolved drawing pen. Caps and joins are always round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PenConfig {
    pub color: Color,
    pub width: f32,
    pub mode: CompositionMode,
    pub anti_aliasing: AntiAliasing,
}

/// Pen for a tool: opacity scales the colour's alpha; the eraser clears instead of painting.
pub fn pen_for(
    tool: Tool,
    color: Color,
    size: u32,
    opacity_percent: u8,
    anti_aliasing: AntiAliasing,
) -> PenConfig {
    let width = size.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE) as f32;
    match tool {
        Tool::Eraser => PenConfig {
            color: Color::TRANSPARENT,
            width,
            mode: CompositionMode::Clear,
            anti_aliasing,
        },
        _ => {
            let alpha = color.a as u32 * opacity_percent.min(100) as u32 / 100;
            PenConfig {
                color: color.with_alpha(alpha as u8),
                width,
                mode: CompositionMode::SourceOver,
                anti_aliasing,
            }
        }
    }
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// Stroke a polyline with round caps and joins, edges per the pen's anti-aliasing.
///
/// Coverage is accumulated per pixel across all segments before blending, so overlapping
/// segments of one stroke never darken each other.
pub fn draw_path(buffer: &mut RasterBuffer, path: &[(f32, f32)], pen: &PenConfig) {
    let Some(&first) = path.first() else {
        return;
    };
    let radius = pen.width / 2.0;
    let reach = radius + 1.0;

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
    for &(x, y) in path {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let x0 = ((min_x - reach).floor() as i64).max(0);
    let y0 = ((min_y - reach).floor() as i64).max(0);
    let x1 = ((max_x + reach).ceil() as i64).min(buffer.width() as i64 - 1);
    let y1 = ((max_y + reach).ceil() as i64).min(buffer.height() as i64 - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    let mask_w = (x1 - x0 + 1) as usize;
    let mut mask = vec![0.0f32; mask_w * (y1 - y0 + 1) as usize];

    let segments: Vec<((f32, f32), (f32, f32))> = if path.len() == 1 {
        vec![(first, first)]
    } else {
        path.windows(2).map(|w| (w[0], w[1])).collect()
    };
    for (a, b) in segments {
        let sx0 = ((a.0.min(b.0) - reach).floor() as i64).max(x0);
        let sy0 = ((a.1.min(b.1) - reach).floor() as i64).max(y0);
        let sx1 = ((a.0.max(b.0) + reach).ceil() as i64).min(x1);
        let sy1 = ((a.1.max(b.1) + reach).ceil() as i64).min(y1);
        for y in sy0..=sy1 {
            for x in sx0..=sx1 {
                let d = segment_distance((x as f32 + 0.5, y as f32 + 0.5), a, b);
                let coverage = pen.anti_aliasing.coverage(radius, d);
                let slot = &mut mask[(y - y0) as usize * mask_w + (x - x0) as usize];
                *slot = slot.max(coverage);
            }
        }
    }

    let src = pen.color.premultiplied();
    for (i, &coverage) in mask.iter().enumerate() {
        if coverage <= 0.0 {
            continue;
        }
        let x = x0 as u32 + (i % mask_w) as u32;
        let y = y0 as u32 + (i / mask_w) as u32;
        blend_pixel(buffer.pixel_mut(x, y), src, coverage, pen.mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eraser_pen_clears() {
        let pen = pen_for(Tool::Eraser, Color::RED, 8, 100, AntiAliasing::default());
        assert_eq!(pen.mode, CompositionMode::Clear);
        assert_eq!(pen.width, 8.0);
    }

    #[test]
    fn pencil_opacity_scales_alpha() {
        let pen = pen_for(Tool::Pencil, Color::RED, 3, 50, AntiAliasing::default());
        assert_eq!(pen.mode, CompositionMode::SourceOver);
        assert_eq!(pen.color, Color::rgba(255, 0, 0, 127));
    }

    #[test]
    fn horizontal_red_line_is_opaque_on_the_line_only() {
        let mut frame = RasterBuffer::new(800, 600).unwrap();
        let pen = pen_for(Tool::Pencil, Color::RED, 5, 100, AntiAliasing::default());
        let path: Vec<_> = (0..=20).map(|i| (i as f32 * 5.0, 300.0)).collect();
        draw_path(&mut frame, &path, &pen);
        for x in 0..=100 {
            assert_eq!(frame.get_pixel(x, 300), [255, 0, 0, 255], "x = {x}");
            assert_eq!(frame.get_pixel(x, 290), [0, 0, 0, 0]);
            assert_eq!(frame.get_pixel(x, 310), [0, 0, 0, 0]);
        }
        assert_eq!(frame.get_pixel(110, 300), [0, 0, 0, 0]);
    }

    #[test]
    fn single_point_draws_a_round_dot() {
        let mut frame = RasterBuffer::new(20, 20).unwrap();
        let pen = pen_for(Tool::Pencil, Color::BLUE, 6, 100, AntiAliasing::default());
        draw_path(&mut frame, &[(10.0, 10.0)], &pen);
        assert_eq!(frame.get_pixel(10, 10), Color::BLUE.premultiplied());
        assert_eq!(frame.get_pixel(10, 3), [0, 0, 0, 0]);
        assert_eq!(frame.get_pixel(15, 15), [0, 0, 0, 0]);
    }

    #[test]
    fn overlapping_segments_do_not_double_blend() {
        let mut frame = RasterBuffer::new(40, 10).unwrap();
        let pen = pen_for(Tool::Pencil, Color::RED, 4, 50, AntiAliasing::default());
        draw_path(&mut frame, &[(5.0, 5.0), (30.0, 5.0), (5.0, 5.0)], &pen);
        assert_eq!(frame.get_pixel(15, 5)[3], 127);
    }

    #[test]
    fn disabled_anti_aliasing_leaves_hard_edges() {
        let path = [(2.0, 10.0), (38.0, 10.0)];
        let mut hard = RasterBuffer::new(40, 20).unwrap();
        let aa = AntiAliasing::new(false, 2);
        draw_path(&mut hard, &path, &pen_for(Tool::Pencil, Color::BLACK, 5, 100, aa));
        for y in 0..20 {
            let alpha = hard.get_pixel(20, y)[3];
            assert!(alpha == 0 || alpha == 255, "y = {y}, alpha = {alpha}");
        }
        // centres 7.5..=12.5 lie within the 2.5 radius
        assert_eq!(hard.get_pixel(20, 7)[3], 255);
        assert_eq!(hard.get_pixel(20, 12)[3], 255);
        assert_eq!(hard.get_pixel(20, 6)[3], 0);

        let mut soft = RasterBuffer::new(40, 20).unwrap();
        let pen = pen_for(Tool::Pencil, Color::BLACK, 5, 100, AntiAliasing::default());
        draw_path(&mut soft, &path, &pen);
        let edge = soft.get_pixel(20, 12)[3];
        assert!(edge > 0 && edge < 255, "edge alpha {edge}");
    }

    #[test]
    fn higher_quality_widens_the_soft_edge() {
        let path = [(2.0, 10.0), (38.0, 10.0)];
        let alpha_at = |quality: u8, y: u32| {
            let mut frame = RasterBuffer::new(40, 20).unwrap();
            let aa = AntiAliasing::new(true, quality);
            draw_path(&mut frame, &path, &pen_for(Tool::Pencil, Color::BLACK, 4, 100, aa));
            frame.get_pixel(20, y)[3]
        };
        // pixel centre 12.5 sits half a pixel outside the 2.0 radius
        assert_eq!(alpha_at(1, 12), 0);
        assert!(alpha_at(3, 12) > alpha_at(2, 12));
        assert_eq!(alpha_at(2, 10), 255);
        assert_eq!(AntiAliasing::new(true, 9).quality(), MAX_AA_QUALITY);
        assert_eq!(AntiAliasing::new(true, 0).quality(), MIN_AA_QUALITY);
    }

    #[test]
    fn pen_width_is_clamped() {
        let aa = AntiAliasing::default();
        assert_eq!(pen_for(Tool::Pencil, Color::RED, 0, 100, aa).width, 1.0);
        assert_eq!(pen_for(Tool::Pencil, Color::RED, 80, 100, aa).width, 50.0);
    }

    #[test]
    fn eraser_path_removes_paint() {
        let mut frame = RasterBuffer::new(30, 30).unwrap();
        frame.fill(Color::RED);
        let pen = pen_for(Tool::Eraser, Color::BLACK, 6, 100, AntiAliasing::default());
        draw_path(&mut frame, &[(0.0, 15.0), (30.0, 15.0)], &pen);
        assert_eq!(frame.get_pixel(12, 15), [0, 0, 0, 0]);
        assert_eq!(frame.get_pixel(12, 2), Color::RED.premultiplied());
    }
}
