use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::{EditorError, EditorResult};

/// Straight-alpha RGBA colour as picked by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Packed premultiplied pixel value.
    pub fn premultiplied(self) -> [u8; 4] {
        let a = self.a as u32;
        let mul = |c: u8| ((c as u32 * a + 127) / 255) as u8;
        [mul(self.r), mul(self.g), mul(self.b), self.a]
    }

    pub fn from_premultiplied(px: [u8; 4]) -> Self {
        let a = px[3] as u32;
        if a == 0 {
            return Color::TRANSPARENT;
        }
        let div = |c: u8| ((c as u32 * 255 + a / 2) / a).min(255) as u8;
        Self::rgba(div(px[0]), div(px[1]), div(px[2]), px[3])
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid colour '{value}'"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Blending rule applied when drawing onto a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositionMode {
    SourceOver,
    Clear,
    SourceAtop,
}

/// Blend one premultiplied source pixel into `dst`.
///
/// For `Clear`, `opacity` acts as coverage: the destination is scaled by `1 - opacity`.
pub(crate) fn blend_pixel(dst: &mut [u8], src: [u8; 4], opacity: f32, mode: CompositionMode) {
    let op = opacity.clamp(0.0, 1.0);
    match mode {
        CompositionMode::SourceOver => {
            let keep = 1.0 - (src[3] as f32 / 255.0) * op;
            for i in 0..4 {
                let v = src[i] as f32 * op + dst[i] as f32 * keep;
                dst[i] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
        CompositionMode::Clear => {
            let keep = 1.0 - op;
            for v in dst.iter_mut().take(4) {
                *v = (*v as f32 * keep).round() as u8;
            }
        }
        CompositionMode::SourceAtop => {
            let da = dst[3] as f32 / 255.0;
            let keep = 1.0 - (src[3] as f32 / 255.0) * op;
            for i in 0..3 {
                let v = src[i] as f32 * op * da + dst[i] as f32 * keep;
                dst[i] = v.round().clamp(0.0, dst[3] as f32) as u8;
            }
        }
    }
}

/// Fixed-size premultiplied RGBA8 pixel surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>, // premultiplied RGBA8, row-major
}

impl RasterBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> EditorResult<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Premultiplied pixel; transparent when out of range.
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let idx = self.offset(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.pixels[idx..idx + 4]);
        px
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        if x < self.width && y < self.height {
            let idx = self.offset(x, y);
            self.pixels[idx..idx + 4].copy_from_slice(&px);
        }
    }

    pub fn color_at(&self, x: u32, y: u32) -> Color {
        Color::from_premultiplied(self.get_pixel(x, y))
    }

    pub(crate) fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let idx = self.offset(x, y);
        &mut self.pixels[idx..idx + 4]
    }

    pub fn fill(&mut self, color: Color) {
        let px = color.premultiplied();
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Blend `src` into this buffer with its top-left corner at `(dx, dy)`.
    pub fn composite(
        &mut self,
        src: &RasterBuffer,
        dx: i32,
        dy: i32,
        opacity: f32,
        mode: CompositionMode,
    ) {
        let x0 = (dx as i64).max(0);
        let y0 = (dy as i64).max(0);
        let x1 = (dx as i64 + src.width as i64).min(self.width as i64);
        let y1 = (dy as i64 + src.height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for y in y0..y1 {
            for x in x0..x1 {
                let s = src.get_pixel((x - dx as i64) as u32, (y - dy as i64) as u32);
                let d = self.pixel_mut(x as u32, y as u32);
                match mode {
                    CompositionMode::Clear => blend_pixel(d, s, 1.0, mode),
                    _ => blend_pixel(d, s, opacity, mode),
                }
            }
        }
    }

    /// Paint a solid rectangle (clipped to the buffer) with the given mode.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color, mode: CompositionMode) {
        let x0 = (x as i64).max(0);
        let y0 = (y as i64).max(0);
        let x1 = (x as i64 + w as i64).min(self.width as i64);
        let y1 = (y as i64 + h as i64).min(self.height as i64);
        let px = color.premultiplied();
        for yy in y0..y1 {
            for xx in x0..x1 {
                blend_pixel(self.pixel_mut(xx as u32, yy as u32), px, 1.0, mode);
            }
        }
    }

    /// Copy of the `w`x`h` region at `(x, y)`; parts outside the buffer are transparent.
    pub fn crop(&self, x: i32, y: i32, w: u32, h: u32) -> EditorResult<RasterBuffer> {
        let mut out = RasterBuffer::new(w, h)?;
        for yy in 0..h {
            for xx in 0..w {
                let sx = x as i64 + xx as i64;
                let sy = y as i64 + yy as i64;
                if self.contains(sx, sy) {
                    out.set_pixel(xx, yy, self.get_pixel(sx as u32, sy as u32));
                }
            }
        }
        Ok(out)
    }

    /// New buffer of the given size with this content top-left aligned, cropped or padded.
    pub fn resized_canvas(&self, width: u32, height: u32) -> EditorResult<RasterBuffer> {
        let mut out = RasterBuffer::new(width, height)?;
        out.composite(self, 0, 0, 1.0, CompositionMode::SourceOver);
        Ok(out)
    }

    /// Independent-axis smooth resampling.
    pub fn scaled(&self, width: u32, height: u32) -> EditorResult<RasterBuffer> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension { width, height });
        }
        if (width, height) == self.dimensions() {
            return Ok(self.clone());
        }
        let resized = imageops::resize(&self.as_image(), width, height, FilterType::Triangle);
        Ok(Self::from_image_raw(resized))
    }

    pub fn mirrored(&self, horizontal: bool, vertical: bool) -> RasterBuffer {
        let mut img = self.as_image();
        if horizontal {
            img = imageops::flip_horizontal(&img);
        }
        if vertical {
            img = imageops::flip_vertical(&img);
        }
        Self::from_image_raw(img)
    }

    /// Rotate about the centre into the bounding box of the rotated rectangle.
    ///
    /// Positive angles turn clockwise on screen (y grows downward).
    pub fn rotated(&self, degrees: f64) -> RasterBuffer {
        let theta = degrees.to_radians();
        let (sin, cos) = theta.sin_cos();
        let (w, h) = (self.width as f64, self.height as f64);
        let out_w = ((w * cos.abs() + h * sin.abs()) - 1e-6).ceil().max(1.0) as u32;
        let out_h = ((w * sin.abs() + h * cos.abs()) - 1e-6).ceil().max(1.0) as u32;

        let mut out = Self {
            width: out_w,
            height: out_h,
            pixels: vec![0; out_w as usize * out_h as usize * 4],
        };
        let (ocx, ocy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);
        for y in 0..out_h {
            for x in 0..out_w {
                let dx = x as f64 + 0.5 - ocx;
                let dy = y as f64 + 0.5 - ocy;
                let sx = cos * dx + sin * dy + w / 2.0;
                let sy = -sin * dx + cos * dy + h / 2.0;
                let s = self.sample_bilinear(sx, sy);
                let px = [
                    s[0].round() as u8,
                    s[1].round() as u8,
                    s[2].round() as u8,
                    s[3].round() as u8,
                ];
                out.set_pixel(x, y, px);
            }
        }
        out
    }

    /// Bilinear sample at a continuous position; pixel centres sit at `i + 0.5`.
    fn sample_bilinear(&self, x: f64, y: f64) -> [f64; 4] {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let mut acc = [0.0f64; 4];
        for (ox, oy, weight) in [
            (0i64, 0i64, (1.0 - tx) * (1.0 - ty)),
            (1, 0, tx * (1.0 - ty)),
            (0, 1, (1.0 - tx) * ty),
            (1, 1, tx * ty),
        ] {
            if weight == 0.0 {
                continue;
            }
            let px = x0 as i64 + ox;
            let py = y0 as i64 + oy;
            if !self.contains(px, py) {
                continue;
            }
            let p = self.get_pixel(px as u32, py as u32);
            for c in 0..4 {
                acc[c] += p[c] as f64 * weight;
            }
        }
        acc
    }

    /// Straight-alpha image for encoding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let c = Color::from_premultiplied(self.get_pixel(x, y));
            Rgba([c.r, c.g, c.b, c.a])
        })
    }

    /// Premultiply a decoded straight-alpha image.
    pub fn from_rgba_image(img: &RgbaImage) -> EditorResult<Self> {
        let (width, height) = img.dimensions();
        let mut out = RasterBuffer::new(width, height)?;
        for (x, y, px) in img.enumerate_pixels() {
            let [r, g, b, a] = px.0;
            out.set_pixel(x, y, Color::rgba(r, g, b, a).premultiplied());
        }
        Ok(out)
    }

    // Raw premultiplied view for the linear filters in `imageops`.
    fn as_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| Rgba(self.get_pixel(x, y)))
    }

    fn from_image_raw(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: Color) -> RasterBuffer {
        let mut buf = RasterBuffer::new(w, h).unwrap();
        buf.fill(color);
        buf
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            RasterBuffer::new(0, 10),
            Err(EditorError::InvalidDimension { width: 0, height: 10 })
        ));
        assert!(RasterBuffer::new(3, 0).is_err());
    }

    #[test]
    fn new_buffer_is_transparent() {
        let buf = RasterBuffer::new(4, 3).unwrap();
        assert!(buf.is_blank());
        assert_eq!(buf.pixels().len(), 48);
        assert_eq!(buf.get_pixel(10, 10), [0, 0, 0, 0]);
    }

    #[test]
    fn premultiply_round_trips_through_straight_alpha() {
        for a in [0u8, 1, 77, 128, 200, 255] {
            for c in [0u8, 3, 99, 180, 255] {
                let px = Color::rgba(c, 255 - c, c / 2, a).premultiplied();
                assert_eq!(Color::from_premultiplied(px).premultiplied(), px);
            }
        }
    }

    #[test]
    fn hex_colours_parse_and_print() {
        assert_eq!(Color::from_hex("#c7c7c7"), Some(Color::rgb(199, 199, 199)));
        assert_eq!(Color::from_hex("#ff000080"), Some(Color::rgba(255, 0, 0, 128)));
        assert_eq!(Color::rgb(1, 2, 3).to_hex(), "#010203");
        assert_eq!(Color::from_hex("c7c7c7"), None);
        assert_eq!(Color::from_hex("#12345"), None);
    }

    #[test]
    fn opaque_source_over_replaces_destination() {
        let mut dst = solid(3, 3, Color::BLUE);
        let src = solid(3, 3, Color::RED);
        dst.composite(&src, 0, 0, 1.0, CompositionMode::SourceOver);
        assert_eq!(dst, src);
    }

    #[test]
    fn source_over_respects_opacity() {
        let mut dst = RasterBuffer::new(1, 1).unwrap();
        let src = solid(1, 1, Color::RED);
        dst.composite(&src, 0, 0, 0.5, CompositionMode::SourceOver);
        assert_eq!(dst.get_pixel(0, 0), [128, 0, 0, 128]);
    }

    #[test]
    fn clear_zeroes_the_covered_region_only() {
        let mut dst = solid(4, 4, Color::RED);
        let src = solid(2, 2, Color::WHITE);
        dst.composite(&src, 1, 1, 1.0, CompositionMode::Clear);
        assert_eq!(dst.get_pixel(1, 1), [0, 0, 0, 0]);
        assert_eq!(dst.get_pixel(2, 2), [0, 0, 0, 0]);
        assert_eq!(dst.get_pixel(0, 0), Color::RED.premultiplied());
        assert_eq!(dst.get_pixel(3, 3), Color::RED.premultiplied());
    }

    #[test]
    fn source_atop_keeps_destination_alpha() {
        let mut dst = RasterBuffer::new(2, 1).unwrap();
        dst.set_pixel(0, 0, Color::rgba(255, 255, 255, 128).premultiplied());
        dst.fill_rect(0, 0, 2, 1, Color::BLUE, CompositionMode::SourceAtop);
        assert_eq!(dst.get_pixel(0, 0), [0, 0, 128, 128]);
        assert_eq!(dst.get_pixel(1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn composite_clips_negative_offsets() {
        let mut dst = RasterBuffer::new(4, 4).unwrap();
        let src = solid(3, 3, Color::RED);
        dst.composite(&src, -2, -2, 1.0, CompositionMode::SourceOver);
        assert_eq!(dst.get_pixel(0, 0), Color::RED.premultiplied());
        assert_eq!(dst.get_pixel(1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn crop_pads_outside_with_transparency() {
        let buf = solid(4, 4, Color::RED);
        let part = buf.crop(2, 2, 4, 4).unwrap();
        assert_eq!(part.get_pixel(1, 1), Color::RED.premultiplied());
        assert_eq!(part.get_pixel(2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn resized_canvas_is_top_left_aligned() {
        let mut buf = RasterBuffer::new(4, 4).unwrap();
        buf.set_pixel(3, 3, Color::RED.premultiplied());
        buf.set_pixel(0, 0, Color::BLUE.premultiplied());
        let bigger = buf.resized_canvas(6, 5).unwrap();
        assert_eq!(bigger.dimensions(), (6, 5));
        assert_eq!(bigger.get_pixel(3, 3), Color::RED.premultiplied());
        assert_eq!(bigger.get_pixel(5, 4), [0, 0, 0, 0]);
        let smaller = buf.resized_canvas(2, 2).unwrap();
        assert_eq!(smaller.get_pixel(0, 0), Color::BLUE.premultiplied());
    }

    #[test]
    fn mirrored_flips_columns() {
        let mut buf = RasterBuffer::new(3, 1).unwrap();
        buf.set_pixel(0, 0, Color::RED.premultiplied());
        let flipped = buf.mirrored(true, false);
        assert_eq!(flipped.get_pixel(2, 0), Color::RED.premultiplied());
        assert_eq!(flipped.get_pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn zero_rotation_is_identity() {
        let mut buf = RasterBuffer::new(5, 3).unwrap();
        buf.set_pixel(1, 2, Color::RED.premultiplied());
        assert_eq!(buf.rotated(0.0), buf);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let mut buf = RasterBuffer::new(6, 2).unwrap();
        buf.fill(Color::RED);
        let turned = buf.rotated(90.0);
        assert_eq!(turned.dimensions(), (2, 6));
        assert_eq!(turned.get_pixel(1, 3), Color::RED.premultiplied());
    }

    #[test]
    fn scaled_changes_each_axis_independently() {
        let buf = solid(4, 4, Color::RED);
        let scaled = buf.scaled(8, 2).unwrap();
        assert_eq!(scaled.dimensions(), (8, 2));
        assert_eq!(scaled.get_pixel(4, 1), Color::RED.premultiplied());
    }
}
