use log::debug;

use crate::error::{Declined, EditorResult};
use crate::raster::{Color, RasterBuffer};

pub const DEFAULT_TOLERANCE: u8 = 150;

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// Explicit-stack, 8-connected flood fill with a per-channel colour tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloodFillEngine {
    pub tolerance: u8,
}

impl Default for FloodFillEngine {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl FloodFillEngine {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    fn matches(&self, a: Color, b: Color) -> bool {
        let t = self.tolerance as i16;
        [(a.r, b.r), (a.g, b.g), (a.b, b.b), (a.a, b.a)]
            .iter()
            .all(|&(x, y)| (x as i16 - y as i16).abs() <= t)
    }

    /// Fill the region around `start` with `target`; returns the number of pixels written.
    ///
    /// A start outside the buffer writes nothing. A start pixel already equal to `target`
    /// is declined and leaves the buffer untouched.
    pub fn fill(
        &self,
        buffer: &mut RasterBuffer,
        start: (i64, i64),
        target: Color,
    ) -> EditorResult<usize> {
        if !buffer.contains(start.0, start.1) {
            return Ok(0);
        }
        let (sx, sy) = (start.0 as u32, start.1 as u32);
        let replacement = target.premultiplied();
        if buffer.get_pixel(sx, sy) == replacement {
            return Err(Declined::AlreadyFilled.into());
        }
        let seed = buffer.color_at(sx, sy);

        let width = buffer.width() as usize;
        let mut visited = vec![false; width * buffer.height() as usize];
        let mut stack = vec![(sx, sy)];
        let mut filled = 0;

        while let Some((x, y)) = stack.pop() {
            let slot = y as usize * width + x as usize;
            if visited[slot] {
                continue;
            }
            visited[slot] = true;
            if !self.matches(buffer.color_at(x, y), seed) {
                continue;
            }
            buffer.set_pixel(x, y, replacement);
            filled += 1;

            for (dx, dy) in NEIGHBOURS {
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if buffer.contains(nx, ny) && !visited[ny as usize * width + nx as usize] {
                    stack.push((nx as u32, ny as u32));
                }
            }
        }
        debug!("flood fill from ({sx}, {sy}) wrote {filled} pixels");
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use crate::raster::CompositionMode;

    fn blue_square() -> RasterBuffer {
        let mut buf = RasterBuffer::new(50, 50).unwrap();
        buf.fill_rect(10, 10, 20, 20, Color::BLUE, CompositionMode::SourceOver);
        // soft near-blue rim, as left by an anti-aliased edge
        let rim = Color::rgba(60, 60, 200, 180).premultiplied();
        for i in 9..31 {
            buf.set_pixel(i, 9, rim);
            buf.set_pixel(i, 30, rim);
            buf.set_pixel(9, i, rim);
            buf.set_pixel(30, i, rim);
        }
        buf
    }

    #[test]
    fn fill_covers_square_and_rim_but_not_outside() {
        let mut buf = blue_square();
        let green = Color::rgb(0, 255, 0);
        let filled = FloodFillEngine::default().fill(&mut buf, (20, 20), green).unwrap();
        assert_eq!(filled, 22 * 22);
        assert_eq!(buf.get_pixel(20, 20), green.premultiplied());
        assert_eq!(buf.get_pixel(9, 9), green.premultiplied());
        assert_eq!(buf.get_pixel(30, 15), green.premultiplied());
        assert_eq!(buf.get_pixel(8, 20), [0, 0, 0, 0]);
        assert_eq!(buf.get_pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn filling_with_the_existing_colour_is_declined() {
        let mut buf = blue_square();
        let before = buf.clone();
        let err = FloodFillEngine::default()
            .fill(&mut buf, (20, 20), Color::BLUE)
            .unwrap_err();
        assert!(matches!(err, EditorError::Declined(Declined::AlreadyFilled)));
        assert_eq!(buf, before);
    }

    #[test]
    fn diagonal_neighbours_are_reached() {
        let mut buf = RasterBuffer::new(3, 3).unwrap();
        buf.fill(Color::WHITE);
        let black = Color::BLACK.premultiplied();
        for (x, y) in [(1, 0), (0, 1), (2, 1), (1, 2)] {
            buf.set_pixel(x, y, black);
        }
        let filled = FloodFillEngine::new(0)
            .fill(&mut buf, (1, 1), Color::RED)
            .unwrap();
        assert_eq!(filled, 5);
        assert_eq!(buf.get_pixel(0, 0), Color::RED.premultiplied());
        assert_eq!(buf.get_pixel(1, 0), black);
    }

    #[test]
    fn start_outside_the_buffer_is_a_no_op() {
        let mut buf = RasterBuffer::new(4, 4).unwrap();
        assert_eq!(
            FloodFillEngine::default().fill(&mut buf, (-1, 2), Color::RED).unwrap(),
            0
        );
        assert!(buf.is_blank());
    }
}
