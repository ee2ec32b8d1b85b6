//! Rectangular selection with move, scale (mirroring on overdrag) and rotate gestures.
//!
//! The selected pixels stay in the frame until a transform gesture ends. At that point
//! the old footprint is cleared and the transformed content is drawn at the new rectangle.

use log::debug;

use crate::error::{Declined, EditorResult};
use crate::raster::{Color, CompositionMode, RasterBuffer};

pub const HANDLE_SIZE: i32 = 8;
pub const ROTATION_HANDLE_DISTANCE: f32 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

/// Pointer shape the shell should show over a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorShape {
    Arrow,
    SizeVertical,
    SizeHorizontal,
    /// `\` diagonal.
    SizeFDiagonal,
    /// `/` diagonal.
    SizeBDiagonal,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::NW,
        Handle::N,
        Handle::NE,
        Handle::W,
        Handle::E,
        Handle::SW,
        Handle::S,
        Handle::SE,
    ];

    pub fn cursor(self) -> CursorShape {
        match self {
            Handle::NW | Handle::SE => CursorShape::SizeFDiagonal,
            Handle::NE | Handle::SW => CursorShape::SizeBDiagonal,
            Handle::N | Handle::S => CursorShape::SizeVertical,
            Handle::E | Handle::W => CursorShape::SizeHorizontal,
        }
    }

    fn moves_east(self) -> bool {
        matches!(self, Handle::E | Handle::NE | Handle::SE)
    }

    fn moves_west(self) -> bool {
        matches!(self, Handle::W | Handle::NW | Handle::SW)
    }

    fn moves_south(self) -> bool {
        matches!(self, Handle::S | Handle::SE | Handle::SW)
    }

    fn moves_north(self) -> bool {
        matches!(self, Handle::N | Handle::NE | Handle::NW)
    }

    /// Centre of this handle on `rect`.
    pub fn position(self, rect: Rect) -> (i32, i32) {
        let (x, y) = (rect.x, rect.y);
        let (w, h) = (rect.width as i32, rect.height as i32);
        match self {
            Handle::NW => (x, y),
            Handle::N => (x + w / 2, y),
            Handle::NE => (x + w, y),
            Handle::W => (x, y + h / 2),
            Handle::E => (x + w, y + h / 2),
            Handle::SW => (x, y + h),
            Handle::S => (x + w / 2, y + h),
            Handle::SE => (x + w, y + h),
        }
    }
}

/// Axis-aligned rectangle in document pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalised rectangle spanning two corners, whatever the drag direction.
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        Self::new(
            a.0.min(b.0),
            a.1.min(b.1),
            a.0.abs_diff(b.0),
            a.1.abs_diff(b.1),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn contains(&self, p: (i32, i32)) -> bool {
        p.0 >= self.x
            && p.1 >= self.y
            && (p.0 as i64) < self.x as i64 + self.width as i64
            && (p.1 as i64) < self.y as i64 + self.height as i64
    }
}

fn pixel(pos: (f32, f32)) -> (i32, i32) {
    (pos.0.floor() as i32, pos.1.floor() as i32)
}

fn angle_to(center: (f32, f32), pos: (f32, f32)) -> f32 {
    (pos.1 - center.1).atan2(pos.0 - center.0).to_degrees()
}

#[derive(Clone, Debug, PartialEq)]
enum Gesture {
    Idle,
    Selecting {
        anchor: (i32, i32),
    },
    Moving {
        grab: (i32, i32),
    },
    Scaling {
        handle: Handle,
        start: (i32, i32),
        original: Rect,
        flip_h: bool,
        flip_v: bool,
    },
    Rotating {
        start_angle: f32,
        base_angle: f32,
    },
}

#[derive(Clone, Debug)]
pub struct SelectionTransform {
    rect: Option<Rect>,
    content: Option<RasterBuffer>,
    // where `content` currently sits in the frame
    footprint: Option<Rect>,
    working: Option<RasterBuffer>,
    gesture: Gesture,
    rotation_angle: f32,
    flipped_h: bool,
    flipped_v: bool,
}

impl Default for SelectionTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionTransform {
    pub fn new() -> Self {
        Self {
            rect: None,
            content: None,
            footprint: None,
            working: None,
            gesture: Gesture::Idle,
            rotation_angle: 0.0,
            flipped_h: false,
            flipped_v: false,
        }
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn content(&self) -> Option<&RasterBuffer> {
        self.content.as_ref()
    }

    pub fn has_selection(&self) -> bool {
        self.content.is_some()
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.gesture, Gesture::Selecting { .. })
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.gesture, Gesture::Moving { .. })
    }

    pub fn is_scaling(&self) -> bool {
        matches!(self.gesture, Gesture::Scaling { .. })
    }

    pub fn is_rotating(&self) -> bool {
        matches!(self.gesture, Gesture::Rotating { .. })
    }

    pub fn active_handle(&self) -> Option<Handle> {
        match self.gesture {
            Gesture::Scaling { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Total rotation applied since the content was selected, in [0, 360).
    pub fn rotation_angle(&self) -> f32 {
        self.rotation_angle
    }

    pub fn flipped_horizontal(&self) -> bool {
        self.flipped_h
    }

    pub fn flipped_vertical(&self) -> bool {
        self.flipped_v
    }

    /// Drop the selection without touching any frame.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn start_selection(&mut self, pos: (f32, f32)) {
        self.clear();
        let anchor = pixel(pos);
        self.rect = Some(Rect::from_corners(anchor, anchor));
        self.gesture = Gesture::Selecting { anchor };
    }

    pub fn update_selection(&mut self, pos: (f32, f32)) {
        if let Gesture::Selecting { anchor } = self.gesture {
            self.rect = Some(Rect::from_corners(anchor, pixel(pos)));
        }
    }

    /// Commit the dragged rectangle, copying its pixels out of `frame`.
    ///
    /// Returns false when the rectangle is empty, which leaves no selection.
    pub fn end_selection(&mut self, frame: &RasterBuffer) -> EditorResult<bool> {
        if !self.is_selecting() {
            return Ok(false);
        }
        self.gesture = Gesture::Idle;
        match self.rect {
            Some(rect) if !rect.is_empty() => {
                self.content = Some(frame.crop(rect.x, rect.y, rect.width, rect.height)?);
                self.footprint = Some(rect);
                debug!("selected {rect:?}");
                Ok(true)
            }
            _ => {
                self.clear();
                Ok(false)
            }
        }
    }

    fn require_content(&self) -> EditorResult<(Rect, &RasterBuffer)> {
        match (self.rect, self.content.as_ref()) {
            (Some(rect), Some(content)) => Ok((rect, content)),
            _ => Err(Declined::NoSelection.into()),
        }
    }

    pub fn start_moving(&mut self, pos: (f32, f32)) -> EditorResult<()> {
        let (rect, content) = self.require_content()?;
        let p = pixel(pos);
        self.working = Some(content.clone());
        self.gesture = Gesture::Moving {
            grab: (p.0 - rect.x, p.1 - rect.y),
        };
        Ok(())
    }

    pub fn move_selection(&mut self, pos: (f32, f32)) {
        if let (Gesture::Moving { grab }, Some(rect)) = (&self.gesture, self.rect.as_mut()) {
            let p = pixel(pos);
            rect.x = p.0 - grab.0;
            rect.y = p.1 - grab.1;
        }
    }

    pub fn start_scaling(&mut self, pos: (f32, f32), handle: Handle) -> EditorResult<()> {
        let (rect, content) = self.require_content()?;
        self.working = Some(content.clone());
        self.gesture = Gesture::Scaling {
            handle,
            start: pixel(pos),
            original: rect,
            flip_h: false,
            flip_v: false,
        };
        Ok(())
    }

    /// Resize from the active handle; dragging past the opposite edge mirrors that axis.
    pub fn update_scaling(&mut self, pos: (f32, f32)) -> EditorResult<()> {
        let Gesture::Scaling {
            handle,
            start,
            original,
            ..
        } = self.gesture
        else {
            return Ok(());
        };
        let p = pixel(pos);
        let (dx, dy) = (p.0 - start.0, p.1 - start.1);
        let (ox, oy) = (original.x, original.y);
        let (ow, oh) = (original.width as i32, original.height as i32);

        let (mut x, mut w, mut flip_h) = (ox, ow, false);
        if handle.moves_east() {
            let span = ow + dx;
            if span < 0 {
                (x, w, flip_h) = (ox + span, -span, true);
            } else {
                w = span;
            }
        } else if handle.moves_west() {
            let span = ow - dx;
            if span < 0 {
                (x, w, flip_h) = (ox + ow, -span, true);
            } else {
                (x, w) = (ox + dx, span);
            }
        }

        let (mut y, mut h, mut flip_v) = (oy, oh, false);
        if handle.moves_south() {
            let span = oh + dy;
            if span < 0 {
                (y, h, flip_v) = (oy + span, -span, true);
            } else {
                h = span;
            }
        } else if handle.moves_north() {
            let span = oh - dy;
            if span < 0 {
                (y, h, flip_v) = (oy + oh, -span, true);
            } else {
                (y, h) = (oy + dy, span);
            }
        }

        let rect = Rect::new(x, y, w.max(1) as u32, h.max(1) as u32);
        let (_, content) = self.require_content()?;
        let scaled = content.scaled(rect.width, rect.height)?;
        self.working = Some(scaled.mirrored(flip_h, flip_v));
        self.rect = Some(rect);
        if let Gesture::Scaling {
            flip_h: fh,
            flip_v: fv,
            ..
        } = &mut self.gesture
        {
            *fh = flip_h;
            *fv = flip_v;
        }
        Ok(())
    }

    pub fn start_rotation(&mut self, pos: (f32, f32)) -> EditorResult<()> {
        let (rect, content) = self.require_content()?;
        self.working = Some(content.clone());
        self.gesture = Gesture::Rotating {
            start_angle: angle_to(rect.center(), pos),
            base_angle: self.rotation_angle,
        };
        Ok(())
    }

    /// Rotate about the rectangle's centre by the pointer's sweep since the gesture began.
    pub fn update_rotation(&mut self, pos: (f32, f32)) {
        let Gesture::Rotating {
            start_angle,
            base_angle,
        } = self.gesture
        else {
            return;
        };
        let (Some(rect), Some(content)) = (self.footprint_rect(), self.content.as_ref()) else {
            return;
        };
        let center = rect.center();
        let delta = angle_to(center, pos) - start_angle;
        let rotated = content.rotated(delta as f64);
        let (rw, rh) = rotated.dimensions();
        self.rect = Some(Rect::new(
            (center.0 - rw as f32 / 2.0).round() as i32,
            (center.1 - rh as f32 / 2.0).round() as i32,
            rw,
            rh,
        ));
        self.working = Some(rotated);
        self.rotation_angle = (base_angle + delta).rem_euclid(360.0);
    }

    // rect the content occupied when the current gesture started
    fn footprint_rect(&self) -> Option<Rect> {
        match self.gesture {
            Gesture::Rotating { .. } => self.footprint,
            _ => self.rect,
        }
    }

    /// Finish a move, scale or rotate gesture by repainting `frame`.
    ///
    /// Returns true when the frame changed and a history snapshot is due.
    pub fn end_transform(&mut self, frame: &mut RasterBuffer) -> EditorResult<bool> {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        if matches!(gesture, Gesture::Idle | Gesture::Selecting { .. }) {
            return Ok(false);
        }
        let (Some(rect), Some(working), Some(footprint)) =
            (self.rect, self.working.take(), self.footprint)
        else {
            return Ok(false);
        };

        if let Gesture::Scaling { flip_h, flip_v, .. } = gesture {
            self.flipped_h ^= flip_h;
            self.flipped_v ^= flip_v;
        }
        frame.fill_rect(
            footprint.x,
            footprint.y,
            footprint.width,
            footprint.height,
            Color::TRANSPARENT,
            CompositionMode::Clear,
        );
        frame.composite(&working, rect.x, rect.y, 1.0, CompositionMode::SourceOver);
        debug!("selection committed at {rect:?} from {footprint:?}");

        self.content = Some(working);
        self.footprint = Some(rect);
        Ok(true)
    }

    /// `frame` as it will look once the in-progress gesture is committed.
    pub fn preview(&self, frame: &RasterBuffer) -> RasterBuffer {
        let mut out = frame.clone();
        if let (Some(rect), Some(working), Some(footprint)) =
            (self.rect, self.working.as_ref(), self.footprint)
        {
            out.fill_rect(
                footprint.x,
                footprint.y,
                footprint.width,
                footprint.height,
                Color::TRANSPARENT,
                CompositionMode::Clear,
            );
            out.composite(working, rect.x, rect.y, 1.0, CompositionMode::SourceOver);
        }
        out
    }

    pub fn handle_at(&self, pos: (f32, f32)) -> Option<Handle> {
        let rect = self.rect?;
        let p = pixel(pos);
        let half = HANDLE_SIZE / 2;
        Handle::ALL.into_iter().find(|h| {
            let (cx, cy) = h.position(rect);
            Rect::new(cx - half, cy - half, HANDLE_SIZE as u32, HANDLE_SIZE as u32).contains(p)
        })
    }

    /// Centre of the rotation knob, drawn above the rectangle.
    pub fn rotation_handle_center(&self) -> Option<(f32, f32)> {
        let rect = self.rect?;
        Some((rect.center().0, rect.y as f32 - ROTATION_HANDLE_DISTANCE))
    }

    pub fn is_over_rotation_handle(&self, pos: (f32, f32)) -> bool {
        let Some((cx, cy)) = self.rotation_handle_center() else {
            return false;
        };
        let half = HANDLE_SIZE as f32 / 2.0;
        let left = (cx - half) as i32;
        let top = (cy - half) as i32;
        Rect::new(left, top, HANDLE_SIZE as u32, HANDLE_SIZE as u32).contains(pixel(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(tool: &mut SelectionTransform, frame: &RasterBuffer, a: (f32, f32), b: (f32, f32)) {
        tool.start_selection(a);
        tool.update_selection(b);
        assert!(tool.end_selection(frame).unwrap());
    }

    #[test]
    fn drag_direction_does_not_matter() {
        let mut tool = SelectionTransform::new();
        tool.start_selection((30.0, 20.0));
        tool.update_selection((10.0, 5.0));
        assert_eq!(tool.rect(), Some(Rect::new(10, 5, 20, 15)));
    }

    #[test]
    fn empty_rectangle_leaves_no_selection() {
        let frame = RasterBuffer::new(10, 10).unwrap();
        let mut tool = SelectionTransform::new();
        tool.start_selection((3.0, 3.0));
        assert!(!tool.end_selection(&frame).unwrap());
        assert!(!tool.has_selection());
        assert!(tool.start_moving((3.0, 3.0)).unwrap_err().is_declined());
    }

    #[test]
    fn move_repaints_content_at_new_position() {
        let mut frame = RasterBuffer::new(10, 10).unwrap();
        frame.set_pixel(3, 3, Color::RED.premultiplied());
        let mut tool = SelectionTransform::new();
        select(&mut tool, &frame, (2.0, 2.0), (6.0, 6.0));

        tool.start_moving((3.0, 3.0)).unwrap();
        tool.move_selection((5.0, 4.0));
        assert_eq!(frame.get_pixel(3, 3), Color::RED.premultiplied());
        assert!(tool.end_transform(&mut frame).unwrap());
        assert_eq!(frame.get_pixel(5, 4), Color::RED.premultiplied());
        assert_eq!(frame.get_pixel(3, 3), [0, 0, 0, 0]);
        assert_eq!(tool.rect(), Some(Rect::new(4, 3, 4, 4)));
    }

    #[test]
    fn east_handle_overdrag_mirrors_horizontally() {
        let mut frame = RasterBuffer::new(40, 30).unwrap();
        frame.fill_rect(10, 10, 10, 10, Color::RED, CompositionMode::SourceOver);
        frame.fill_rect(20, 10, 10, 10, Color::BLUE, CompositionMode::SourceOver);
        let mut tool = SelectionTransform::new();
        select(&mut tool, &frame, (10.0, 10.0), (30.0, 20.0));
        assert_eq!(tool.rect(), Some(Rect::new(10, 10, 20, 10)));

        assert_eq!(tool.handle_at((30.0, 15.0)), Some(Handle::E));
        tool.start_scaling((30.0, 15.0), Handle::E).unwrap();
        tool.update_scaling((5.0, 15.0)).unwrap();
        assert_eq!(tool.rect(), Some(Rect::new(5, 10, 5, 10)));
        assert!(tool.end_transform(&mut frame).unwrap());

        assert!(tool.flipped_horizontal());
        assert!(!tool.flipped_vertical());
        assert_eq!(tool.content().unwrap().dimensions(), (5, 10));
        let left = frame.get_pixel(5, 15);
        let right = frame.get_pixel(9, 15);
        assert!(left[2] > 200 && left[0] < 50, "{left:?}");
        assert!(right[0] > 200 && right[2] < 50, "{right:?}");
        assert_eq!(frame.get_pixel(15, 15), [0, 0, 0, 0]);
        assert_eq!(frame.get_pixel(25, 15), [0, 0, 0, 0]);
    }

    #[test]
    fn west_handle_scales_from_the_left_edge() {
        let mut frame = RasterBuffer::new(40, 30).unwrap();
        frame.fill(Color::RED);
        let mut tool = SelectionTransform::new();
        select(&mut tool, &frame, (10.0, 10.0), (20.0, 20.0));
        tool.start_scaling((10.0, 15.0), Handle::W).unwrap();
        tool.update_scaling((4.0, 15.0)).unwrap();
        assert_eq!(tool.rect(), Some(Rect::new(4, 10, 16, 10)));
        tool.update_scaling((25.0, 15.0)).unwrap();
        assert_eq!(tool.rect(), Some(Rect::new(20, 10, 5, 10)));
        assert_eq!(tool.active_handle(), Some(Handle::W));
    }

    #[test]
    fn rotation_turns_content_about_its_centre() {
        let mut frame = RasterBuffer::new(40, 40).unwrap();
        frame.fill_rect(10, 18, 20, 4, Color::RED, CompositionMode::SourceOver);
        let mut tool = SelectionTransform::new();
        select(&mut tool, &frame, (10.0, 18.0), (30.0, 22.0));
        let (cx, cy) = tool.rect().unwrap().center();

        tool.start_rotation((cx + 10.0, cy)).unwrap();
        tool.update_rotation((cx, cy + 10.0));
        assert!((tool.rotation_angle() - 90.0).abs() < 1e-3);
        assert_eq!(tool.rect(), Some(Rect::new(18, 10, 4, 20)));
        assert!(tool.end_transform(&mut frame).unwrap());
        assert_eq!(frame.get_pixel(20, 12), Color::RED.premultiplied());
        assert_eq!(frame.get_pixel(12, 20), [0, 0, 0, 0]);
    }

    #[test]
    fn rotation_angle_wraps() {
        let frame = RasterBuffer::new(20, 20).unwrap();
        let mut tool = SelectionTransform::new();
        select(&mut tool, &frame, (5.0, 5.0), (15.0, 15.0));
        tool.start_rotation((20.0, 10.0)).unwrap();
        tool.update_rotation((10.0, 0.0));
        assert!((tool.rotation_angle() - 270.0).abs() < 1e-3);
    }

    #[test]
    fn preview_does_not_touch_the_frame() {
        let mut frame = RasterBuffer::new(10, 10).unwrap();
        frame.set_pixel(1, 1, Color::RED.premultiplied());
        let mut tool = SelectionTransform::new();
        select(&mut tool, &frame, (0.0, 0.0), (3.0, 3.0));
        tool.start_moving((0.0, 0.0)).unwrap();
        tool.move_selection((5.0, 5.0));
        let shown = tool.preview(&frame);
        assert_eq!(shown.get_pixel(6, 6), Color::RED.premultiplied());
        assert_eq!(shown.get_pixel(1, 1), [0, 0, 0, 0]);
        assert_eq!(frame.get_pixel(1, 1), Color::RED.premultiplied());
    }

    #[test]
    fn handles_map_to_cursors() {
        assert_eq!(Handle::NW.cursor(), CursorShape::SizeFDiagonal);
        assert_eq!(Handle::SE.cursor(), CursorShape::SizeFDiagonal);
        assert_eq!(Handle::NE.cursor(), CursorShape::SizeBDiagonal);
        assert_eq!(Handle::SW.cursor(), CursorShape::SizeBDiagonal);
        assert_eq!(Handle::N.cursor(), CursorShape::SizeVertical);
        assert_eq!(Handle::W.cursor(), CursorShape::SizeHorizontal);
    }

    #[test]
    fn rotation_knob_sits_above_the_rectangle() {
        let frame = RasterBuffer::new(100, 100).unwrap();
        let mut tool = SelectionTransform::new();
        select(&mut tool, &frame, (40.0, 50.0), (60.0, 70.0));
        assert_eq!(tool.rotation_handle_center(), Some((50.0, 20.0)));
        assert!(tool.is_over_rotation_handle((50.0, 20.0)));
        assert!(!tool.is_over_rotation_handle((50.0, 50.0)));
        assert_eq!(tool.handle_at((50.0, 60.0)), None);
        assert_eq!(tool.handle_at((50.0, 50.0)), Some(Handle::N));
    }
}
