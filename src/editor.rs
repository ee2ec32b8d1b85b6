use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::brush::{
    draw_path, pen_for, AntiAliasing, PenConfig, Tool, MAX_PEN_SIZE, MIN_PEN_SIZE,
};
use crate::compositor::{render_preview, render_with_onion, OnionSkin};
use crate::config::EditorConfig;
use crate::document::{AnimationDocument, Direction};
use crate::error::{Declined, EditorError, EditorResult};
use crate::fill::FloodFillEngine;
use crate::input::{InputState, ViewTransform};
use crate::io::{self, DocumentRecord};
use crate::layer::Layer;
use crate::playback::Playback;
use crate::raster::{Color, CompositionMode, RasterBuffer};
use crate::selection::{CursorShape, Handle, Rect, SelectionTransform, HANDLE_SIZE};
use crate::smoothing::StrokeSmoother;

/// Marquee colour for the selection outline and its handles.
const MARQUEE: Color = Color::rgb(0x1e, 0x90, 0xff);

/// What changed, sent to subscribers after each completed mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentEvent {
    FrameChanged(usize),
    LayersChanged,
    ContentChanged { layer: usize, frame: usize },
    CanvasResized { width: u32, height: u32 },
    DocumentReplaced,
}

type Listener = Box<dyn FnMut(&DocumentEvent)>;

// In-progress freehand stroke. `base` is the frame as it was when the stroke began.
struct StrokeGesture {
    layer: usize,
    frame: usize,
    pen: PenConfig,
    base: RasterBuffer,
    working: RasterBuffer,
}

/// Log a command outcome: declines as warnings, failures as errors.
pub fn report<T>(result: EditorResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(EditorError::Declined(reason)) => {
            warn!("{reason}");
            None
        }
        Err(e) => {
            error!("{e}");
            None
        }
    }
}

/// The editing session: one document plus tool state, gestures and clipboards.
pub struct Editor {
    config: EditorConfig,
    document: AnimationDocument,
    tool: Tool,
    color: Color,
    pen_size: u32,
    pen_opacity: u8,
    anti_aliasing: AntiAliasing,
    smoother: StrokeSmoother,
    fill: FloodFillEngine,
    pub onion: OnionSkin,
    pub playback: Playback,
    pub view: ViewTransform,
    selection: SelectionTransform,
    input: InputState,
    stroke: Option<StrokeGesture>,
    layer_clipboard: Option<Layer>,
    frame_clipboard: Option<RasterBuffer>,
    listeners: Vec<Listener>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> EditorResult<Self> {
        let config = config.clamped();
        let document = AnimationDocument::from_config(&config)?;
        Ok(Self {
            tool: Tool::Pencil,
            color: config.pen_color,
            pen_size: config.pen_size,
            pen_opacity: config.pen_opacity,
            anti_aliasing: AntiAliasing::new(config.anti_aliasing, config.aa_quality),
            smoother: StrokeSmoother::new(config.smoothing),
            fill: FloodFillEngine::new(config.fill_tolerance),
            onion: OnionSkin::from_config(&config),
            playback: Playback::new(config.fps),
            view: ViewTransform::default(),
            selection: SelectionTransform::new(),
            input: InputState::new(),
            stroke: None,
            layer_clipboard: None,
            frame_clipboard: None,
            listeners: Vec::new(),
            document,
            config,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &AnimationDocument {
        &self.document
    }

    pub fn selection(&self) -> &SelectionTransform {
        &self.selection
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Register a change listener; it stays for the lifetime of the editor.
    pub fn subscribe(&mut self, listener: impl FnMut(&DocumentEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: DocumentEvent) {
        debug!("event {event:?}");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    fn content_changed(&mut self) {
        let event = DocumentEvent::ContentChanged {
            layer: self.document.current_layer(),
            frame: self.document.current_frame(),
        };
        self.emit(event);
    }

    // current layer index, or a decline when it is locked
    fn editable_layer(&self) -> EditorResult<usize> {
        if self.document.active_layer().locked {
            return Err(Declined::LayerLocked.into());
        }
        Ok(self.document.current_layer())
    }

    // tools and pen

    pub fn set_tool(&mut self, tool: Tool) {
        if tool != self.tool {
            self.selection.clear();
            self.tool = tool;
            debug!("tool {tool:?}");
        }
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_pen_size(&mut self, size: u32) {
        self.pen_size = size.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE);
    }

    pub fn pen_size(&self) -> u32 {
        self.pen_size
    }

    /// One size step up, stopping at the largest pen.
    pub fn increase_pen_size(&mut self) -> u32 {
        self.set_pen_size(self.pen_size + 1);
        self.pen_size
    }

    pub fn decrease_pen_size(&mut self) -> u32 {
        self.set_pen_size(self.pen_size.saturating_sub(1));
        self.pen_size
    }

    pub fn anti_aliasing(&self) -> AntiAliasing {
        self.anti_aliasing
    }

    pub fn set_anti_aliasing(&mut self, enabled: bool) {
        self.anti_aliasing.enabled = enabled;
        info!("anti-aliasing {}", if enabled { "on" } else { "off" });
    }

    pub fn set_anti_aliasing_quality(&mut self, quality: u8) {
        self.anti_aliasing.set_quality(quality);
        debug!("anti-aliasing quality {}", self.anti_aliasing.quality());
    }

    pub fn set_pen_opacity(&mut self, opacity: u8) {
        self.pen_opacity = opacity.min(100);
    }

    pub fn set_smoothing(&mut self, strength: u8) {
        self.smoother = StrokeSmoother::new(strength);
    }

    pub fn pen(&self) -> PenConfig {
        pen_for(
            self.tool,
            self.color,
            self.pen_size,
            self.pen_opacity,
            self.anti_aliasing,
        )
    }

    // drawing

    pub fn draw_point(&mut self, pos: (f32, f32)) -> EditorResult<()> {
        self.editable_layer()?;
        let pen = self.pen();
        let frame = self.document.current_frame();
        let layer = self.document.active_layer_mut();
        draw_path(layer.frame_mut(frame)?, &[pos], &pen);
        layer.save_state();
        self.content_changed();
        Ok(())
    }

    pub fn begin_stroke(&mut self, pos: (f32, f32)) -> EditorResult<()> {
        let layer = self.editable_layer()?;
        let frame = self.document.current_frame();
        let base = self.document.active_layer_mut().get_frame(frame)?.clone();
        let pen = self.pen();
        let mut working = base.clone();
        draw_path(&mut working, &[pos], &pen);
        self.input.start_drawing(pos);
        self.stroke = Some(StrokeGesture {
            layer,
            frame,
            pen,
            base,
            working,
        });
        Ok(())
    }

    /// Redraw the smoothed stroke so far onto a copy of the starting frame.
    pub fn update_stroke(&mut self, pos: (f32, f32)) {
        if self.stroke.is_none() || !self.input.record(pos) {
            return;
        }
        let path = self.smoother.smooth(self.input.points());
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.working = stroke.base.clone();
            draw_path(&mut stroke.working, &path, &stroke.pen);
        }
    }

    pub fn end_stroke(&mut self) -> EditorResult<()> {
        let Some(stroke) = self.stroke.take() else {
            return Ok(());
        };
        let points = self.input.stop_drawing();
        let path = self.smoother.smooth(&points);
        let mut result = stroke.base;
        draw_path(&mut result, &path, &stroke.pen);
        self.document
            .layer_mut(stroke.layer)?
            .update_frame(stroke.frame, &result)?;
        debug!("stroke of {} points ({} smoothed)", points.len(), path.len());
        self.content_changed();
        Ok(())
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// A whole stroke at once: smooth, rasterize, save.
    pub fn draw_stroke(&mut self, points: &[(f32, f32)]) -> EditorResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        self.editable_layer()?;
        let path = self.smoother.smooth(points);
        let pen = self.pen();
        let frame = self.document.current_frame();
        let layer = self.document.active_layer_mut();
        draw_path(layer.frame_mut(frame)?, &path, &pen);
        layer.save_state();
        self.content_changed();
        Ok(())
    }

    pub fn flood_fill(&mut self, pos: (f32, f32)) -> EditorResult<usize> {
        self.editable_layer()?;
        let frame = self.document.current_frame();
        let start = (pos.0.floor() as i64, pos.1.floor() as i64);
        let layer = self.document.active_layer_mut();
        let filled = self.fill.fill(layer.frame_mut(frame)?, start, self.color)?;
        if filled > 0 {
            layer.save_state();
            self.content_changed();
        }
        Ok(filled)
    }

    // selection

    pub fn begin_selection(&mut self, pos: (f32, f32)) {
        self.selection.start_selection(pos);
    }

    pub fn update_selection(&mut self, pos: (f32, f32)) {
        self.selection.update_selection(pos);
    }

    pub fn end_selection(&mut self) -> EditorResult<bool> {
        let frame = self.document.current_frame();
        let buffer = self.document.active_layer_mut().get_frame(frame)?;
        self.selection.end_selection(buffer)
    }

    pub fn begin_move(&mut self, pos: (f32, f32)) -> EditorResult<()> {
        self.editable_layer()?;
        self.selection.start_moving(pos)
    }

    pub fn update_move(&mut self, pos: (f32, f32)) {
        self.selection.move_selection(pos);
    }

    pub fn begin_scale(&mut self, pos: (f32, f32), handle: Handle) -> EditorResult<()> {
        self.editable_layer()?;
        self.selection.start_scaling(pos, handle)
    }

    pub fn update_scale(&mut self, pos: (f32, f32)) -> EditorResult<()> {
        self.selection.update_scaling(pos)
    }

    pub fn begin_rotate(&mut self, pos: (f32, f32)) -> EditorResult<()> {
        self.editable_layer()?;
        self.selection.start_rotation(pos)
    }

    pub fn update_rotate(&mut self, pos: (f32, f32)) {
        self.selection.update_rotation(pos);
    }

    /// Commit whichever move, scale or rotate gesture is running.
    pub fn end_transform(&mut self) -> EditorResult<bool> {
        let frame = self.document.current_frame();
        let layer = self.document.active_layer_mut();
        let changed = self.selection.end_transform(layer.frame_mut(frame)?)?;
        if changed {
            layer.save_state();
            self.content_changed();
        }
        Ok(changed)
    }

    pub fn end_move(&mut self) -> EditorResult<bool> {
        self.end_transform()
    }

    pub fn end_scale(&mut self) -> EditorResult<bool> {
        self.end_transform()
    }

    pub fn end_rotate(&mut self) -> EditorResult<bool> {
        self.end_transform()
    }

    fn selection_gesture_active(&self) -> bool {
        self.selection.is_moving() || self.selection.is_scaling() || self.selection.is_rotating()
    }

    // Commit a running stroke or transform while the layer and frame it targets are still
    // where it found them. Runs before anything that reorders, replaces or rewinds content.
    fn settle_gestures(&mut self) -> EditorResult<()> {
        if self.stroke.is_some() {
            debug!("committing stroke before structural edit");
            self.end_stroke()?;
        }
        if self.selection_gesture_active() {
            debug!("committing transform before structural edit");
            self.end_transform()?;
        }
        Ok(())
    }

    // pointer routing, positions in window pixels

    pub fn pointer_down(&mut self, device: (f32, f32)) -> EditorResult<()> {
        let pos = self.view.to_document(device);
        match self.tool {
            Tool::Pencil | Tool::Eraser => self.begin_stroke(pos),
            Tool::Bucket => self.flood_fill(pos).map(|_| ()),
            Tool::Selection => {
                if self.selection.is_over_rotation_handle(pos) {
                    self.begin_rotate(pos)
                } else if let Some(handle) = self.selection.handle_at(pos) {
                    self.begin_scale(pos, handle)
                } else if self.selection_contains(pos) {
                    self.begin_move(pos)
                } else {
                    self.begin_selection(pos);
                    Ok(())
                }
            }
        }
    }

    pub fn pointer_move(&mut self, device: (f32, f32)) -> EditorResult<()> {
        let pos = self.view.to_document(device);
        if self.stroke.is_some() {
            self.update_stroke(pos);
        } else if self.selection.is_selecting() {
            self.update_selection(pos);
        } else if self.selection.is_moving() {
            self.update_move(pos);
        } else if self.selection.is_scaling() {
            self.update_scale(pos)?;
        } else if self.selection.is_rotating() {
            self.update_rotate(pos);
        }
        Ok(())
    }

    pub fn pointer_up(&mut self, device: (f32, f32)) -> EditorResult<()> {
        self.pointer_move(device)?;
        if self.stroke.is_some() {
            self.end_stroke()
        } else if self.selection.is_selecting() {
            self.end_selection().map(|_| ())
        } else if self.selection_gesture_active() {
            self.end_transform().map(|_| ())
        } else {
            Ok(())
        }
    }

    fn selection_contains(&self, pos: (f32, f32)) -> bool {
        self.selection.has_selection()
            && self.selection.rect().is_some_and(|rect| {
                rect.contains((pos.0.floor() as i32, pos.1.floor() as i32))
            })
    }

    /// Pointer shape for hover feedback at a window position.
    pub fn cursor_at(&self, device: (f32, f32)) -> CursorShape {
        if self.tool != Tool::Selection {
            return CursorShape::Arrow;
        }
        let pos = self.view.to_document(device);
        self.selection
            .handle_at(pos)
            .map(Handle::cursor)
            .unwrap_or(CursorShape::Arrow)
    }

    // layers

    pub fn move_layer(&mut self, direction: Direction) -> EditorResult<usize> {
        self.settle_gestures()?;
        let current = self.document.current_layer();
        let moved = self.document.move_layer(current, direction)?;
        self.emit(DocumentEvent::LayersChanged);
        Ok(moved)
    }

    pub fn add_layer(&mut self) -> EditorResult<usize> {
        self.settle_gestures()?;
        let index = self.document.add_layer(None)?;
        self.selection.clear();
        self.emit(DocumentEvent::LayersChanged);
        Ok(index)
    }

    pub fn delete_layer(&mut self, index: usize) -> EditorResult<()> {
        self.settle_gestures()?;
        self.document.delete_layer(index)?;
        self.selection.clear();
        self.emit(DocumentEvent::LayersChanged);
        Ok(())
    }

    pub fn copy_layer(&mut self) {
        let layer = self.document.active_layer().copy();
        debug!("copied layer '{}'", layer.name);
        self.layer_clipboard = Some(layer);
    }

    /// Insert the copied layer right above the current one.
    pub fn paste_layer(&mut self) -> EditorResult<usize> {
        self.settle_gestures()?;
        let Some(copied) = self.layer_clipboard.as_ref() else {
            return Err(Declined::NothingCopied.into());
        };
        let mut layer = copied.copy();
        layer.name = format!("{} (copy)", copied.name);
        let (width, height) = (self.document.width(), self.document.height());
        if (layer.width(), layer.height()) != (width, height) {
            layer.resize(width, height)?;
        }
        let at = self.document.current_layer() + 1;
        let index = self.document.insert_layer(at, layer)?;
        self.selection.clear();
        self.emit(DocumentEvent::LayersChanged);
        Ok(index)
    }

    pub fn rename_layer(&mut self, index: usize, name: impl Into<String>) -> EditorResult<()> {
        self.document.layer_mut(index)?.name = name.into();
        self.emit(DocumentEvent::LayersChanged);
        Ok(())
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> EditorResult<()> {
        self.document.layer_mut(index)?.visible = visible;
        self.emit(DocumentEvent::LayersChanged);
        Ok(())
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: u8) -> EditorResult<()> {
        self.document.layer_mut(index)?.set_opacity(opacity);
        self.emit(DocumentEvent::LayersChanged);
        Ok(())
    }

    pub fn set_layer_locked(&mut self, index: usize, locked: bool) -> EditorResult<()> {
        self.settle_gestures()?;
        self.document.layer_mut(index)?.locked = locked;
        self.emit(DocumentEvent::LayersChanged);
        Ok(())
    }

    pub fn select_layer(&mut self, index: usize) -> EditorResult<()> {
        self.settle_gestures()?;
        self.document.set_current_layer(index)?;
        self.selection.clear();
        self.emit(DocumentEvent::LayersChanged);
        Ok(())
    }

    // frames

    pub fn add_frame(&mut self) -> EditorResult<usize> {
        self.settle_gestures()?;
        let layer = self.document.current_layer();
        let after = self.document.current_frame();
        let index = self.document.insert_frame_after(layer, after)?;
        self.selection.clear();
        self.emit(DocumentEvent::FrameChanged(index));
        Ok(index)
    }

    pub fn delete_frame(&mut self) -> EditorResult<()> {
        self.settle_gestures()?;
        let layer = self.document.current_layer();
        let frame = self.document.current_frame();
        self.document.delete_frame(layer, frame)?;
        self.selection.clear();
        let current = self.document.current_frame();
        self.emit(DocumentEvent::FrameChanged(current));
        Ok(())
    }

    pub fn duplicate_frame(&mut self) -> EditorResult<usize> {
        self.settle_gestures()?;
        let index = self.document.duplicate_current_frame_across_layers()?;
        self.selection.clear();
        self.emit(DocumentEvent::FrameChanged(index));
        Ok(index)
    }

    pub fn copy_frame(&mut self) -> EditorResult<()> {
        let frame = self.document.current_frame();
        let copied = self
            .document
            .active_layer()
            .frame(frame)
            .cloned()
            .ok_or(Declined::NothingCopied)?;
        self.frame_clipboard = Some(copied);
        Ok(())
    }

    pub fn paste_frame(&mut self) -> EditorResult<()> {
        self.settle_gestures()?;
        self.editable_layer()?;
        let Some(copied) = self.frame_clipboard.as_ref() else {
            return Err(Declined::NothingCopied.into());
        };
        let (width, height) = (self.document.width(), self.document.height());
        let buffer = if copied.dimensions() == (width, height) {
            copied.clone()
        } else {
            copied.resized_canvas(width, height)?
        };
        let frame = self.document.current_frame();
        self.document.active_layer_mut().update_frame(frame, &buffer)?;
        self.content_changed();
        Ok(())
    }

    pub fn change_frame(&mut self, index: usize) -> EditorResult<()> {
        if index != self.document.current_frame() {
            self.settle_gestures()?;
            self.selection.clear();
            self.document.set_current_frame(index);
        }
        self.emit(DocumentEvent::FrameChanged(index));
        Ok(())
    }

    pub fn next_frame(&mut self) -> EditorResult<usize> {
        let next = self.document.current_frame() + 1;
        if next >= self.document.active_layer().frame_count() {
            return Err(Declined::AtBoundary.into());
        }
        self.change_frame(next)?;
        Ok(next)
    }

    pub fn previous_frame(&mut self) -> EditorResult<usize> {
        let Some(previous) = self.document.current_frame().checked_sub(1) else {
            return Err(Declined::AtBoundary.into());
        };
        self.change_frame(previous)?;
        Ok(previous)
    }

    // history

    pub fn undo(&mut self) -> EditorResult<()> {
        self.settle_gestures()?;
        if !self.document.active_layer_mut().undo() {
            return Err(Declined::GenesisState.into());
        }
        self.after_history_step();
        Ok(())
    }

    pub fn redo(&mut self) -> EditorResult<()> {
        self.settle_gestures()?;
        if !self.document.active_layer_mut().redo() {
            return Err(Declined::NothingToRedo.into());
        }
        self.after_history_step();
        Ok(())
    }

    // The frame cursor stays put even when the restored layer is shorter; reads pad it.
    fn after_history_step(&mut self) {
        self.selection.clear();
        self.content_changed();
    }

    // canvas and rendering

    pub fn resize_canvas(&mut self, width: u32, height: u32) -> EditorResult<()> {
        self.settle_gestures()?;
        self.document.resize_canvas(width, height)?;
        self.selection.clear();
        self.emit(DocumentEvent::CanvasResized { width, height });
        Ok(())
    }

    /// Composited current frame with onion skin, any in-progress gesture and the marquee.
    pub fn render_current_frame(&self) -> EditorResult<RasterBuffer> {
        let doc = &self.document;
        let frame = doc.current_frame();
        let mut out = if let Some(stroke) = &self.stroke {
            render_preview(doc, stroke.frame, &self.onion, stroke.layer, &stroke.working)?
        } else if self.selection_gesture_active() {
            let base = match doc.active_layer().frame(frame) {
                Some(buffer) => buffer.clone(),
                None => RasterBuffer::new(doc.width(), doc.height())?,
            };
            let preview = self.selection.preview(&base);
            render_preview(doc, frame, &self.onion, doc.current_layer(), &preview)?
        } else {
            render_with_onion(doc, frame, &self.onion)?
        };
        if let Some(rect) = self.selection.rect() {
            draw_marquee(&mut out, rect, self.selection.has_selection());
        }
        Ok(out)
    }

    // onion skin

    pub fn toggle_onion_skin(&mut self) -> bool {
        self.onion.enabled = !self.onion.enabled;
        info!("onion skin {}", if self.onion.enabled { "on" } else { "off" });
        self.onion.enabled
    }

    pub fn set_onion_skin_depth(&mut self, depth: usize) {
        self.onion.set_depth(depth);
    }

    pub fn set_onion_skin_opacity(&mut self, opacity: u8) {
        self.onion.set_opacity(opacity);
    }

    // playback

    pub fn toggle_playback(&mut self) -> bool {
        let playing = self.playback.toggle();
        info!("playback {}", if playing { "started" } else { "stopped" });
        playing
    }

    /// Advance playback by `elapsed`; returns the frame shown when it moved.
    pub fn tick(&mut self, elapsed: Duration) -> Option<usize> {
        let next = self.playback.tick(
            elapsed,
            self.document.frame_count(),
            self.document.current_frame(),
        )?;
        report(self.change_frame(next))?;
        Some(next)
    }

    // persistence

    fn replace_document(&mut self, document: AnimationDocument) {
        self.document = document;
        self.selection.clear();
        self.stroke = None;
        self.input.stop_drawing();
        self.emit(DocumentEvent::DocumentReplaced);
    }

    /// Start over with a blank document from the configured defaults.
    pub fn new_document(&mut self) -> EditorResult<()> {
        let blank = AnimationDocument::from_config(&self.config)?;
        self.replace_document(blank);
        Ok(())
    }

    pub fn serialize(&self) -> EditorResult<DocumentRecord> {
        io::serialize(&self.document)
    }

    /// Replace the document with a decoded record; on failure nothing changes.
    pub fn deserialize(&mut self, record: &DocumentRecord) -> EditorResult<()> {
        let document = io::deserialize(record, self.config.undo_capacity)?;
        self.replace_document(document);
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> EditorResult<()> {
        io::save_document(&self.document, path)
    }

    /// Load a document; a failed load leaves a fresh blank document behind.
    pub fn open(&mut self, path: impl AsRef<Path>) -> EditorResult<()> {
        match io::load_document(path.as_ref(), self.config.undo_capacity) {
            Ok(document) => {
                self.replace_document(document);
                Ok(())
            }
            Err(e) => {
                error!("could not open {}: {e}", path.as_ref().display());
                self.new_document()?;
                Err(e)
            }
        }
    }

    /// Add an image as a new top layer at the current frame, scaled to cover the canvas.
    pub fn import_image(&mut self, path: impl AsRef<Path>) -> EditorResult<usize> {
        self.settle_gestures()?;
        let path = path.as_ref();
        let (width, height) = (self.document.width(), self.document.height());
        let image = io::load_image_cover(path, width, height)?;
        let frame = self.document.current_frame();
        let mut frames = (0..frame)
            .map(|_| RasterBuffer::new(width, height))
            .collect::<EditorResult<Vec<_>>>()?;
        frames.push(image);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Imported".to_string());
        let layer = Layer::from_frames(name, width, height, frames, self.config.undo_capacity)?;
        let at = self.document.layer_count();
        let index = self.document.insert_layer(at, layer)?;
        self.selection.clear();
        self.emit(DocumentEvent::LayersChanged);
        Ok(index)
    }

    pub fn export_frames(&self, dir: impl AsRef<Path>) -> EditorResult<Vec<PathBuf>> {
        io::export_frames(&self.document, dir)
    }

    pub fn export_video(&self, out: impl AsRef<Path>) -> EditorResult<()> {
        io::export_video(
            &self.document,
            out,
            self.playback.fps(),
            &self.config.video_encoder,
        )
    }
}

fn draw_marquee(out: &mut RasterBuffer, rect: Rect, with_handles: bool) {
    let (x, y, w, h) = (rect.x, rect.y, rect.width.max(1), rect.height.max(1));
    let mode = CompositionMode::SourceOver;
    out.fill_rect(x, y, w, 1, MARQUEE, mode);
    out.fill_rect(x, y + h as i32 - 1, w, 1, MARQUEE, mode);
    out.fill_rect(x, y, 1, h, MARQUEE, mode);
    out.fill_rect(x + w as i32 - 1, y, 1, h, MARQUEE, mode);
    if with_handles {
        let half = HANDLE_SIZE / 2;
        for handle in Handle::ALL {
            let (cx, cy) = handle.position(rect);
            out.fill_rect(
                cx - half,
                cy - half,
                HANDLE_SIZE as u32,
                HANDLE_SIZE as u32,
                MARQUEE,
                mode,
            );
        }
    }
}
