use crate::error::{Declined, EditorError, EditorResult};
use crate::history::{History, MAX_HISTORY};
use crate::raster::RasterBuffer;

/// One animation layer: a dense run of frames plus its own undo history.
#[derive(Clone, Debug)]
pub struct Layer {
    pub index: usize,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub selected: bool,
    width: u32,
    height: u32,
    opacity: u8,
    frames: Vec<RasterBuffer>, // position == frame index
    history: History<Vec<RasterBuffer>>,
}

impl Layer {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> EditorResult<Self> {
        Self::with_history(name, width, height, MAX_HISTORY)
    }

    /// A layer with one transparent frame; that frame is the genesis undo state.
    pub fn with_history(
        name: impl Into<String>,
        width: u32,
        height: u32,
        capacity: usize,
    ) -> EditorResult<Self> {
        let first = RasterBuffer::new(width, height)?;
        Self::from_frames(name, width, height, vec![first], capacity)
    }

    /// Build a layer around existing frames, which become its only undo state.
    pub fn from_frames(
        name: impl Into<String>,
        width: u32,
        height: u32,
        frames: Vec<RasterBuffer>,
        capacity: usize,
    ) -> EditorResult<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension { width, height });
        }
        if let Some(bad) = frames.iter().find(|f| f.dimensions() != (width, height)) {
            let (w, h) = bad.dimensions();
            return Err(EditorError::InvalidDimension { width: w, height: h });
        }
        let mut layer = Layer {
            index: 0,
            name: name.into(),
            visible: true,
            locked: false,
            selected: false,
            width,
            height,
            opacity: 100,
            frames,
            history: History::with_capacity(capacity),
        };
        if layer.frames.is_empty() {
            layer.frames.push(RasterBuffer::new(width, height)?);
        }
        layer.history.reset(layer.frames.clone());
        Ok(layer)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity.min(100);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[RasterBuffer] {
        &self.frames
    }

    /// Existing frame, without materializing anything.
    pub fn frame(&self, index: usize) -> Option<&RasterBuffer> {
        self.frames.get(index)
    }

    /// Frame at `index`, creating it (and any missing frames before it) on demand.
    pub fn get_frame(&mut self, index: usize) -> EditorResult<&RasterBuffer> {
        if index >= self.frames.len() {
            self.pad_to(index)?;
            self.save_state();
        }
        Ok(&self.frames[index])
    }

    /// Working access for in-progress gestures; never records history.
    pub fn frame_mut(&mut self, index: usize) -> EditorResult<&mut RasterBuffer> {
        if index >= self.frames.len() {
            self.pad_to(index)?;
        }
        Ok(&mut self.frames[index])
    }

    fn pad_to(&mut self, index: usize) -> EditorResult<()> {
        while self.frames.len() <= index {
            self.frames.push(RasterBuffer::new(self.width, self.height)?);
        }
        Ok(())
    }

    fn insert_at(&mut self, position: usize, frame: RasterBuffer) -> EditorResult<usize> {
        if position > self.frames.len() {
            self.pad_to(position - 1)?;
        }
        self.frames.insert(position, frame);
        self.save_state();
        Ok(position)
    }

    /// Append a blank frame, or insert one at `at` shifting later frames up.
    pub fn add_frame(&mut self, at: Option<usize>) -> EditorResult<usize> {
        let blank = RasterBuffer::new(self.width, self.height)?;
        let position = at.unwrap_or(self.frames.len());
        self.insert_at(position, blank)
    }

    /// Insert a blank frame right after `after`; returns the new frame's index.
    pub fn insert_frame_after(&mut self, after: usize) -> EditorResult<usize> {
        self.add_frame(Some(after + 1))
    }

    /// Deep-copy frame `index` into a new frame right after it.
    pub fn duplicate_frame(&mut self, index: usize) -> EditorResult<usize> {
        let copy = self
            .frames
            .get(index)
            .cloned()
            .ok_or_else(|| EditorError::frame_index(index, self.frames.len()))?;
        self.insert_at(index + 1, copy)
    }

    /// Remove a frame; later frames shift down so indices stay dense.
    pub fn delete_frame(&mut self, index: usize) -> EditorResult<()> {
        if self.frames.len() <= 1 {
            return Err(Declined::LastFrame.into());
        }
        if index >= self.frames.len() {
            return Err(EditorError::frame_index(index, self.frames.len()));
        }
        self.frames.remove(index);
        self.save_state();
        Ok(())
    }

    /// Replace a frame with a copy of `buffer`.
    pub fn update_frame(&mut self, index: usize, buffer: &RasterBuffer) -> EditorResult<()> {
        if buffer.dimensions() != (self.width, self.height) {
            let (width, height) = buffer.dimensions();
            return Err(EditorError::InvalidDimension { width, height });
        }
        self.pad_to(index)?;
        self.frames[index] = buffer.clone();
        self.save_state();
        Ok(())
    }

    /// Snapshot every frame onto the undo stack and invalidate redo.
    pub fn save_state(&mut self) {
        self.history.push(self.frames.clone());
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(frames) => {
                self.frames = frames;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(frames) => {
                self.frames = frames;
                true
            }
            None => false,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_len()
    }

    /// Crop or pad every frame to the new size, top-left aligned.
    ///
    /// Older snapshots have the old size, so history restarts from the resized content.
    pub fn resize(&mut self, width: u32, height: u32) -> EditorResult<()> {
        let resized = self
            .frames
            .iter()
            .map(|f| f.resized_canvas(width, height))
            .collect::<EditorResult<Vec<_>>>()?;
        self.frames = resized;
        self.width = width;
        self.height = height;
        self.history.reset(self.frames.clone());
        Ok(())
    }

    /// Deep copy with the same attributes and a fresh history.
    pub fn copy(&self) -> Layer {
        let mut layer = self.clone();
        layer.history = History::with_capacity(self.history.capacity());
        layer.history.reset(layer.frames.clone());
        layer
    }
}
