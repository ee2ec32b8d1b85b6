use log::{debug, info};

use crate::config::EditorConfig;
use crate::error::{Declined, EditorError, EditorResult};
use crate::history::MAX_HISTORY;
use crate::layer::Layer;
use crate::raster::{Color, RasterBuffer};

/// Which way a layer moves in the paint order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Toward the top of the stack (painted later).
    Up,
    /// Toward the bottom of the stack (painted earlier).
    Down,
}

/// Layers in paint order (index 0 is painted first) plus the editing cursor.
#[derive(Clone, Debug)]
pub struct AnimationDocument {
    pub background: Color,
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    current_layer: usize,
    current_frame: usize,
    undo_capacity: usize,
}

impl AnimationDocument {
    /// Single layer with a single blank frame.
    pub fn new(width: u32, height: u32, background: Color) -> EditorResult<Self> {
        Self::with_capacity(width, height, background, MAX_HISTORY)
    }

    pub fn from_config(config: &EditorConfig) -> EditorResult<Self> {
        Self::with_capacity(
            config.canvas_width,
            config.canvas_height,
            config.background,
            config.undo_capacity,
        )
    }

    fn with_capacity(
        width: u32,
        height: u32,
        background: Color,
        undo_capacity: usize,
    ) -> EditorResult<Self> {
        let first = Layer::with_history("Layer 1", width, height, undo_capacity)?;
        let mut doc = Self {
            background,
            width,
            height,
            layers: vec![first],
            current_layer: 0,
            current_frame: 0,
            undo_capacity,
        };
        doc.renumber();
        Ok(doc)
    }

    /// Reassemble a document from decoded parts; cursors are clamped into range.
    ///
    /// Each layer's `index` and `selected` flag are recomputed from its position and
    /// `current_layer`, whatever the parts carried.
    pub fn from_parts(
        width: u32,
        height: u32,
        background: Color,
        layers: Vec<Layer>,
        current_layer: usize,
        current_frame: usize,
        undo_capacity: usize,
    ) -> EditorResult<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension { width, height });
        }
        if layers.is_empty() {
            return Err(EditorError::decode("document has no layers"));
        }
        if let Some(bad) = layers
            .iter()
            .find(|l| (l.width(), l.height()) != (width, height))
        {
            return Err(EditorError::InvalidDimension {
                width: bad.width(),
                height: bad.height(),
            });
        }
        let mut doc = Self {
            background,
            width,
            height,
            current_layer: current_layer.min(layers.len() - 1),
            layers,
            current_frame,
            undo_capacity,
        };
        doc.renumber();
        Ok(doc)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn undo_capacity(&self) -> usize {
        self.undo_capacity
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> EditorResult<&mut Layer> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or_else(|| EditorError::layer_index(index, len))
    }

    pub fn current_layer(&self) -> usize {
        self.current_layer
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.current_layer]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.current_layer]
    }

    /// Longest layer's frame count; the timeline length.
    pub fn frame_count(&self) -> usize {
        self.layers.iter().map(Layer::frame_count).max().unwrap_or(0)
    }

    pub fn set_current_layer(&mut self, index: usize) -> EditorResult<()> {
        if index >= self.layers.len() {
            return Err(EditorError::layer_index(index, self.layers.len()));
        }
        self.current_layer = index;
        self.renumber();
        Ok(())
    }

    /// Frames past a layer's end are created lazily when drawn on.
    pub fn set_current_frame(&mut self, index: usize) {
        self.current_frame = index;
    }

    /// Keep each layer's recorded index and selection flag in step with its position.
    fn renumber(&mut self) {
        let current = self.current_layer;
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.index = i;
            layer.selected = i == current;
        }
    }

    pub fn insert_frame_after(&mut self, layer_index: usize, after: usize) -> EditorResult<usize> {
        let new_index = self.layer_mut(layer_index)?.insert_frame_after(after)?;
        self.current_frame = new_index;
        info!("inserted frame {new_index} in layer {layer_index}");
        Ok(new_index)
    }

    pub fn delete_frame(&mut self, layer_index: usize, frame: usize) -> EditorResult<()> {
        let layer = self.layer_mut(layer_index)?;
        layer.delete_frame(frame)?;
        let remaining = layer.frame_count();
        if self.current_frame >= remaining {
            self.current_frame = remaining - 1;
        }
        info!("deleted frame {frame} from layer {layer_index}");
        Ok(())
    }

    /// Copy the current frame forward in every layer that has it; returns the new cursor.
    pub fn duplicate_current_frame_across_layers(&mut self) -> EditorResult<usize> {
        let frame = self.current_frame;
        let mut touched = 0;
        for layer in &mut self.layers {
            if layer.frame(frame).is_some() {
                layer.duplicate_frame(frame)?;
                touched += 1;
            }
        }
        self.current_frame = frame + 1;
        info!("duplicated frame {frame} across {touched} layer(s)");
        Ok(self.current_frame)
    }

    /// Crop or pad every frame of every layer, anchored at the top-left corner.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> EditorResult<()> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension { width, height });
        }
        for layer in &mut self.layers {
            layer.resize(width, height)?;
        }
        self.width = width;
        self.height = height;
        info!("canvas resized to {width}x{height}");
        Ok(())
    }

    /// Swap a layer with its neighbour; the cursor follows the moved layer.
    pub fn move_layer(&mut self, index: usize, direction: Direction) -> EditorResult<usize> {
        if index >= self.layers.len() {
            return Err(EditorError::layer_index(index, self.layers.len()));
        }
        let target = match direction {
            Direction::Up if index + 1 < self.layers.len() => index + 1,
            Direction::Down if index > 0 => index - 1,
            _ => return Err(Declined::AtBoundary.into()),
        };
        self.layers.swap(index, target);
        self.current_layer = target;
        self.renumber();
        debug!("layer {index} moved to {target}");
        Ok(target)
    }

    /// Append a layer on top, as long as the longest layer, and make it current.
    pub fn add_layer(&mut self, name: Option<String>) -> EditorResult<usize> {
        let name = name.unwrap_or_else(|| format!("Layer {}", self.layers.len() + 1));
        let frames = (0..self.frame_count().max(1))
            .map(|_| RasterBuffer::new(self.width, self.height))
            .collect::<EditorResult<Vec<_>>>()?;
        let layer = Layer::from_frames(name, self.width, self.height, frames, self.undo_capacity)?;
        let at = self.layers.len();
        self.insert_layer(at, layer)
    }

    /// Place a layer at `position` in the stack and make it current.
    pub fn insert_layer(&mut self, position: usize, layer: Layer) -> EditorResult<usize> {
        if (layer.width(), layer.height()) != (self.width, self.height) {
            return Err(EditorError::InvalidDimension {
                width: layer.width(),
                height: layer.height(),
            });
        }
        let position = position.min(self.layers.len());
        info!("layer '{}' inserted at {position}", layer.name);
        self.layers.insert(position, layer);
        self.current_layer = position;
        self.renumber();
        Ok(position)
    }

    pub fn delete_layer(&mut self, index: usize) -> EditorResult<Layer> {
        if self.layers.len() <= 1 {
            return Err(Declined::LastLayer.into());
        }
        if index >= self.layers.len() {
            return Err(EditorError::layer_index(index, self.layers.len()));
        }
        let removed = self.layers.remove(index);
        if index < self.current_layer || self.current_layer >= self.layers.len() {
            self.current_layer = self.current_layer.saturating_sub(1);
        }
        self.renumber();
        info!("layer '{}' deleted", removed.name);
        Ok(removed)
    }
}
