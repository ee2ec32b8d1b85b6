use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use image::ImageFormat;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::compositor::render_export;
use crate::document::AnimationDocument;
use crate::error::{EditorError, EditorResult};
use crate::layer::Layer;
use crate::raster::{Color, RasterBuffer};

pub const DOCUMENT_EXTENSION: &str = "anim";

/// Longest timeline a loaded layer may have; frame keys at or past it are rejected.
pub const MAX_FRAMES: usize = 10_000;

/// Persisted document: canvas, cursors and every layer's frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub canvas_size: (u32, u32),
    pub background_color: String,
    pub current_frame: usize,
    pub current_layer: usize,
    pub layers: Vec<LayerRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
    pub opacity: u8,
    pub name: String,
    pub locked: bool,
    pub selected: bool,
    /// Frame index (as a decimal string) to a base64 PNG.
    pub frames: BTreeMap<String, String>,
}

fn encode_frame(frame: &RasterBuffer) -> EditorResult<String> {
    let mut png = Vec::new();
    frame
        .to_rgba_image()
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(STANDARD.encode(png))
}

fn decode_frame(blob: &str, width: u32, height: u32) -> EditorResult<RasterBuffer> {
    let png = STANDARD
        .decode(blob)
        .map_err(|e| EditorError::decode(format!("frame data: {e}")))?;
    let image = image::load_from_memory(&png)
        .map_err(|e| EditorError::decode(format!("frame image: {e}")))?
        .to_rgba8();
    if image.dimensions() != (width, height) {
        let (w, h) = image.dimensions();
        return Err(EditorError::decode(format!(
            "frame is {w}x{h}, layer is {width}x{height}"
        )));
    }
    RasterBuffer::from_rgba_image(&image)
}

impl LayerRecord {
    fn from_layer(layer: &Layer) -> EditorResult<Self> {
        let frames = layer
            .frames()
            .par_iter()
            .enumerate()
            .map(|(i, frame)| -> EditorResult<_> {
                Ok((i.to_string(), encode_frame(frame)?))
            })
            .collect::<EditorResult<BTreeMap<_, _>>>()?;
        Ok(Self {
            index: layer.index,
            width: layer.width(),
            height: layer.height(),
            visible: layer.visible,
            opacity: layer.opacity(),
            name: layer.name.clone(),
            locked: layer.locked,
            selected: layer.selected,
            frames,
        })
    }

    fn to_layer(&self, capacity: usize) -> EditorResult<Layer> {
        let mut indexed = self
            .frames
            .iter()
            .map(|(key, blob)| -> EditorResult<_> {
                let index = key
                    .parse::<usize>()
                    .map_err(|_| EditorError::decode(format!("frame key '{key}'")))?;
                if index >= MAX_FRAMES {
                    return Err(EditorError::decode(format!(
                        "layer '{}' frame {index} is past the {MAX_FRAMES} frame limit",
                        self.name
                    )));
                }
                Ok((index, blob.as_str()))
            })
            .collect::<EditorResult<Vec<_>>>()?;
        indexed.sort_by_key(|&(index, _)| index);

        let decoded = indexed
            .par_iter()
            .map(|&(index, blob)| -> EditorResult<_> {
                Ok((index, decode_frame(blob, self.width, self.height)?))
            })
            .collect::<EditorResult<Vec<_>>>()?;

        // gaps in the saved indices become blank frames so the layer stays dense
        let mut frames = Vec::with_capacity(decoded.last().map_or(0, |(i, _)| i + 1));
        for (index, frame) in decoded {
            while frames.len() < index {
                frames.push(RasterBuffer::new(self.width, self.height)?);
            }
            frames.push(frame);
        }

        let mut layer = Layer::from_frames(&self.name, self.width, self.height, frames, capacity)?;
        layer.visible = self.visible;
        layer.locked = self.locked;
        layer.set_opacity(self.opacity);
        Ok(layer)
    }
}

pub fn serialize(doc: &AnimationDocument) -> EditorResult<DocumentRecord> {
    let layers = doc
        .layers()
        .iter()
        .map(LayerRecord::from_layer)
        .collect::<EditorResult<Vec<_>>>()?;
    Ok(DocumentRecord {
        canvas_size: (doc.width(), doc.height()),
        background_color: doc.background.to_hex(),
        current_frame: doc.current_frame(),
        current_layer: doc.current_layer(),
        layers,
    })
}

/// Rebuild a document; every layer starts with its loaded content as the only undo state.
pub fn deserialize(record: &DocumentRecord, undo_capacity: usize) -> EditorResult<AnimationDocument> {
    let (width, height) = record.canvas_size;
    let background = Color::from_hex(&record.background_color).ok_or_else(|| {
        EditorError::decode(format!("background colour '{}'", record.background_color))
    })?;
    let mut ordered: Vec<&LayerRecord> = record.layers.iter().collect();
    ordered.sort_by_key(|l| l.index);
    if let Some(bad) = ordered
        .iter()
        .find(|l| (l.width, l.height) != (width, height))
    {
        return Err(EditorError::decode(format!(
            "layer '{}' is {}x{} on a {width}x{height} canvas",
            bad.name, bad.width, bad.height
        )));
    }
    // `selected` is derived from `current_layer` on load; disagreeing flags are only reported
    let flagged: Vec<usize> = ordered
        .iter()
        .enumerate()
        .filter(|(_, l)| l.selected)
        .map(|(i, _)| i)
        .collect();
    if flagged != [record.current_layer] {
        warn!(
            "selected flags {flagged:?} disagree with current layer {}; using the current layer",
            record.current_layer
        );
    }
    let layers = ordered
        .into_iter()
        .map(|l| l.to_layer(undo_capacity))
        .collect::<EditorResult<Vec<_>>>()?;
    AnimationDocument::from_parts(
        width,
        height,
        background,
        layers,
        record.current_layer,
        record.current_frame,
        undo_capacity,
    )
}

pub fn save_document(doc: &AnimationDocument, path: impl AsRef<Path>) -> EditorResult<()> {
    let path = path.as_ref();
    let record = serialize(doc)?;
    let json = serde_json::to_string(&record)
        .map_err(|e| EditorError::decode(format!("encoding document: {e}")))?;
    fs::write(path, json)?;
    info!("saved {} ({} layers)", path.display(), record.layers.len());
    Ok(())
}

pub fn load_document(path: impl AsRef<Path>, undo_capacity: usize) -> EditorResult<AnimationDocument> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let record: DocumentRecord = serde_json::from_str(&json)
        .map_err(|e| EditorError::decode(format!("{}: {e}", path.display())))?;
    let doc = deserialize(&record, undo_capacity)?;
    info!(
        "opened {} ({}x{}, {} layers, {} frames)",
        path.display(),
        doc.width(),
        doc.height(),
        doc.layer_count(),
        doc.frame_count()
    );
    Ok(doc)
}

/// Decode an image, scale it to cover `width`x`height` keeping its aspect ratio, and crop
/// the overflow evenly from both sides.
pub fn load_image_cover(path: impl AsRef<Path>, width: u32, height: u32) -> EditorResult<RasterBuffer> {
    let path = path.as_ref();
    let img = image::open(path)?;
    let (iw, ih) = (img.width().max(1), img.height().max(1));
    let scale = (width as f64 / iw as f64).max(height as f64 / ih as f64);
    let sw = ((iw as f64 * scale).round() as u32).max(width);
    let sh = ((ih as f64 * scale).round() as u32).max(height);
    let covered = img
        .resize_exact(sw, sh, FilterType::Triangle)
        .crop_imm((sw - width) / 2, (sh - height) / 2, width, height)
        .to_rgba8();
    debug!("imported {} ({iw}x{ih} -> {sw}x{sh})", path.display());
    RasterBuffer::from_rgba_image(&covered)
}

/// Write `frame_0000.png`, `frame_0001.png`, ... for every frame, over the opaque background.
pub fn export_frames(doc: &AnimationDocument, dir: impl AsRef<Path>) -> EditorResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let paths = (0..doc.frame_count())
        .into_par_iter()
        .map(|frame| -> EditorResult<PathBuf> {
            let path = dir.join(format!("frame_{frame:04}.png"));
            render_export(doc, frame)?.to_rgba_image().save(&path)?;
            Ok(path)
        })
        .collect::<EditorResult<Vec<_>>>()?;
    info!("exported {} frames to {}", paths.len(), dir.display());
    Ok(paths)
}

/// Export the frames to a scratch directory and hand them to an external encoder.
///
/// The scratch directory is removed on every path out of this function.
pub fn export_video(
    doc: &AnimationDocument,
    out: impl AsRef<Path>,
    fps: u32,
    encoder: &str,
) -> EditorResult<()> {
    let out = out.as_ref();
    let scratch = tempfile::tempdir()?;
    export_frames(doc, scratch.path())?;

    let pattern = scratch.path().join("frame_%04d.png");
    let fps = fps.to_string();
    let output = Command::new(encoder)
        .arg("-framerate")
        .arg(&fps)
        .arg("-i")
        .arg(&pattern)
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-y"])
        .arg(out)
        .output()
        .map_err(|e| EditorError::external(format!("could not run {encoder}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().next_back().unwrap_or("").trim();
        return Err(EditorError::external(format!(
            "{encoder} exited with {}: {detail}",
            output.status
        )));
    }
    info!("encoded {} at {fps} fps", out.display());
    Ok(())
}
