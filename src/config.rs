use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::brush::{MAX_AA_QUALITY, MAX_PEN_SIZE, MIN_AA_QUALITY, MIN_PEN_SIZE};
use crate::error::{EditorError, EditorResult};
use crate::raster::Color;

/// Tunable editor defaults, loadable from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: Color,
    pub undo_capacity: usize,
    pub pen_color: Color,
    pub pen_size: u32,
    pub pen_opacity: u8,
    pub anti_aliasing: bool,
    pub aa_quality: u8,
    pub smoothing: u8,
    pub fill_tolerance: u8,
    pub onion_depth: usize,
    pub onion_opacity: u8,
    pub onion_past_tint: Color,
    pub onion_future_tint: Color,
    pub fps: u32,
    pub video_encoder: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            background: Color::rgb(0xc7, 0xc7, 0xc7),
            undo_capacity: 20,
            pen_color: Color::BLACK,
            pen_size: 3,
            pen_opacity: 100,
            anti_aliasing: true,
            aa_quality: 2,
            smoothing: 50,
            fill_tolerance: 150,
            onion_depth: 1,
            onion_opacity: 30,
            onion_past_tint: Color::BLUE,
            onion_future_tint: Color::RED,
            fps: 12,
            video_encoder: "ffmpeg".to_string(),
        }
    }
}

impl EditorConfig {
    /// Read a JSON config; missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> EditorResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: EditorConfig = serde_json::from_str(&text)
            .map_err(|e| EditorError::decode(format!("config {}: {e}", path.display())))?;
        Ok(config.clamped())
    }

    /// Pull out-of-range values back into their supported ranges.
    pub fn clamped(mut self) -> Self {
        self.canvas_width = self.canvas_width.max(1);
        self.canvas_height = self.canvas_height.max(1);
        self.undo_capacity = self.undo_capacity.max(1);
        self.pen_size = self.pen_size.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE);
        self.pen_opacity = self.pen_opacity.min(100);
        self.aa_quality = self.aa_quality.clamp(MIN_AA_QUALITY, MAX_AA_QUALITY);
        self.smoothing = self.smoothing.min(100);
        self.onion_depth = self.onion_depth.clamp(1, 5);
        self.onion_opacity = self.onion_opacity.min(100);
        self.fps = self.fps.clamp(1, 60);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_editor() {
        let config = EditorConfig::default();
        assert_eq!((config.canvas_width, config.canvas_height), (800, 600));
        assert_eq!(config.background.to_hex(), "#c7c7c7");
        assert_eq!(config.undo_capacity, 20);
        assert_eq!(config.fill_tolerance, 150);
        assert_eq!(config.fps, 12);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        fs::write(
            &path,
            r##"{ "fps": 90, "background": "#ffffff", "onion_depth": 9, "aa_quality": 7 }"##,
        )
        .unwrap();
        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.fps, 60);
        assert_eq!(config.aa_quality, 3);
        assert!(config.anti_aliasing);
        assert_eq!(config.onion_depth, 5);
        assert_eq!(config.background, Color::WHITE);
        assert_eq!(config.pen_size, 3);
    }

    #[test]
    fn malformed_config_is_a_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EditorConfig::load(&path),
            Err(EditorError::DecodeFailure(_))
        ));
    }
}
