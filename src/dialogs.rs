use std::path::PathBuf;

use rfd::FileDialog;

use flipbook::io::DOCUMENT_EXTENSION;

pub type DialogResult<T> = Result<T, String>;

/// Open dialog for an animation document.
pub fn select_document() -> DialogResult<PathBuf> {
    FileDialog::new()
        .add_filter("Animation", &[DOCUMENT_EXTENSION])
        .set_directory(".")
        .pick_file()
        .ok_or_else(|| "No file selected".to_string())
}

/// Save dialog for an animation document.
pub fn select_save_document_path() -> DialogResult<PathBuf> {
    FileDialog::new()
        .add_filter("Animation", &[DOCUMENT_EXTENSION])
        .set_file_name(format!("untitled.{DOCUMENT_EXTENSION}"))
        .save_file()
        .ok_or_else(|| "No file selected".to_string())
}

/// Open dialog for an image to import (PNG/JPEG/BMP/GIF).
pub fn select_image_file() -> DialogResult<PathBuf> {
    FileDialog::new()
        .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "gif"])
        .pick_file()
        .ok_or_else(|| "No file selected".to_string())
}

/// Folder for a PNG sequence export.
pub fn select_export_folder() -> DialogResult<PathBuf> {
    FileDialog::new()
        .set_directory(".")
        .pick_folder()
        .ok_or_else(|| "No folder selected".to_string())
}

/// Save dialog for an encoded video.
pub fn select_video_path() -> DialogResult<PathBuf> {
    FileDialog::new()
        .add_filter("MP4 video", &["mp4"])
        .set_file_name("animation.mp4")
        .save_file()
        .ok_or_else(|| "No file selected".to_string())
}
