#[cfg(test)]
mod tests {
    use crate::document::AnimationDocument;
    use crate::error::EditorError;
    use crate::io::*;
    use crate::raster::{Color, CompositionMode, RasterBuffer};
    use std::fs;

    fn paint(doc: &mut AnimationDocument, layer: usize, frame: usize, seed: u8) {
        let l = doc.layer_mut(layer).unwrap();
        let mut buf = l.get_frame(frame).unwrap().clone();
        buf.fill_rect(
            seed as i32 % 7,
            2,
            5,
            4,
            Color::rgba(seed, 255 - seed, seed / 2, 200),
            CompositionMode::SourceOver,
        );
        buf.set_pixel(0, 0, Color::rgb(seed, seed, 255).premultiplied());
        l.update_frame(frame, &buf).unwrap();
    }

    /// Two layers, three frames each, every frame distinct.
    fn sample_document() -> AnimationDocument {
        let mut doc = AnimationDocument::new(12, 9, Color::rgb(0xc7, 0xc7, 0xc7)).unwrap();
        doc.add_layer(Some("ink".to_string())).unwrap();
        for layer in 0..2 {
            for frame in 0..3 {
                paint(&mut doc, layer, frame, (layer * 3 + frame) as u8 * 30 + 10);
            }
        }
        let l = doc.layer_mut(1).unwrap();
        l.set_opacity(60);
        l.locked = true;
        doc.layer_mut(0).unwrap().visible = false;
        doc.set_current_frame(2);
        doc.set_current_layer(0).unwrap();
        doc
    }

    fn assert_same(a: &AnimationDocument, b: &AnimationDocument) {
        assert_eq!((a.width(), a.height()), (b.width(), b.height()));
        assert_eq!(a.background, b.background);
        assert_eq!(a.current_frame(), b.current_frame());
        assert_eq!(a.current_layer(), b.current_layer());
        assert_eq!(a.layer_count(), b.layer_count());
        for (x, y) in a.layers().iter().zip(b.layers()) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.index, y.index);
            assert_eq!(x.visible, y.visible);
            assert_eq!(x.locked, y.locked);
            assert_eq!(x.selected, y.selected);
            assert_eq!(x.opacity(), y.opacity());
            assert_eq!(x.frames(), y.frames());
        }
    }

    #[test]
    fn test_record_round_trip() {
        let doc = sample_document();
        let record = serialize(&doc).unwrap();
        assert_eq!(record.canvas_size, (12, 9));
        assert_eq!(record.background_color, "#c7c7c7");
        assert_eq!(record.layers[1].frames.len(), 3);

        let loaded = deserialize(&record, 20).unwrap();
        assert_same(&doc, &loaded);
        for layer in loaded.layers() {
            assert_eq!(layer.undo_depth(), 1);
        }
        assert_eq!(serialize(&loaded).unwrap(), record);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("scene.{DOCUMENT_EXTENSION}"));
        let doc = sample_document();
        save_document(&doc, &path).unwrap();
        assert!(path.exists());
        let loaded = load_document(&path, 20).unwrap();
        assert_same(&doc, &loaded);
    }

    #[test]
    fn test_record_uses_documented_keys() {
        let record = serialize(&sample_document()).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        for key in [
            "canvas_size",
            "background_color",
            "current_frame",
            "current_layer",
            "layers",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        let layer = &value["layers"][0];
        for key in [
            "index", "width", "height", "visible", "opacity", "name", "locked", "selected",
            "frames",
        ] {
            assert!(layer.get(key).is_some(), "missing layer key {key}");
        }
        assert!(layer["frames"].get("0").is_some());
        assert_eq!(value["canvas_size"], serde_json::json!([12, 9]));
    }

    #[test]
    fn test_frame_gaps_are_filled_with_blank_frames() {
        let doc = sample_document();
        let mut record = serialize(&doc).unwrap();
        let blob = record.layers[0].frames.remove("1").unwrap();
        record.layers[0].frames.remove("2");
        record.layers[0].frames.insert("4".to_string(), blob);
        let loaded = deserialize(&record, 20).unwrap();
        let layer = &loaded.layers()[0];
        assert_eq!(layer.frame_count(), 5);
        assert!(layer.frame(2).unwrap().is_blank());
        assert_eq!(layer.frame(4), doc.layers()[0].frame(1));
    }

    #[test]
    fn test_far_frame_keys_are_rejected() {
        for key in ["4000000000", "10000"] {
            let mut record = serialize(&sample_document()).unwrap();
            let blob = record.layers[0].frames["0"].clone();
            record.layers[0].frames.insert(key.to_string(), blob);
            assert!(
                matches!(deserialize(&record, 20), Err(EditorError::DecodeFailure(_))),
                "key {key}"
            );
        }
        let mut record = serialize(&sample_document()).unwrap();
        let blob = record.layers[0].frames["0"].clone();
        record.layers[0].frames.insert("9".to_string(), blob);
        assert_eq!(deserialize(&record, 20).unwrap().layers()[0].frame_count(), 10);
    }

    #[test]
    fn test_selected_follows_current_layer_on_load() {
        let mut record = serialize(&sample_document()).unwrap();
        assert_eq!(record.current_layer, 0);
        record.layers[0].selected = false;
        record.layers[1].selected = true;
        let loaded = deserialize(&record, 20).unwrap();
        assert_eq!(loaded.current_layer(), 0);
        assert!(loaded.layers()[0].selected);
        assert!(!loaded.layers()[1].selected);
    }

    #[test]
    fn test_corrupt_frame_is_a_decode_failure() {
        let mut record = serialize(&sample_document()).unwrap();
        record.layers[1]
            .frames
            .insert("0".to_string(), "%%% not base64 %%%".to_string());
        assert!(matches!(
            deserialize(&record, 20),
            Err(EditorError::DecodeFailure(_))
        ));
    }

    #[test]
    fn test_bad_background_and_sizes_are_rejected() {
        let mut record = serialize(&sample_document()).unwrap();
        record.background_color = "grey".to_string();
        assert!(matches!(
            deserialize(&record, 20),
            Err(EditorError::DecodeFailure(_))
        ));

        let mut record = serialize(&sample_document()).unwrap();
        record.layers[0].width = 3;
        assert!(matches!(
            deserialize(&record, 20),
            Err(EditorError::DecodeFailure(_))
        ));
    }

    #[test]
    fn test_garbage_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.anim");
        fs::write(&path, "{ \"canvas_size\": ").unwrap();
        assert!(matches!(
            load_document(&path, 20),
            Err(EditorError::DecodeFailure(_))
        ));
    }

    #[test]
    fn test_export_frames_writes_numbered_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let doc = sample_document();
        let paths = export_frames(&doc, dir.path().join("out")).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["frame_0000.png", "frame_0001.png", "frame_0002.png"]);

        let first = image::open(&paths[0]).unwrap().to_rgba8();
        assert_eq!(first.dimensions(), (12, 9));
        // layer 0 is hidden, so an untouched corner shows the opaque background
        assert_eq!(first.get_pixel(11, 8).0, [0xc7, 0xc7, 0xc7, 255]);
    }

    #[test]
    fn test_image_import_covers_and_centres() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        // 40x10: left quarter red, middle half green, right quarter blue
        let img = image::RgbaImage::from_fn(40, 10, |x, _| match x {
            0..=9 => image::Rgba([255, 0, 0, 255]),
            10..=29 => image::Rgba([0, 255, 0, 255]),
            _ => image::Rgba([0, 0, 255, 255]),
        });
        img.save(&path).unwrap();

        let covered = load_image_cover(&path, 10, 10).unwrap();
        assert_eq!(covered.dimensions(), (10, 10));
        // scaled to 40x10 already, then cropped to the centre 10 columns
        assert_eq!(covered.get_pixel(0, 5), [0, 255, 0, 255]);
        assert_eq!(covered.get_pixel(9, 5), [0, 255, 0, 255]);
    }

    #[test]
    fn test_missing_encoder_is_an_external_failure() {
        let dir = tempfile::tempdir().unwrap();
        let doc = sample_document();
        let err = export_video(
            &doc,
            dir.path().join("clip.mp4"),
            12,
            "definitely-not-an-encoder-binary",
        )
        .unwrap_err();
        assert!(matches!(err, EditorError::ExternalToolFailure(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_encoder_is_an_external_failure() {
        let dir = tempfile::tempdir().unwrap();
        let doc = sample_document();
        let err = export_video(&doc, dir.path().join("clip.mp4"), 12, "false").unwrap_err();
        assert!(matches!(err, EditorError::ExternalToolFailure(_)));
        // `true` ignores its arguments and succeeds
        export_video(&doc, dir.path().join("clip.mp4"), 12, "true").unwrap();
    }

    #[test]
    fn test_faint_pixels_survive_encoding() {
        let mut doc = AnimationDocument::new(3, 2, Color::WHITE).unwrap();
        let l = doc.layer_mut(0).unwrap();
        let mut buf = RasterBuffer::new(3, 2).unwrap();
        buf.set_pixel(2, 1, Color::rgba(10, 20, 30, 1).premultiplied());
        l.update_frame(0, &buf).unwrap();
        let loaded = deserialize(&serialize(&doc).unwrap(), 20).unwrap();
        assert_eq!(loaded.layers()[0].frame(0), Some(&buf));
    }
}
