//! Marker files and image loading.

use std::path::{Path, PathBuf};

use crate::error::PersistError;
use crate::session::{LoadedImage, Marker};

pub fn markers_to_json(markers: &[Marker]) -> Result<String, PersistError> {
    Ok(serde_json::to_string(markers)?)
}

/// Parse a JSON array of `{x, y, color}` objects.
pub fn markers_from_json(data: &str) -> Result<Vec<Marker>, PersistError> {
    Ok(serde_json::from_str(data)?)
}

pub fn save_markers(path: &Path, markers: &[Marker]) -> Result<(), PersistError> {
    let data = markers_to_json(markers)?;
    std::fs::write(path, data)?;
    log::info!("Saved {} markers to {}", markers.len(), path.display());
    Ok(())
}

pub fn load_markers(path: &Path) -> Result<Vec<Marker>, PersistError> {
    let data = std::fs::read_to_string(path)?;
    let markers = markers_from_json(&data)?;
    log::info!("Loaded {} markers from {}", markers.len(), path.display());
    Ok(markers)
}

/// Decode by content, falling back to the extension when the bytes are not
/// recognised.
pub fn load_image(path: &Path) -> Result<LoadedImage, PersistError> {
    let pixels = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    log::info!(
        "Loaded image {} ({}x{})",
        file_name,
        pixels.width(),
        pixels.height()
    );
    Ok(LoadedImage { file_name, pixels })
}

/// `<base>.json`.
pub fn markers_file_name(base: &str) -> String {
    format!("{base}.json")
}

/// `<base>_out.jpg`.
pub fn export_file_name(base: &str) -> String {
    format!("{base}_out.jpg")
}

pub fn default_dir(image_path: Option<&Path>) -> Option<PathBuf> {
    image_path.and_then(Path::parent).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DotColor;

    fn sample() -> Vec<Marker> {
        vec![
            Marker { x: 10, y: 10, color: DotColor::Red },
            Marker { x: 799, y: 0, color: DotColor::Magenta },
            Marker { x: 3, y: 599, color: DotColor::Green },
        ]
    }

    #[test]
    fn test_json_shape() {
        let json = markers_to_json(&sample()[..1]).unwrap();
        assert_eq!(json, r#"[{"x":10,"y":10,"color":"red"}]"#);
    }

    #[test]
    fn test_reads_files_written_by_browser_version() {
        let data = r#"[{"x":1,"y":2,"color":"blue"},{"x":3,"y":4,"color":"yellow"}]"#;
        let markers = markers_from_json(data).unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[1].color, DotColor::Yellow);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let markers = sample();
        let back = markers_from_json(&markers_to_json(&markers).unwrap()).unwrap();
        assert_eq!(back, markers);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            markers_from_json("[{\"x\":1,"),
            Err(PersistError::Json(_))
        ));
        assert!(matches!(
            markers_from_json(r#"{"x":1,"y":2,"color":"red"}"#),
            Err(PersistError::Json(_))
        ));
        assert!(markers_from_json(r#"[{"x":1,"y":2,"color":"teal"}]"#).is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(markers_file_name("trap"));
        save_markers(&path, &sample()).unwrap();
        assert_eq!(load_markers(&path).unwrap(), sample());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_markers(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(PersistError::Io(_))));
    }

    #[test]
    fn test_load_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.photo.png");
        image::RgbaImage::new(8, 6).save(&path).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.file_name, "field.photo.png");
        assert_eq!(loaded.base_name(), "field");
        assert_eq!((loaded.pixels.width(), loaded.pixels.height()), (8, 6));
    }

    #[test]
    fn test_load_image_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("source.png");
        image::RgbaImage::new(5, 4).save(&png).unwrap();

        let bare = dir.path().join("trap");
        std::fs::copy(&png, &bare).unwrap();
        let loaded = load_image(&bare).unwrap();
        assert_eq!((loaded.pixels.width(), loaded.pixels.height()), (5, 4));
        assert_eq!(loaded.base_name(), "trap");

        let misnamed = dir.path().join("trap2.jpg");
        std::fs::copy(&png, &misnamed).unwrap();
        let loaded = load_image(&misnamed).unwrap();
        assert_eq!((loaded.pixels.width(), loaded.pixels.height()), (5, 4));
    }

    #[test]
    fn test_load_image_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(load_image(&path).is_err());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(markers_file_name("trap"), "trap.json");
        assert_eq!(export_file_name("trap"), "trap_out.jpg");
        assert_eq!(
            default_dir(Some(Path::new("/data/trap.jpg"))),
            Some(PathBuf::from("/data"))
        );
        assert_eq!(default_dir(None), None);
    }
}
