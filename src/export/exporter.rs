use std::path::{Path, PathBuf};

use super::{load_original, uri_to_path, write_jpeg};
use crate::error::{Error, Result};
use crate::render;
use crate::state::data::{ArrowStyle, Marking};

/// Exports are rendered at native resolution, one pixel per dp
pub const EXPORT_DENSITY: f32 = 1.0;

/// JPEG quality of exported images
pub const EXPORT_QUALITY: u8 = 95;

/// Get the export directory
/// Returns ~/Pictures/DimensionCam on Linux
pub fn export_dir() -> Result<PathBuf> {
    let mut path = dirs::picture_dir()
        .or_else(dirs::home_dir)
        .ok_or(Error::NoDataDirectory)?;
    path.push("DimensionCam");
    Ok(path)
}

/// Output file name for a photo: `IMG_1.jpg` becomes `IMG_1_marked.jpg`
pub fn export_file_name(original_uri: &str) -> String {
    let stem = uri_to_path(original_uri)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "photo".to_string());
    let lower = stem.to_ascii_lowercase();
    let base = if lower.ends_with(".jpeg") {
        &stem[..stem.len() - 5]
    } else if lower.ends_with(".jpg") {
        &stem[..stem.len() - 4]
    } else {
        &stem[..]
    };
    format!("{}_marked.jpg", base)
}

/// Render `markings` onto the original photo and write the result into
/// `out_dir`. Returns the path of the written file.
pub fn export_marked_image(
    original_uri: &str,
    markings: &[Marking],
    arrow_style: ArrowStyle,
    out_dir: &Path,
) -> Result<PathBuf> {
    let mut image = load_original(original_uri)?;
    render::render_markings(&mut image, markings, arrow_style, EXPORT_DENSITY);

    let out_path = out_dir.join(export_file_name(original_uri));
    write_jpeg(&image, &out_path, EXPORT_QUALITY)?;
    log::info!(
        "Exported {} markings to {}",
        markings.len(),
        out_path.display()
    );
    Ok(out_path)
}

/// Export on the blocking pool
///
/// Takes an owned snapshot, so edits made while the export runs do not
/// affect its output.
pub async fn export_marked_image_async(
    original_uri: String,
    markings: Vec<Marking>,
    arrow_style: ArrowStyle,
    out_dir: PathBuf,
) -> Result<PathBuf> {
    // Spawn blocking task for CPU-bound work
    tokio::task::spawn_blocking(move || {
        export_marked_image(&original_uri, &markings, arrow_style, &out_dir)
    })
    .await
    .map_err(|e| Error::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{scratch_dir, write_photo};
    use crate::state::data::fixture_marking;
    use image::Rgba;

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("file:///sdcard/IMG_1.jpg"), "IMG_1_marked.jpg");
        assert_eq!(export_file_name("/photos/shot.JPEG"), "shot_marked.jpg");
        assert_eq!(export_file_name("/photos/scan.png"), "scan.png_marked.jpg");
        assert_eq!(export_file_name(""), "photo_marked.jpg");
    }

    #[test]
    fn test_export_keeps_resolution_and_draws_markings() {
        let dir = scratch_dir("export");
        let photo = write_photo(&dir, "wall.png", 200, 100);
        let out_dir = dir.join("out");

        let out = export_marked_image(
            photo.to_str().unwrap(),
            &[fixture_marking(1, 1, 0)],
            ArrowStyle::Circle,
            &out_dir,
        )
        .unwrap();
        assert_eq!(out, out_dir.join("wall.png_marked.jpg"));

        let exported = image::open(&out).unwrap().into_rgba8();
        assert_eq!(exported.dimensions(), (200, 100));
        // Start disc at (20, 10), JPEG keeps it strongly red
        let Rgba([r, g, b, _]) = *exported.get_pixel(20, 10);
        assert!(r > 200 && g < 60 && b < 60, "got {:?}", (r, g, b));

        // The original is untouched
        let original = image::open(&photo).unwrap().into_rgba8();
        assert_eq!(*original.get_pixel(20, 10), Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn test_failed_decode_writes_nothing() {
        let dir = scratch_dir("export-broken");
        let photo = dir.join("broken.jpg");
        std::fs::write(&photo, b"not a jpeg").unwrap();
        let out_dir = dir.join("out");

        let result = export_marked_image(photo.to_str().unwrap(), &[], ArrowStyle::Arrow, &out_dir);
        assert!(matches!(result, Err(Error::Decode(_))));
        let leftovers = std::fs::read_dir(&out_dir).map(|d| d.count()).unwrap_or(0);
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_async_export() {
        let dir = scratch_dir("export-async");
        let photo = write_photo(&dir, "async.png", 64, 64);

        let out = export_marked_image_async(
            photo.to_string_lossy().into_owned(),
            vec![fixture_marking(1, 1, 0)],
            ArrowStyle::TCap,
            dir.join("out"),
        )
        .await
        .unwrap();
        assert!(out.exists());
    }
}
