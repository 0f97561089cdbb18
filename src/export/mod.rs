/// Flattening markings into image files
///
/// This module handles:
/// - Full-resolution exports of a photo with its markings (exporter.rs)
/// - Marked thumbnails for the photo list (thumbnail.rs)
/// - Copying, deleting and cleaning up photo files (files.rs)
///
/// Originals are only ever opened for reading. Output is written to a
/// temporary sibling and renamed into place once complete.

pub mod exporter;
pub mod files;
pub mod thumbnail;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, RgbaImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Turn a stored photo locator into a filesystem path.
/// Accepts plain paths and `file://` URIs.
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Decode the original photo into an RGBA raster
pub fn load_original(uri: &str) -> Result<RgbaImage> {
    let path = uri_to_path(uri);
    let image = image::open(&path).map_err(|e| match e {
        ImageError::IoError(io) => Error::Io(io),
        other => Error::Decode(other),
    })?;
    Ok(image.into_rgba8())
}

/// Encode `image` as JPEG at `path`.
/// On failure nothing is left at `path` or next to it.
pub(crate) fn write_jpeg(image: &RgbaImage, path: &Path, quality: u8) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(path);

    let written = encode_jpeg(image, &partial, quality)
        .and_then(|()| fs::rename(&partial, path).map_err(Error::from));
    if written.is_err() {
        let _ = fs::remove_file(&partial);
    }
    written
}

fn encode_jpeg(image: &RgbaImage, path: &Path, quality: u8) -> Result<()> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(&rgb)
        .map_err(Error::Encode)?;
    writer.flush()?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_uri_to_path() {
        assert_eq!(uri_to_path("file:///tmp/a.jpg"), PathBuf::from("/tmp/a.jpg"));
        assert_eq!(uri_to_path("/tmp/a.jpg"), PathBuf::from("/tmp/a.jpg"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = scratch_dir("load-missing");
        let result = load_original(dir.join("nope.png").to_str().unwrap());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_load_garbage_is_decode_error() {
        let dir = scratch_dir("load-garbage");
        let path = dir.join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load_original(path.to_str().unwrap()), Err(Error::Decode(_))));
    }

    #[test]
    fn test_write_jpeg_leaves_no_partial_file() {
        let dir = scratch_dir("write-jpeg");
        let path = dir.join("out.jpg");
        write_jpeg(&RgbaImage::new(16, 8), &path, 90).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_failed_rename_removes_partial_file() {
        let dir = scratch_dir("write-jpeg-rename");
        // A non-empty directory in the way makes the rename fail
        let path = dir.join("taken.jpg");
        std::fs::create_dir_all(path.join("inside")).unwrap();

        assert!(write_jpeg(&RgbaImage::new(4, 4), &path, 90).is_err());
        assert!(!partial_path(&path).exists());
        assert!(path.is_dir());
    }
}
