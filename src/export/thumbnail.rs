use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::path::{Path, PathBuf};

use super::{load_original, write_jpeg};
use crate::error::{Error, Result};
use crate::render;
use crate::state::data::{ArrowStyle, Marking};
use crate::state::library::{Library, MarkingStore};

/// Longest side of generated thumbnails
pub const THUMBNAIL_MAX_SIZE: u32 = 400;

const THUMBNAIL_QUALITY: u8 = 85;

/// Get the thumbnail cache directory
/// Returns ~/.cache/dimension-cam/thumbnails on Linux
pub fn thumbnail_cache_dir() -> Result<PathBuf> {
    let mut path = dirs_next::cache_dir()
        .or_else(dirs_next::home_dir)
        .ok_or(Error::NoDataDirectory)?;
    path.push("dimension-cam");
    path.push("thumbnails");
    Ok(path)
}

pub fn thumbnail_file_name(photo_id: i64) -> String {
    format!("thumb_{}.jpg", photo_id)
}

/// Size that fits within `max_size` keeping the aspect ratio. Never upscales.
pub fn fit_within(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_size || longest == 0 {
        return (width, height);
    }
    let scale = max_size as f32 / longest as f32;
    (
        ((width as f32 * scale) as u32).max(1),
        ((height as f32 * scale) as u32).max(1),
    )
}

/// Scale the original down and draw the markings on top
pub fn render_thumbnail(
    original_uri: &str,
    markings: &[Marking],
    arrow_style: ArrowStyle,
    max_size: u32,
) -> Result<RgbaImage> {
    let original = load_original(original_uri)?;
    let (width, height) = fit_within(original.width(), original.height(), max_size);
    let mut thumbnail = if (width, height) == original.dimensions() {
        original
    } else {
        imageops::resize(&original, width, height, FilterType::Lanczos3)
    };
    render::render_markings(&mut thumbnail, markings, arrow_style, 1.0);
    Ok(thumbnail)
}

/// Regenerate a photo's marked thumbnail in `cache_dir` and record its path
pub fn refresh_thumbnail(
    library: &Library,
    photo_id: i64,
    arrow_style: ArrowStyle,
    cache_dir: &Path,
) -> Result<PathBuf> {
    let photo = library.photo(photo_id)?.ok_or(Error::PhotoNotFound(photo_id))?;
    let markings = library.markings_for_photo(photo_id)?;

    let thumbnail = render_thumbnail(&photo.original_uri, &markings, arrow_style, THUMBNAIL_MAX_SIZE)?;
    let path = cache_dir.join(thumbnail_file_name(photo_id));
    write_jpeg(&thumbnail, &path, THUMBNAIL_QUALITY)?;

    library.set_thumbnail_path(photo_id, &path.to_string_lossy())?;
    log::debug!("Generated thumbnail: {}", path.display());
    Ok(path)
}
