use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::thumbnail::thumbnail_cache_dir;
use super::uri_to_path;
use crate::error::{Error, Result};
use crate::state::library::Library;

/// Image file extensions accepted on import
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

/// Owner of the app's photo and thumbnail directories
#[derive(Debug, Clone)]
pub struct FileManager {
    images_dir: PathBuf,
    thumbnails_dir: PathBuf,
}

impl FileManager {
    /// Use the given directories, creating them if needed
    pub fn new(images_dir: impl Into<PathBuf>, thumbnails_dir: impl Into<PathBuf>) -> Result<Self> {
        let manager = Self {
            images_dir: images_dir.into(),
            thumbnails_dir: thumbnails_dir.into(),
        };
        fs::create_dir_all(&manager.images_dir)?;
        fs::create_dir_all(&manager.thumbnails_dir)?;
        Ok(manager)
    }

    /// Photos under the platform data dir, thumbnails under the cache dir
    pub fn open_default() -> Result<Self> {
        let mut images_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(Error::NoDataDirectory)?;
        images_dir.push("dimension-cam");
        images_dir.push("images");
        Self::new(images_dir, thumbnail_cache_dir()?)
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn thumbnails_dir(&self) -> &Path {
        &self.thumbnails_dir
    }

    /// Copy an imported photo into app storage as `photo_{millis}.{ext}`.
    /// The source is left where it is.
    pub fn copy_photo_to_storage(&self, source: &Path) -> Result<PathBuf> {
        let extension = source
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or_else(|| "jpg".to_string());

        let millis = chrono::Utc::now().timestamp_millis();
        let mut dest = self.images_dir.join(format!("photo_{}.{}", millis, extension));
        let mut attempt = 1;
        while dest.exists() {
            dest = self
                .images_dir
                .join(format!("photo_{}_{}.{}", millis, attempt, extension));
            attempt += 1;
        }

        fs::copy(source, &dest)?;
        log::info!("Copied {} to {}", source.display(), dest.display());
        Ok(dest)
    }

    /// Delete a file. Returns false if it was already gone.
    pub fn delete_file(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Remove files in the managed directories that the catalog no longer
    /// references. Returns how many were deleted.
    pub fn cleanup_orphaned_files(&self, referenced: &HashSet<PathBuf>) -> Result<usize> {
        let mut removed = 0;
        for dir in [&self.images_dir, &self.thumbnails_dir] {
            for entry in WalkDir::new(dir)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();

                // Only process files (not directories)
                if !entry.file_type().is_file() || referenced.contains(path) {
                    continue;
                }
                match fs::remove_file(path) {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!("Could not remove orphan {}: {}", path.display(), e),
                }
            }
        }
        if removed > 0 {
            log::info!("Removed {} orphaned files", removed);
        }
        Ok(removed)
    }
}

/// Every file path the catalog points at: originals and thumbnails
pub fn referenced_paths(library: &Library) -> Result<HashSet<PathBuf>> {
    let mut paths = HashSet::new();
    for photo in library.all_photos()? {
        paths.insert(uri_to_path(&photo.original_uri));
        if let Some(thumbnail) = photo.thumbnail_path {
            paths.insert(PathBuf::from(thumbnail));
        }
    }
    Ok(paths)
}

/// Whether `path` looks like an importable image
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
