use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

use dimension_cam::export::exporter::{export_dir, export_marked_image_async};
use dimension_cam::export::files::{is_image_file, referenced_paths, FileManager};
use dimension_cam::export::thumbnail::refresh_thumbnail;
use dimension_cam::state::data::{ArrowStyle, DistanceUnit};
use dimension_cam::state::library::{Library, MarkingStore};
use dimension_cam::state::settings::SettingsStore;
use dimension_cam::ui::MarkingCanvas;
use dimension_cam::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "dimension-cam",
    version,
    about = "Measurement markings on photos"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy images into the library
    Import {
        /// Image file or folder to import recursively
        source: PathBuf,
    },
    /// List photos, most recently modified first
    List,
    /// Add a marking (coordinates in 0..1)
    Mark {
        photo: i64,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        /// Distance in the default unit, e.g. 12.5
        distance: String,
    },
    /// List a photo's markings
    Markings { photo: i64 },
    /// Delete the topmost marking of a photo
    #[command(name = "delete-top")]
    DeleteTop { photo: i64 },
    /// Write the photo with its markings as JPEG
    Export {
        photo: i64,
        /// Defaults to ~/Pictures/DimensionCam
        out_dir: Option<PathBuf>,
    },
    /// Remove a photo, its markings and files
    Delete { photo: i64 },
    /// Delete files the library no longer uses
    Cleanup,
    /// Show or change a preference
    Settings {
        #[arg(requires = "value")]
        key: Option<String>,
        value: Option<String>,
    },
}

/// Result of a folder import operation
#[derive(Debug, Clone, Default)]
struct ImportResult {
    imported_count: usize,
    failed_count: usize,
}

struct App {
    library: Library,
    settings: SettingsStore,
    files: FileManager,
}

fn main() -> ExitCode {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    match open_app().and_then(|mut app| run(&mut app, cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_app() -> Result<App> {
    Ok(App {
        library: Library::open(Library::default_path()?)?,
        settings: SettingsStore::load(SettingsStore::default_path()?)?,
        files: FileManager::open_default()?,
    })
}

fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Import { source } => {
            let result = import(app, &source)?;
            println!(
                "Imported {} photos ({} failed)",
                result.imported_count, result.failed_count
            );
        }
        Command::List => {
            for photo in app.library.all_photos()? {
                let count = app.library.markings_for_photo(photo.id)?.len();
                println!("{:>5}  {:>3} markings  {}", photo.id, count, photo.original_uri);
            }
        }
        Command::Mark { photo, x1, y1, x2, y2, distance } => {
            let id = mark(app, photo, [x1, y1, x2, y2], &distance)?;
            println!("Added marking {}", id);
        }
        Command::Markings { photo } => {
            for marking in app.library.markings_for_photo(photo)? {
                println!(
                    "{:>5}  #{}  ({:.3}, {:.3}) -> ({:.3}, {:.3})  {}",
                    marking.id,
                    marking.display_order,
                    marking.start_x,
                    marking.start_y,
                    marking.end_x,
                    marking.end_y,
                    marking.label()
                );
            }
        }
        Command::DeleteTop { photo } => {
            ensure_photo(&app.library, photo)?;
            let mut canvas = MarkingCanvas::open(&mut app.library, photo, app.settings.subscribe())?;
            match canvas.markings().last().map(|m| m.id) {
                Some(id) => {
                    canvas.delete(id)?;
                    println!("Deleted marking {}", id);
                }
                None => println!("Photo {} has no markings", photo),
            }
        }
        Command::Export { photo, out_dir } => {
            let out_dir = match out_dir {
                Some(dir) => dir,
                None => export_dir()?,
            };
            let path = export(app, photo, out_dir)?;
            println!("{}", path.display());
        }
        Command::Delete { photo: photo_id } => {
            let photo = app
                .library
                .delete_photo(photo_id)?
                .ok_or(Error::PhotoNotFound(photo_id))?;
            // Only files the app copied in are ours to delete
            let original = dimension_cam::export::uri_to_path(&photo.original_uri);
            if original.starts_with(app.files.images_dir()) {
                app.files.delete_file(&original)?;
            }
            if let Some(thumbnail) = photo.thumbnail_path {
                app.files.delete_file(Path::new(&thumbnail))?;
            }
            println!("Deleted photo {}", photo_id);
        }
        Command::Cleanup => {
            let referenced = referenced_paths(&app.library)?;
            let removed = app.files.cleanup_orphaned_files(&referenced)?;
            println!("Removed {} files", removed);
        }
        Command::Settings { key: Some(key), value: Some(value) } => {
            set_preference(&app.settings, &key, &value)?
        }
        Command::Settings { .. } => {
            let json = serde_json::to_string_pretty(&app.settings.current())?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Import one image, or every image below a folder
fn import(app: &App, source: &Path) -> Result<ImportResult> {
    let mut result = ImportResult::default();

    // Walk the directory tree recursively
    for entry in WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Only process image files (not directories)
        if !path.is_file() || !is_image_file(path) {
            continue;
        }

        let imported = app
            .files
            .copy_photo_to_storage(path)
            .and_then(|stored| app.library.insert_photo(&stored.to_string_lossy()));
        match imported {
            Ok(_) => result.imported_count += 1,
            Err(e) => {
                log::warn!("Error importing {}: {}", path.display(), e);
                result.failed_count += 1;
            }
        }
    }

    log::info!(
        "Import complete: {} new, {} failed",
        result.imported_count,
        result.failed_count
    );
    Ok(result)
}

/// Add a marking the way a drag gesture would
fn mark(app: &mut App, photo_id: i64, coords: [f32; 4], distance: &str) -> Result<i64> {
    ensure_photo(&app.library, photo_id)?;
    let mut canvas = MarkingCanvas::open(&mut app.library, photo_id, app.settings.subscribe())?;
    canvas.begin_create();
    canvas.drag_start(coords[0], coords[1]);
    canvas.drag_move(coords[2], coords[3])?;
    canvas.drag_end();
    let id = canvas.confirm_distance(distance)?;
    id.ok_or(Error::InvalidDistance(distance.to_string()))
}

fn export(app: &App, photo_id: i64, out_dir: PathBuf) -> Result<PathBuf> {
    let photo = app
        .library
        .photo(photo_id)?
        .ok_or(Error::PhotoNotFound(photo_id))?;
    let markings = app.library.markings_for_photo(photo_id)?;
    let arrow_style = app.settings.current().arrow_style;

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let path = runtime.block_on(export_marked_image_async(
        photo.original_uri,
        markings,
        arrow_style,
        out_dir,
    ))?;

    if let Err(e) = refresh_thumbnail(&app.library, photo_id, arrow_style, app.files.thumbnails_dir()) {
        log::warn!("Could not refresh thumbnail for photo {}: {}", photo_id, e);
    }
    Ok(path)
}

fn set_preference(settings: &SettingsStore, key: &str, value: &str) -> Result<()> {
    let invalid = || Error::InvalidArgument(format!("{:?} for {}", value, key));
    match key {
        "arrow_style" => settings.set_arrow_style(match value {
            "arrow" => ArrowStyle::Arrow,
            "tcap" => ArrowStyle::TCap,
            "circle" => ArrowStyle::Circle,
            _ => return Err(invalid()),
        }),
        "default_distance_unit" => settings.set_default_distance_unit(
            DistanceUnit::parse(&value.to_uppercase()).ok_or_else(invalid)?,
        ),
        "language_code" => settings.set_language_code(value),
        "default_line_color" => settings.set_default_line_color(parse_argb(value).ok_or_else(invalid)?),
        "default_text_color" => settings.set_default_text_color(parse_argb(value).ok_or_else(invalid)?),
        "default_line_width_dp" => {
            settings.set_default_line_width_dp(value.parse().map_err(|_| invalid())?)
        }
        "default_text_size_sp" => {
            settings.set_default_text_size_sp(value.parse().map_err(|_| invalid())?)
        }
        _ => Err(invalid()),
    }
}

/// `#AARRGGBB` or `#RRGGBB` (opaque)
fn parse_argb(value: &str) -> Option<u32> {
    let hex = value.trim_start_matches('#');
    let parsed = u32::from_str_radix(hex, 16).ok()?;
    match hex.len() {
        8 => Some(parsed),
        6 => Some(0xFF00_0000 | parsed),
        _ => None,
    }
}

fn ensure_photo(library: &Library, photo_id: i64) -> Result<()> {
    library
        .photo(photo_id)?
        .map(|_| ())
        .ok_or(Error::PhotoNotFound(photo_id))
}
