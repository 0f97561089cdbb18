use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::data::{DistanceUnit, Marking, NewMarking, Photo};
use crate::error::{Error, Result};

/// Storage of markings for the interaction layer
///
/// Listing is always ascending by display order. Updating or deleting an id
/// that does not exist is a no-op, reported through the return value.
/// Every mutation bumps the owning photo's modified timestamp.
pub trait MarkingStore {
    fn markings_for_photo(&self, photo_id: i64) -> Result<Vec<Marking>>;

    fn marking(&self, id: i64) -> Result<Option<Marking>>;

    /// Insert and return the assigned id
    fn insert_marking(&mut self, marking: &NewMarking) -> Result<i64>;

    /// Re-insert a previously deleted marking under its original id
    fn restore_marking(&mut self, marking: &Marking) -> Result<i64>;

    /// Replace a stored marking. Returns false if the id is unknown.
    fn update_marking(&mut self, marking: &Marking) -> Result<bool>;

    /// Replace several markings atomically
    fn update_markings(&mut self, markings: &[Marking]) -> Result<()>;

    /// Delete by id, returning the removed marking
    fn delete_marking(&mut self, id: i64) -> Result<Option<Marking>>;

    fn delete_all_markings(&mut self, photo_id: i64) -> Result<usize>;

    fn max_display_order(&self, photo_id: i64) -> Result<Option<u32>>;

    /// Display order that places a new marking on top
    fn next_display_order(&self, photo_id: i64) -> Result<u32> {
        Ok(self.max_display_order(photo_id)?.map_or(0, |max| max + 1))
    }
}

impl<T: MarkingStore + ?Sized> MarkingStore for &mut T {
    fn markings_for_photo(&self, photo_id: i64) -> Result<Vec<Marking>> {
        (**self).markings_for_photo(photo_id)
    }

    fn marking(&self, id: i64) -> Result<Option<Marking>> {
        (**self).marking(id)
    }

    fn insert_marking(&mut self, marking: &NewMarking) -> Result<i64> {
        (**self).insert_marking(marking)
    }

    fn restore_marking(&mut self, marking: &Marking) -> Result<i64> {
        (**self).restore_marking(marking)
    }

    fn update_marking(&mut self, marking: &Marking) -> Result<bool> {
        (**self).update_marking(marking)
    }

    fn update_markings(&mut self, markings: &[Marking]) -> Result<()> {
        (**self).update_markings(markings)
    }

    fn delete_marking(&mut self, id: i64) -> Result<Option<Marking>> {
        (**self).delete_marking(id)
    }

    fn delete_all_markings(&mut self, photo_id: i64) -> Result<usize> {
        (**self).delete_all_markings(photo_id)
    }

    fn max_display_order(&self, photo_id: i64) -> Result<Option<u32>> {
        (**self).max_display_order(photo_id)
    }
}

/// The Library manages the SQLite catalog database.
/// It stores photos and the markings drawn on them.
pub struct Library {
    conn: Connection,
    db_path: Option<PathBuf>,
}

const MARKING_COLUMNS: &str = "id, photo_id, start_x, start_y, end_x, end_y, distance_value, \
     distance_unit, line_color, line_width_dp, text_color, text_size_sp, display_order";

impl Library {
    /// Open (or create) the catalog at `path` and initialize the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        log::info!("Catalog opened at {}", db_path.display());

        let library = Library { conn, db_path: Some(db_path) };
        library.init_schema()?;
        Ok(library)
    }

    /// Catalog that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let library = Library {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Get the path where the database should be stored
    ///
    /// - Linux: ~/.local/share/dimension-cam/dimension_cam.db
    /// - macOS: ~/Library/Application Support/dimension-cam/dimension_cam.db
    /// - Windows: %APPDATA%\dimension-cam\dimension_cam.db
    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(Error::NoDataDirectory)?;
        path.push("dimension-cam");
        path.push("dimension_cam.db");
        Ok(path)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        // Cascade deletes depend on this, and SQLite defaults it to off
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS photos (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                original_uri    TEXT NOT NULL,
                thumbnail_path  TEXT,
                created_at      INTEGER NOT NULL,
                modified_at     INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS markings (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                photo_id        INTEGER NOT NULL,
                start_x         REAL NOT NULL,
                start_y         REAL NOT NULL,
                end_x           REAL NOT NULL,
                end_y           REAL NOT NULL,
                distance_value  REAL NOT NULL,
                distance_unit   TEXT NOT NULL,
                line_color      INTEGER NOT NULL,
                line_width_dp   REAL NOT NULL,
                text_color      INTEGER NOT NULL,
                text_size_sp    REAL NOT NULL,
                display_order   INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(photo_id) REFERENCES photos(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photos_modified_at
             ON photos(modified_at DESC)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_markings_photo_id
             ON markings(photo_id)",
            [],
        )?;

        log::debug!("Catalog schema initialized");
        Ok(())
    }

    /// Get the path to the database file (None for in-memory catalogs)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    // ========== Photos ==========

    /// Add a photo and return its new id
    pub fn insert_photo(&self, original_uri: &str) -> Result<i64> {
        let now = now_millis();
        self.conn.execute(
            "INSERT INTO photos (original_uri, created_at, modified_at) VALUES (?1, ?2, ?2)",
            params![original_uri, now],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Imported photo {} from {}", id, original_uri);
        Ok(id)
    }

    pub fn photo(&self, id: i64) -> Result<Option<Photo>> {
        let photo = self
            .conn
            .query_row(
                "SELECT id, original_uri, thumbnail_path, created_at, modified_at
                 FROM photos WHERE id = ?1",
                [id],
                photo_from_row,
            )
            .optional()?;
        Ok(photo)
    }

    /// All photos, most recently modified first
    pub fn all_photos(&self) -> Result<Vec<Photo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, original_uri, thumbnail_path, created_at, modified_at
             FROM photos ORDER BY modified_at DESC, id DESC",
        )?;
        let photos = stmt
            .query_map([], photo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    /// Persist a photo's mutable fields and bump its modified time.
    /// The original locator is never rewritten.
    pub fn update_photo(&self, photo: &Photo) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE photos SET thumbnail_path = ?1 WHERE id = ?2",
            params![photo.thumbnail_path, photo.id],
        )?;
        if changed > 0 {
            bump_modified(&self.conn, photo.id)?;
        }
        Ok(changed > 0)
    }

    /// Mark a photo as just modified
    pub fn touch_photo(&self, id: i64) -> Result<bool> {
        Ok(bump_modified(&self.conn, id)? > 0)
    }

    /// Record where the marked thumbnail was written.
    /// Derived data, so the modified time is left alone.
    pub fn set_thumbnail_path(&self, id: i64, path: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE photos SET thumbnail_path = ?1 WHERE id = ?2",
            params![path, id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a photo together with all of its markings
    pub fn delete_photo(&self, id: i64) -> Result<Option<Photo>> {
        let Some(photo) = self.photo(id)? else {
            return Ok(None);
        };
        self.conn.execute("DELETE FROM photos WHERE id = ?1", [id])?;
        log::info!("Deleted photo {}", id);
        Ok(Some(photo))
    }

    /// Get a count of photos in the library
    pub fn photo_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl MarkingStore for Library {
    fn markings_for_photo(&self, photo_id: i64) -> Result<Vec<Marking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MARKING_COLUMNS} FROM markings WHERE photo_id = ?1
             ORDER BY display_order ASC, id ASC"
        ))?;
        let markings = stmt
            .query_map([photo_id], marking_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(markings)
    }

    fn marking(&self, id: i64) -> Result<Option<Marking>> {
        let marking = self
            .conn
            .query_row(
                &format!("SELECT {MARKING_COLUMNS} FROM markings WHERE id = ?1"),
                [id],
                marking_from_row,
            )
            .optional()?;
        Ok(marking)
    }

    fn insert_marking(&mut self, marking: &NewMarking) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO markings (photo_id, start_x, start_y, end_x, end_y, distance_value,
                 distance_unit, line_color, line_width_dp, text_color, text_size_sp, display_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                marking.photo_id,
                marking.start_x,
                marking.start_y,
                marking.end_x,
                marking.end_y,
                marking.distance_value,
                marking.distance_unit,
                marking.style.line_color,
                marking.style.line_width_dp,
                marking.style.text_color,
                marking.style.text_size_sp,
                marking.display_order,
            ],
        )?;
        let id = tx.last_insert_rowid();
        bump_modified(&tx, marking.photo_id)?;
        tx.commit()?;
        Ok(id)
    }

    fn restore_marking(&mut self, marking: &Marking) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO markings ({MARKING_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                marking.id,
                marking.photo_id,
                marking.start_x,
                marking.start_y,
                marking.end_x,
                marking.end_y,
                marking.distance_value,
                marking.distance_unit,
                marking.line_color,
                marking.line_width_dp,
                marking.text_color,
                marking.text_size_sp,
                marking.display_order,
            ],
        )?;
        bump_modified(&tx, marking.photo_id)?;
        tx.commit()?;
        Ok(marking.id)
    }

    fn update_marking(&mut self, marking: &Marking) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let changed = write_marking(&tx, marking)?;
        if changed {
            bump_modified(&tx, marking.photo_id)?;
        }
        tx.commit()?;
        Ok(changed)
    }

    fn update_markings(&mut self, markings: &[Marking]) -> Result<()> {
        let tx = self.conn.transaction()?;
        let mut touched: Vec<i64> = Vec::new();
        for marking in markings {
            if write_marking(&tx, marking)? && !touched.contains(&marking.photo_id) {
                touched.push(marking.photo_id);
            }
        }
        for photo_id in touched {
            bump_modified(&tx, photo_id)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_marking(&mut self, id: i64) -> Result<Option<Marking>> {
        let Some(marking) = self.marking(id)? else {
            return Ok(None);
        };
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM markings WHERE id = ?1", [id])?;
        bump_modified(&tx, marking.photo_id)?;
        tx.commit()?;
        Ok(Some(marking))
    }

    fn delete_all_markings(&mut self, photo_id: i64) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute("DELETE FROM markings WHERE photo_id = ?1", [photo_id])?;
        if deleted > 0 {
            bump_modified(&tx, photo_id)?;
        }
        tx.commit()?;
        Ok(deleted)
    }

    fn max_display_order(&self, photo_id: i64) -> Result<Option<u32>> {
        let max: Option<u32> = self.conn.query_row(
            "SELECT MAX(display_order) FROM markings WHERE photo_id = ?1",
            [photo_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl ToSql for DistanceUnit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DistanceUnit {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        DistanceUnit::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Strictly increasing, even when the clock has not advanced
fn bump_modified(conn: &Connection, photo_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE photos SET modified_at = MAX(?1, modified_at + 1) WHERE id = ?2",
        params![now_millis(), photo_id],
    )
}

fn write_marking(conn: &Connection, marking: &Marking) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE markings SET photo_id = ?2, start_x = ?3, start_y = ?4, end_x = ?5, end_y = ?6,
             distance_value = ?7, distance_unit = ?8, line_color = ?9, line_width_dp = ?10,
             text_color = ?11, text_size_sp = ?12, display_order = ?13
         WHERE id = ?1",
        params![
            marking.id,
            marking.photo_id,
            marking.start_x,
            marking.start_y,
            marking.end_x,
            marking.end_y,
            marking.distance_value,
            marking.distance_unit,
            marking.line_color,
            marking.line_width_dp,
            marking.text_color,
            marking.text_size_sp,
            marking.display_order,
        ],
    )?;
    Ok(changed > 0)
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        original_uri: row.get(1)?,
        thumbnail_path: row.get(2)?,
        created_at: row.get(3)?,
        modified_at: row.get(4)?,
    })
}

fn marking_from_row(row: &Row<'_>) -> rusqlite::Result<Marking> {
    Ok(Marking {
        id: row.get(0)?,
        photo_id: row.get(1)?,
        start_x: row.get(2)?,
        start_y: row.get(3)?,
        end_x: row.get(4)?,
        end_y: row.get(5)?,
        distance_value: row.get(6)?,
        distance_unit: row.get(7)?,
        line_color: row.get(8)?,
        line_width_dp: row.get(9)?,
        text_color: row.get(10)?,
        text_size_sp: row.get(11)?,
        display_order: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;
    use crate::state::data::{fixture_marking, MarkingStyle};

    fn new_marking(photo_id: i64, display_order: u32) -> NewMarking {
        NewMarking {
            photo_id,
            start_x: 0.1,
            start_y: 0.2,
            end_x: 0.7,
            end_y: 0.4,
            distance_value: 25.0,
            distance_unit: DistanceUnit::Mm,
            style: MarkingStyle {
                line_color: color::BLUE,
                line_width_dp: 4.0,
                text_color: color::BLACK,
                text_size_sp: 16.0,
            },
            display_order,
        }
    }

    fn library_with_photo() -> (Library, i64) {
        let library = Library::open_in_memory().unwrap();
        let photo_id = library.insert_photo("file:///tmp/a.jpg").unwrap();
        (library, photo_id)
    }

    #[test]
    fn test_insert_and_read_back() {
        let (mut library, photo_id) = library_with_photo();
        let new = new_marking(photo_id, 0);
        let id = library.insert_marking(&new).unwrap();

        let stored = library.marking(id).unwrap().unwrap();
        assert_eq!(stored, new.with_id(id));
    }

    #[test]
    fn test_listing_is_ordered_by_display_order() {
        let (mut library, photo_id) = library_with_photo();
        let top = library.insert_marking(&new_marking(photo_id, 5)).unwrap();
        let bottom = library.insert_marking(&new_marking(photo_id, 1)).unwrap();

        let ids: Vec<i64> = library
            .markings_for_photo(photo_id)
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![bottom, top]);
    }

    #[test]
    fn test_next_display_order() {
        let (mut library, photo_id) = library_with_photo();
        assert_eq!(library.max_display_order(photo_id).unwrap(), None);
        assert_eq!(library.next_display_order(photo_id).unwrap(), 0);

        library.insert_marking(&new_marking(photo_id, 3)).unwrap();
        assert_eq!(library.next_display_order(photo_id).unwrap(), 4);
    }

    #[test]
    fn test_missing_ids_are_noops() {
        let (mut library, photo_id) = library_with_photo();
        let before = library.photo(photo_id).unwrap().unwrap().modified_at;

        assert!(!library.update_marking(&fixture_marking(99, photo_id, 0)).unwrap());
        assert_eq!(library.delete_marking(99).unwrap(), None);
        assert_eq!(library.marking(99).unwrap(), None);

        let after = library.photo(photo_id).unwrap().unwrap().modified_at;
        assert_eq!(before, after);
    }

    #[test]
    fn test_child_mutations_bump_modified_strictly() {
        let (mut library, photo_id) = library_with_photo();
        let mut last = library.photo(photo_id).unwrap().unwrap().modified_at;
        let mut check = |library: &Library| {
            let now = library.photo(photo_id).unwrap().unwrap().modified_at;
            assert!(now > last, "{} should be after {}", now, last);
            last = now;
        };

        let id = library.insert_marking(&new_marking(photo_id, 0)).unwrap();
        check(&library);

        let mut marking = library.marking(id).unwrap().unwrap();
        marking.end_x = 0.9;
        assert!(library.update_marking(&marking).unwrap());
        check(&library);

        library.delete_marking(id).unwrap();
        check(&library);

        library.restore_marking(&marking).unwrap();
        check(&library);
    }

    #[test]
    fn test_restore_preserves_id() {
        let (mut library, photo_id) = library_with_photo();
        let id = library.insert_marking(&new_marking(photo_id, 0)).unwrap();
        let deleted = library.delete_marking(id).unwrap().unwrap();

        assert_eq!(library.restore_marking(&deleted).unwrap(), id);
        assert_eq!(library.marking(id).unwrap(), Some(deleted));
    }

    #[test]
    fn test_batch_update_is_applied() {
        let (mut library, photo_id) = library_with_photo();
        let a = library.insert_marking(&new_marking(photo_id, 0)).unwrap();
        let b = library.insert_marking(&new_marking(photo_id, 1)).unwrap();

        let mut markings = library.markings_for_photo(photo_id).unwrap();
        markings[0].display_order = 1;
        markings[1].display_order = 0;
        library.update_markings(&markings).unwrap();

        let ids: Vec<i64> = library
            .markings_for_photo(photo_id)
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_batch_update_bumps_modified_once() {
        let (mut library, photo_id) = library_with_photo();
        for order in 0..3 {
            library.insert_marking(&new_marking(photo_id, order)).unwrap();
        }
        // Far ahead of the clock, so each bump adds exactly one
        let future = now_millis() + 1_000_000;
        library
            .conn
            .execute("UPDATE photos SET modified_at = ?1 WHERE id = ?2", params![future, photo_id])
            .unwrap();

        let mut markings = library.markings_for_photo(photo_id).unwrap();
        markings.reverse();
        for (order, marking) in markings.iter_mut().enumerate() {
            marking.display_order = order as u32;
        }
        library.update_markings(&markings).unwrap();

        assert_eq!(library.photo(photo_id).unwrap().unwrap().modified_at, future + 1);
    }

    #[test]
    fn test_deleting_photo_cascades() {
        let (mut library, photo_id) = library_with_photo();
        let other = library.insert_photo("file:///tmp/b.jpg").unwrap();
        let id = library.insert_marking(&new_marking(photo_id, 0)).unwrap();
        let kept = library.insert_marking(&new_marking(other, 0)).unwrap();

        let deleted = library.delete_photo(photo_id).unwrap().unwrap();
        assert_eq!(deleted.original_uri, "file:///tmp/a.jpg");
        assert_eq!(library.marking(id).unwrap(), None);
        assert!(library.marking(kept).unwrap().is_some());
        assert_eq!(library.photo_count().unwrap(), 1);
        assert_eq!(library.delete_photo(photo_id).unwrap(), None);
    }

    #[test]
    fn test_delete_all_markings() {
        let (mut library, photo_id) = library_with_photo();
        library.insert_marking(&new_marking(photo_id, 0)).unwrap();
        library.insert_marking(&new_marking(photo_id, 1)).unwrap();

        assert_eq!(library.delete_all_markings(photo_id).unwrap(), 2);
        assert!(library.markings_for_photo(photo_id).unwrap().is_empty());
    }

    #[test]
    fn test_photos_listed_most_recent_first() {
        let (mut library, first) = library_with_photo();
        let second = library.insert_photo("file:///tmp/b.jpg").unwrap();
        library.insert_marking(&new_marking(first, 0)).unwrap();
        library.touch_photo(first).unwrap();

        let ids: Vec<i64> = library.all_photos().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids[0], first);
        assert!(ids.contains(&second));
    }

    #[test]
    fn test_update_photo_keeps_original_uri() {
        let (library, photo_id) = library_with_photo();
        let mut photo = library.photo(photo_id).unwrap().unwrap();
        photo.original_uri = "file:///elsewhere.jpg".to_string();
        photo.thumbnail_path = Some("/cache/thumb_1.jpg".to_string());
        assert!(library.update_photo(&photo).unwrap());

        let stored = library.photo(photo_id).unwrap().unwrap();
        assert_eq!(stored.original_uri, "file:///tmp/a.jpg");
        assert_eq!(stored.thumbnail_path.as_deref(), Some("/cache/thumb_1.jpg"));
        assert!(stored.modified_at > photo.created_at);
    }

    #[test]
    fn test_unknown_unit_in_catalog_is_rejected() {
        let (mut library, photo_id) = library_with_photo();
        let id = library.insert_marking(&new_marking(photo_id, 0)).unwrap();
        library
            .conn
            .execute("UPDATE markings SET distance_unit = 'FT' WHERE id = ?1", [id])
            .unwrap();
        assert!(matches!(library.marking(id), Err(Error::Storage(_))));
    }
}
