/// State management module
///
/// This module handles all persistent and session state:
/// - Shared data structures (data.rs)
/// - Database connections and queries (library.rs)
/// - User preferences and their observers (settings.rs)
/// - Undo log for marking edits (history.rs)

pub mod data;
pub mod history;
pub mod library;
pub mod settings;
