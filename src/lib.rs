//! Measurement markings on photos
//!
//! Markings are line segments in normalized photo coordinates, each
//! labelled with a real-world distance. This crate hit-tests and renders
//! them, drives the create/select/drag/reorder/undo interaction, keeps
//! them in a SQLite catalog and flattens them into exported images.

pub mod color;
pub mod error;
pub mod export;
pub mod geometry;
pub mod render;
pub mod state;
pub mod ui;

pub use error::{Error, Result};
