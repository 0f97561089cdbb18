/// Error types shared by every layer of the crate
use thiserror::Error;

/// Everything that can go wrong while editing, storing or exporting markings
#[derive(Debug, Error)]
pub enum Error {
    /// Distance input was not a positive, finite number
    #[error("invalid distance value: {0:?}")]
    InvalidDistance(String),

    /// A reorder request was not a permutation of the photo's markings
    #[error("reorder must list every marking of the photo exactly once")]
    InvalidPermutation,

    /// A command line argument could not be understood
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The referenced photo does not exist in the catalog
    #[error("photo {0} not found")]
    PhotoNotFound(i64),

    /// No usable data/config/cache directory on this platform
    #[error("could not determine a data directory")]
    NoDataDirectory,

    /// The catalog database rejected an operation
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The source image could not be decoded
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The rendered image could not be encoded or written
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("settings file is malformed: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A background task panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
