//! Error types for the similarity crate.

use data_loader::DataLoadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimilarityError {
    /// A cached matrix was requested but none has been saved yet.
    /// Callers usually answer this by building a fresh matrix.
    #[error("No similarity artifact found at {location}")]
    MissingArtifact { location: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize similarity matrix: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Data(#[from] DataLoadError),
}

pub type Result<T> = std::result::Result<T, SimilarityError>;
