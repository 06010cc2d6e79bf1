//! # Similarity Crate
//!
//! Item-based collaborative filtering on top of the rating store.
//!
//! ## Components
//!
//! ### SimilarityMatrixBuilder
//! Cosine similarity between the mean-adjusted rating columns of every pair of
//! items, restricted to the users who rated both.
//!
//! ### SimilarityArtifact
//! Load/save collaborator for the built matrix, so a restart can skip the
//! build. `JsonFileArtifact` for disk, `InMemoryArtifact` for tests.
//!
//! ### PredictionEngine
//! Item mean plus the similarity-weighted deviations of the user's own ratings.
//!
//! ## Example Usage
//!
//! ```ignore
//! use similarity::{JsonFileArtifact, PredictionEngine, SimilarityArtifact, SimilarityMatrixBuilder};
//!
//! let matrix = SimilarityMatrixBuilder::new().build(store.centering().adjusted_ratings());
//! JsonFileArtifact::new("w_matrix.json").save(&matrix)?;
//!
//! let engine = PredictionEngine::new(&store, &matrix);
//! let estimate = engine.predict("alice", 12)?;
//! ```

pub mod artifact;
pub mod error;
pub mod matrix;
pub mod predictor;

pub use artifact::{InMemoryArtifact, JsonFileArtifact, SimilarityArtifact};
pub use error::{Result, SimilarityError};
pub use matrix::{SimilarityEntry, SimilarityMatrix, SimilarityMatrixBuilder};
pub use predictor::PredictionEngine;
