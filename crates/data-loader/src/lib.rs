//! # Data Loader Crate
//!
//! Loads the seed ratings and keeps the rating log the recommenders learn from.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Rating, AdjustedRating, Catalog)
//! - **parser**: Parse the `userId,itemId,rating` seed file
//! - **centering**: Item means and mean-adjusted ratings
//! - **store**: The append-only `RatingStore`
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{Catalog, RatingStore};
//! use std::path::Path;
//!
//! let mut store = RatingStore::load_from_file(Path::new("ratings.csv"), Catalog::default())?;
//! store.append("alice", &[3, 17], &[5, 2])?;
//!
//! println!("Item 3 mean: {:.2}", store.item_mean(3)?);
//! ```

pub mod centering;
pub mod error;
pub mod parser;
pub mod store;
pub mod types;

pub use centering::MeanCentering;
pub use error::{DataLoadError, Result};
pub use store::RatingStore;
pub use types::{
    // Type aliases
    ItemId,
    RatingValue,
    UserId,
    // Core types
    AdjustedRating,
    Catalog,
    ItemStats,
    Rating,
    // Constants
    DEFAULT_CATALOG_SIZE,
    EPSILON,
    RATING_RANGE,
};
