//! # Engine Crate
//!
//! The recommender front ends talk to.
//!
//! ## Components
//!
//! - **traits**: The `Recommender` trait (login, recommend, submit, next item)
//! - **session**: `Session` and the per-user `SessionSampler`
//! - **ranker**: Effective ratings for the whole catalog, sorted and cut
//! - **item_based**: Similarity-weighted backend with a persisted matrix
//! - **factorization**: Biased matrix-factorization backend
//! - **config**: `EngineConfig` and `build_recommender`
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::RatingStore;
//! use engine::{EngineConfig, build_recommender};
//!
//! let config = EngineConfig::default();
//! let store = RatingStore::load_from_file(Path::new("ratings.csv"), config.catalog())?;
//! let mut recommender = build_recommender(&config, store)?;
//!
//! let session = recommender.login("alice");
//! let item = recommender.next_item_to_rate(Some(&session));
//! recommender.submit_ratings(&session, &[12], &[5])?;
//! let top = recommender.recommend(&session, 4)?;
//! ```

pub mod config;
pub mod factorization;
pub mod item_based;
pub mod ranker;
pub mod session;
pub mod traits;

pub use config::{BackendKind, EngineConfig, build_recommender};
pub use factorization::{FactorizationConfig, FactorizationRecommender};
pub use item_based::{ItemBasedRecommender, MatrixInit};
pub use ranker::{RecommendationRanker, ScoredItem, rank_and_select};
pub use session::{Session, SessionSampler};
pub use traits::Recommender;
