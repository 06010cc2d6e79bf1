//! # Item-based Recommender
//!
//! Coordinates the item-based collaborative-filtering pipeline:
//! 1. Hold the rating store (means are kept current by the store)
//! 2. Obtain the similarity matrix: load the persisted one, or build and save
//! 3. Rank the catalog with similarity-weighted predictions
//! 4. Absorb new ratings without touching the matrix
//!
//! The matrix goes stale as ratings come in. Refreshing it is an explicit
//! call to [`ItemBasedRecommender::rebuild_similarity`].

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use data_loader::{ItemId, RatingStore, RatingValue};
use similarity::{SimilarityArtifact, SimilarityError, SimilarityMatrix, SimilarityMatrixBuilder};

use crate::ranker::{RecommendationRanker, ScoredItem};
use crate::session::{Session, SessionSampler};
use crate::traits::Recommender;

/// How the similarity matrix is obtained at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixInit {
    /// Use the persisted matrix, building (and saving) one if none exists
    LoadOrBuild,
    /// Always build from the current ratings and overwrite the artifact
    Rebuild,
}

pub struct ItemBasedRecommender {
    store: RatingStore,
    matrix: SimilarityMatrix,
    builder: SimilarityMatrixBuilder,
    artifact: Box<dyn SimilarityArtifact>,
    sampler: SessionSampler,
}

impl ItemBasedRecommender {
    /// Create the recommender and obtain its similarity matrix
    pub fn new(
        store: RatingStore,
        artifact: Box<dyn SimilarityArtifact>,
        init: MatrixInit,
    ) -> Result<Self> {
        let sampler = SessionSampler::new(store.catalog());
        let builder = SimilarityMatrixBuilder::new();

        let matrix = match init {
            MatrixInit::LoadOrBuild => match artifact.load() {
                Ok(matrix) => matrix,
                Err(SimilarityError::MissingArtifact { location }) => {
                    warn!(
                        "No similarity matrix at {}, building a fresh one",
                        location
                    );
                    build_and_save(&builder, &store, artifact.as_ref())?
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "Failed to load similarity matrix from {}",
                            artifact.location()
                        )
                    });
                }
            },
            MatrixInit::Rebuild => build_and_save(&builder, &store, artifact.as_ref())?,
        };

        Ok(Self {
            store,
            matrix,
            builder,
            artifact,
            sampler,
        })
    }

    /// Replace the session sampler (e.g. with a seeded one)
    pub fn with_sampler(mut self, sampler: SessionSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Rebuild the matrix from the current ratings and persist it
    pub fn rebuild_similarity(&mut self) -> Result<()> {
        self.matrix = build_and_save(&self.builder, &self.store, self.artifact.as_ref())?;
        Ok(())
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        &self.matrix
    }

    pub fn sampler(&self) -> &SessionSampler {
        &self.sampler
    }

    /// Effective rating of every catalog item for the session's user
    pub fn score_catalog(&self, session: &Session) -> Result<Vec<ScoredItem>> {
        RecommendationRanker::new(&self.store, &self.matrix)
            .score_catalog(session.user_id())
    }

    /// Ranked items with their scores
    pub fn recommend_scored(&self, session: &Session, top_n: usize) -> Result<Vec<ScoredItem>> {
        RecommendationRanker::new(&self.store, &self.matrix)
            .recommend(session.user_id(), top_n)
    }
}

impl Recommender for ItemBasedRecommender {
    fn name(&self) -> &str {
        "item-based"
    }

    fn login(&mut self, username: &str) -> Session {
        info!(username, "Login");
        self.sampler.login(username)
    }

    #[instrument(skip(self, session), fields(user = session.user_id()))]
    fn recommend(&self, session: &Session, top_n: usize) -> Result<Vec<ItemId>> {
        let start = Instant::now();
        let ranked = self.recommend_scored(session, top_n)?;
        info!(
            "Ranked {} items for {} in {:.2?}",
            self.store.catalog().len(),
            session.user_id(),
            start.elapsed()
        );
        Ok(ranked.into_iter().map(|s| s.item_id).collect())
    }

    #[instrument(skip(self, session, items, ratings), fields(user = session.user_id()))]
    fn submit_ratings(
        &mut self,
        session: &Session,
        items: &[ItemId],
        ratings: &[RatingValue],
    ) -> Result<()> {
        self.store
            .append(session.user_id(), items, ratings)
            .context("Failed to record ratings")?;
        info!(
            "Recorded {} ratings for {}; similarity matrix left as built",
            items.len(),
            session.user_id()
        );
        Ok(())
    }

    fn next_item_to_rate(&mut self, session: Option<&Session>) -> Option<ItemId> {
        self.sampler.next_item(session)
    }
}

fn build_and_save(
    builder: &SimilarityMatrixBuilder,
    store: &RatingStore,
    artifact: &dyn SimilarityArtifact,
) -> Result<SimilarityMatrix> {
    let start = Instant::now();
    let matrix = builder.build(store.centering().adjusted_ratings());
    info!("Similarity build took {:.2?}", start.elapsed());

    artifact
        .save(&matrix)
        .with_context(|| {
            format!(
                "Failed to save similarity matrix to {}",
                artifact.location()
            )
        })?;
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Catalog, Rating};
    use similarity::InMemoryArtifact;
    use std::sync::Arc;

    fn seed_store() -> RatingStore {
        RatingStore::from_ratings(
            Catalog::new(3),
            vec![
                Rating::new("u1", 1, 5),
                Rating::new("u1", 2, 1),
                Rating::new("u2", 1, 4),
                Rating::new("u2", 3, 5),
                Rating::new("u3", 2, 2),
                Rating::new("u3", 3, 4),
            ],
        )
        .unwrap()
    }

    /// Lets a test keep looking at the artifact after handing it over
    struct SharedArtifact(Arc<InMemoryArtifact>);

    impl SimilarityArtifact for SharedArtifact {
        fn location(&self) -> String {
            self.0.location()
        }

        fn load(&self) -> similarity::Result<SimilarityMatrix> {
            self.0.load()
        }

        fn save(&self, matrix: &SimilarityMatrix) -> similarity::Result<()> {
            self.0.save(matrix)
        }
    }

    #[test]
    fn test_missing_artifact_triggers_build_and_save() {
        let artifact = Arc::new(InMemoryArtifact::new());
        let recommender = ItemBasedRecommender::new(
            seed_store(),
            Box::new(SharedArtifact(artifact.clone())),
            MatrixInit::LoadOrBuild,
        )
        .unwrap();

        assert!(artifact.is_saved());
        assert_eq!(recommender.matrix().len(), 6);
    }

    #[test]
    fn test_existing_artifact_is_loaded_not_rebuilt() {
        let mut cached = SimilarityMatrix::new();
        cached.insert(1, 2, 0.5);
        let recommender = ItemBasedRecommender::new(
            seed_store(),
            Box::new(InMemoryArtifact::with_matrix(cached.clone())),
            MatrixInit::LoadOrBuild,
        )
        .unwrap();

        assert_eq!(recommender.matrix(), &cached);
    }

    #[test]
    fn test_rebuild_ignores_existing_artifact() {
        let mut cached = SimilarityMatrix::new();
        cached.insert(1, 2, 0.5);
        let recommender = ItemBasedRecommender::new(
            seed_store(),
            Box::new(InMemoryArtifact::with_matrix(cached)),
            MatrixInit::Rebuild,
        )
        .unwrap();

        assert!((recommender.matrix().weight(1, 2).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_submit_leaves_matrix_stale_until_rebuild() {
        let mut recommender = ItemBasedRecommender::new(
            seed_store(),
            Box::new(InMemoryArtifact::new()),
            MatrixInit::Rebuild,
        )
        .unwrap();
        let before = recommender.matrix().clone();

        let session = recommender.login("alice");
        recommender.submit_ratings(&session, &[1, 2], &[5, 5]).unwrap();
        assert_eq!(recommender.matrix(), &before);

        recommender.rebuild_similarity().unwrap();
        assert_ne!(recommender.matrix(), &before);
    }

    #[test]
    fn test_submit_rejects_bad_batch() {
        let mut recommender = ItemBasedRecommender::new(
            seed_store(),
            Box::new(InMemoryArtifact::new()),
            MatrixInit::Rebuild,
        )
        .unwrap();
        let session = recommender.login("alice");

        assert!(recommender.submit_ratings(&session, &[1, 2], &[5]).is_err());
        assert!(recommender.submit_ratings(&session, &[4], &[5]).is_err());
        assert_eq!(recommender.store().ratings().len(), 6);
    }
}
