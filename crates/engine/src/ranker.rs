//! Ranking the catalog for a user.
//!
//! Every catalog item gets an effective rating: the user's own rating when
//! they gave one, a prediction otherwise. Items are then sorted by that value,
//! highest first, with ascending item id breaking ties.

use anyhow::{Context, Result};
use data_loader::{ItemId, RatingStore};
use similarity::{PredictionEngine, SimilarityMatrix};
use std::cmp::Ordering;

/// An item with the rating used to rank it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f64,
    /// `true` when `score` is the user's own rating rather than a prediction
    pub known: bool,
}

/// Ranks the whole catalog with item-based predictions
pub struct RecommendationRanker<'a> {
    store: &'a RatingStore,
    predictor: PredictionEngine<'a>,
}

impl<'a> RecommendationRanker<'a> {
    pub fn new(store: &'a RatingStore, matrix: &'a SimilarityMatrix) -> Self {
        Self {
            store,
            predictor: PredictionEngine::new(store, matrix),
        }
    }

    /// Effective rating of every catalog item, in catalog order
    pub fn score_catalog(&self, user_id: &str) -> Result<Vec<ScoredItem>> {
        let rated = self.store.user_rated_items(user_id);

        self.store
            .catalog()
            .items()
            .map(|item_id| match rated.get(&item_id) {
                Some(&rating) => Ok(ScoredItem {
                    item_id,
                    score: rating as f64,
                    known: true,
                }),
                None => {
                    let score = self
                        .predictor
                        .predict_from_profile(&rated, item_id)
                        .with_context(|| format!("Failed to predict item {}", item_id))?;
                    Ok(ScoredItem {
                        item_id,
                        score,
                        known: false,
                    })
                }
            })
            .collect()
    }

    /// Top `top_n` items for the user, best first
    pub fn recommend(&self, user_id: &str, top_n: usize) -> Result<Vec<ScoredItem>> {
        let scored = self.score_catalog(user_id)?;
        Ok(rank_and_select(scored, top_n))
    }
}

/// Sort by score DESC, then item id ASC, and keep the first `limit`
pub fn rank_and_select(mut scored: Vec<ScoredItem>, limit: usize) -> Vec<ScoredItem> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Catalog, Rating};
    use similarity::SimilarityMatrixBuilder;

    fn scored(item_id: ItemId, score: f64) -> ScoredItem {
        ScoredItem {
            item_id,
            score,
            known: false,
        }
    }

    #[test]
    fn test_rank_sorts_by_score_descending() {
        let ranked = rank_and_select(vec![scored(1, 2.0), scored(2, 4.5), scored(3, 3.0)], 10);
        let ids: Vec<ItemId> = ranked.iter().map(|s| s.item_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_rank_breaks_ties_by_item_id() {
        let ranked = rank_and_select(
            vec![scored(9, 3.0), scored(4, 3.0), scored(7, 3.0), scored(1, 1.0)],
            3,
        );
        let ids: Vec<ItemId> = ranked.iter().map(|s| s.item_id).collect();
        assert_eq!(ids, vec![4, 7, 9]);
    }

    #[test]
    fn test_rank_truncates_and_handles_empty() {
        assert!(rank_and_select(vec![], 5).is_empty());
        assert_eq!(rank_and_select(vec![scored(1, 1.0), scored(2, 2.0)], 1).len(), 1);
        assert!(rank_and_select(vec![scored(1, 1.0)], 0).is_empty());
    }

    #[test]
    fn test_rank_handles_nan_scores() {
        let ranked = rank_and_select(vec![scored(1, f64::NAN), scored(2, 0.8)], 10);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_known_rating_of_five_wins() {
        let mut store = RatingStore::from_ratings(
            Catalog::new(3),
            vec![
                Rating::new("u1", 1, 3),
                Rating::new("u1", 2, 4),
                Rating::new("u2", 2, 2),
                Rating::new("u2", 3, 3),
                Rating::new("u3", 1, 2),
                Rating::new("u3", 3, 4),
            ],
        )
        .unwrap();
        let matrix = SimilarityMatrixBuilder::new().build(store.centering().adjusted_ratings());
        store.append("alice", &[2], &[5]).unwrap();

        let ranker = RecommendationRanker::new(&store, &matrix);
        let catalog = ranker.score_catalog("alice").unwrap();
        assert!(catalog.iter().filter(|s| !s.known).all(|s| s.score < 5.0));

        let top = ranker.recommend("alice", 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].item_id, 2);
        assert!(top[0].known);
    }

    #[test]
    fn test_missing_mean_propagates() {
        let store = RatingStore::from_ratings(Catalog::new(2), vec![Rating::new("u1", 1, 4)])
            .unwrap();
        let matrix = SimilarityMatrix::new();
        let ranker = RecommendationRanker::new(&store, &matrix);

        assert!(ranker.recommend("u1", 2).is_err());
    }
}
