//! Rating prediction from item-item similarities.
//!
//! A user's predicted rating for an item starts from the item's mean and is
//! shifted by how far above or below the mean the user rated *similar* items:
//!
//! ```text
//! predict(u, i) = mean[i] + Σ_j (r[u,j] - mean[j]) * w(i,j) / Σ_j |w(i,j)|
//! ```
//!
//! where `j` ranges over the items `u` rated that have a weight against `i`.
//! Without any such item (a new user, or no overlap) the mean is returned.

use crate::error::Result;
use crate::matrix::SimilarityMatrix;
use data_loader::{ItemId, RatingStore, RatingValue};
use std::collections::BTreeMap;
use tracing::trace;

/// Predicts ratings from the current store and a similarity matrix
pub struct PredictionEngine<'a> {
    store: &'a RatingStore,
    matrix: &'a SimilarityMatrix,
}

impl<'a> PredictionEngine<'a> {
    pub fn new(store: &'a RatingStore, matrix: &'a SimilarityMatrix) -> Self {
        Self { store, matrix }
    }

    /// Predict `user_id`'s rating for an item they have not rated
    pub fn predict(&self, user_id: &str, item_id: ItemId) -> Result<f64> {
        let rated = self.store.user_rated_items(user_id);
        self.predict_from_profile(&rated, item_id)
    }

    /// Same as [`predict`](Self::predict), with the user's rated items
    /// (first recorded rating per item) already collected
    pub fn predict_from_profile(
        &self,
        rated: &BTreeMap<ItemId, RatingValue>,
        item_id: ItemId,
    ) -> Result<f64> {
        let baseline = self.store.item_mean(item_id)?;

        let mut sum_weighted_other = 0.0;
        let mut sum_abs_weights = 0.0;
        for (&other_id, &rating) in rated {
            let Some(weight) = self.matrix.weight(item_id, other_id) else {
                continue;
            };
            let other_mean = self.store.item_mean(other_id)?;
            sum_weighted_other += (rating as f64 - other_mean) * weight;
            sum_abs_weights += weight.abs();
        }

        if sum_abs_weights == 0.0 {
            trace!(item_id, "No similarity evidence, using item mean");
            return Ok(baseline);
        }
        Ok(baseline + sum_weighted_other / sum_abs_weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::SimilarityMatrixBuilder;
    use data_loader::{Catalog, Rating};

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

    #[test]
    fn test_cold_start_returns_mean_exactly() {
        let store = seed_store();
        let matrix = SimilarityMatrixBuilder::new().build(store.centering().adjusted_ratings());
        let engine = PredictionEngine::new(&store, &matrix);

        for item in 1..=3 {
            assert_eq!(
                engine.predict("newcomer", item).unwrap(),
                store.item_mean(item).unwrap()
            );
        }
    }

    #[test]
    fn test_weighted_deviation() {
        let mut store = seed_store();
        let matrix = SimilarityMatrixBuilder::new().build(store.centering().adjusted_ratings());
        store.append("newcomer", &[1], &[5]).unwrap();
        let engine = PredictionEngine::new(&store, &matrix);

        // Item 1 mean is now (5 + 4 + 5) / 3, so the deviation is +1/3.
        // weight(2, 1) = weight(3, 1) = -1 flips it.
        let deviation = 5.0 - 14.0 / 3.0;
        let p2 = engine.predict("newcomer", 2).unwrap();
        let p3 = engine.predict("newcomer", 3).unwrap();
        assert!((p2 - (1.5 - deviation)).abs() < 1e-12);
        assert!((p3 - (4.5 - deviation)).abs() < 1e-12);
    }

    #[test]
    fn test_missing_weights_fall_back_to_mean() {
        let mut store = seed_store();
        store.append("newcomer", &[1], &[5]).unwrap();
        let empty = SimilarityMatrix::new();
        let engine = PredictionEngine::new(&store, &empty);

        assert_eq!(engine.predict("newcomer", 2).unwrap(), 1.5);
        assert_eq!(engine.predict("newcomer", 3).unwrap(), 4.5);
    }

    #[test]
    fn test_abs_weight_normalization() {
        let store = RatingStore::from_ratings(
            Catalog::new(3),
            vec![
                Rating::new("a", 1, 4),
                Rating::new("a", 2, 2),
                Rating::new("a", 3, 3),
                Rating::new("b", 1, 2),
                Rating::new("b", 2, 4),
                Rating::new("b", 3, 3),
            ],
        )
        .unwrap();
        let mut matrix = SimilarityMatrix::new();
        matrix.insert(3, 1, 0.5);
        matrix.insert(3, 2, -0.25);
        let engine = PredictionEngine::new(&store, &matrix);

        // mean[3] = 3; a deviates +1 on item 1 and -1 on item 2
        // (1 * 0.5 + -1 * -0.25) / (0.5 + 0.25) = 1
        let predicted = engine.predict("a", 3).unwrap();
        assert!((predicted - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_item_is_an_integrity_error() {
        let store = seed_store();
        let matrix = SimilarityMatrix::new();
        let engine = PredictionEngine::new(&store, &matrix);
        assert!(engine.predict("u1", 7).is_err());
    }
}
