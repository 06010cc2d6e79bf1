//! Mean-centering of raw ratings.
//!
//! For every item the arithmetic mean of all its ratings is computed, and
//! every raw rating is re-expressed as a deviation from that mean. The result
//! is a pure function of the rating log: callers rebuild it from scratch after
//! each change, which is O(number of ratings).

use crate::error::{DataLoadError, Result};
use crate::types::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Item means and mean-adjusted ratings derived from a rating log
#[derive(Debug, Clone, Default)]
pub struct MeanCentering {
    item_stats: BTreeMap<ItemId, ItemStats>,
    adjusted: Vec<AdjustedRating>,
}

impl MeanCentering {
    /// Compute item means and adjusted ratings for `ratings`
    pub fn compute(ratings: &[Rating]) -> Self {
        let mut sums: HashMap<ItemId, (u64, u32)> = HashMap::new();
        for rating in ratings {
            let entry = sums.entry(rating.item_id).or_insert((0, 0));
            entry.0 += rating.rating as u64;
            entry.1 += 1;
        }

        let item_stats: BTreeMap<ItemId, ItemStats> = sums
            .into_iter()
            .map(|(item_id, (sum, count))| {
                (
                    item_id,
                    ItemStats {
                        mean_rating: sum as f64 / count as f64,
                        rating_count: count,
                    },
                )
            })
            .collect();

        let adjusted = ratings
            .par_iter()
            .map(|rating| {
                // Every item in `ratings` has an entry by construction
                let mean = item_stats
                    .get(&rating.item_id)
                    .map(|s| s.mean_rating)
                    .unwrap_or_default();
                AdjustedRating {
                    user_id: rating.user_id.clone(),
                    item_id: rating.item_id,
                    rating: rating.rating,
                    rating_adjusted: adjust(rating.rating, mean),
                }
            })
            .collect();

        Self {
            item_stats,
            adjusted,
        }
    }

    /// Mean rating of an item, failing for items nobody has rated
    pub fn item_mean(&self, item_id: ItemId) -> Result<f64> {
        self.item_stats
            .get(&item_id)
            .map(|s| s.mean_rating)
            .ok_or_else(|| DataLoadError::MissingReference {
                entity: "ItemMeanRating".to_string(),
                id: item_id,
            })
    }

    pub fn item_stats(&self, item_id: ItemId) -> Option<&ItemStats> {
        self.item_stats.get(&item_id)
    }

    /// All item statistics in item id order
    pub fn all_item_stats(&self) -> &BTreeMap<ItemId, ItemStats> {
        &self.item_stats
    }

    /// Adjusted ratings, in the same order as the rating log
    pub fn adjusted_ratings(&self) -> &[AdjustedRating] {
        &self.adjusted
    }
}

/// Deviation from the mean, with exact zero replaced by [`EPSILON`]
fn adjust(rating: RatingValue, mean: f64) -> f64 {
    let adjusted = rating as f64 - mean;
    if adjusted == 0.0 { EPSILON } else { adjusted }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Vec<Rating> {
        vec![
            Rating::new("u1", 1, 5),
            Rating::new("u1", 2, 1),
            Rating::new("u2", 1, 4),
            Rating::new("u2", 3, 5),
            Rating::new("u3", 2, 2),
            Rating::new("u3", 3, 4),
        ]
    }

    #[test]
    fn test_item_means() {
        let centering = MeanCentering::compute(&seed());

        assert_eq!(centering.item_mean(1).unwrap(), 4.5);
        assert_eq!(centering.item_mean(2).unwrap(), 1.5);
        assert_eq!(centering.item_mean(3).unwrap(), 4.5);
        assert_eq!(centering.item_stats(1).unwrap().rating_count, 2);
    }

    #[test]
    fn test_adjusted_ratings_follow_log_order() {
        let centering = MeanCentering::compute(&seed());
        let adjusted = centering.adjusted_ratings();

        assert_eq!(adjusted.len(), 6);
        assert_eq!(adjusted[0].user_id, "u1");
        assert_eq!(adjusted[0].rating_adjusted, 0.5);
        assert_eq!(adjusted[1].rating_adjusted, -0.5);
    }

    #[test]
    fn test_zero_adjustment_replaced_by_epsilon() {
        let ratings = vec![
            Rating::new("a", 1, 3),
            Rating::new("b", 1, 3),
            Rating::new("c", 2, 1),
            Rating::new("d", 2, 5),
            Rating::new("e", 2, 3),
        ];
        let centering = MeanCentering::compute(&ratings);

        for adjusted in centering.adjusted_ratings() {
            assert_ne!(adjusted.rating_adjusted, 0.0);
        }
        assert_eq!(centering.adjusted_ratings()[0].rating_adjusted, EPSILON);
        assert_eq!(centering.adjusted_ratings()[4].rating_adjusted, EPSILON);
    }

    #[test]
    fn test_missing_mean_is_an_error() {
        let centering = MeanCentering::compute(&seed());
        let err = centering.item_mean(42).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingReference { id: 42, .. }));
    }

    #[test]
    fn test_empty_log() {
        let centering = MeanCentering::compute(&[]);
        assert!(centering.adjusted_ratings().is_empty());
        assert!(centering.all_item_stats().is_empty());
    }
}
