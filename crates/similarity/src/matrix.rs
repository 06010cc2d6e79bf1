//! Item-item similarity matrix
//!
//! Builds the weight table used by item-based collaborative filtering:
//! "users who rated this item above its mean also rated that one above its mean"
//!
//! ## Algorithm
//! For every item `i`:
//! 1. Find the users who rated `i`
//! 2. For each of them, pair `i` with every other item `j` they rated
//! 3. Accumulate, per `j`, the dot product and squared norms of the two
//!    mean-adjusted rating columns over the co-rating users
//! 4. Emit `weight(i, j) = dot / (|i| * |j|)`, the cosine similarity
//!
//! Pairs without a single co-rating user get no entry at all, which means
//! "no evidence" rather than "zero similarity".

use data_loader::{AdjustedRating, EPSILON, ItemId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// One weight of the matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEntry {
    pub item_1: ItemId,
    pub item_2: ItemId,
    pub weight: f64,
}

/// Sparse item x item weight table, keyed `item_1 -> item_2 -> weight`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    weights: BTreeMap<ItemId, BTreeMap<ItemId, f64>>,
}

impl SimilarityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item_1: ItemId, item_2: ItemId, weight: f64) {
        self.weights.entry(item_1).or_default().insert(item_2, weight);
    }

    /// Weight between two items, `None` when they were never co-rated
    pub fn weight(&self, item_1: ItemId, item_2: ItemId) -> Option<f64> {
        self.weights.get(&item_1)?.get(&item_2).copied()
    }

    /// Every entry, ordered by `(item_1, item_2)`
    pub fn entries(&self) -> impl Iterator<Item = SimilarityEntry> + '_ {
        self.weights.iter().flat_map(|(&item_1, row)| {
            row.iter().map(move |(&item_2, &weight)| SimilarityEntry {
                item_1,
                item_2,
                weight,
            })
        })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.weights.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.values().all(|row| row.is_empty())
    }
}

impl FromIterator<SimilarityEntry> for SimilarityMatrix {
    fn from_iter<T: IntoIterator<Item = SimilarityEntry>>(iter: T) -> Self {
        let mut matrix = SimilarityMatrix::new();
        for entry in iter {
            matrix.insert(entry.item_1, entry.item_2, entry.weight);
        }
        matrix
    }
}

/// Running sums for one `(item_1, item_2)` pair
#[derive(Debug, Default, Clone, Copy)]
struct PairAccumulator {
    numerator: f64,
    sum_sq_1: f64,
    sum_sq_2: f64,
}

impl PairAccumulator {
    fn add(&mut self, adjusted_1: f64, adjusted_2: f64) {
        self.numerator += adjusted_1 * adjusted_2;
        self.sum_sq_1 += adjusted_1 * adjusted_1;
        self.sum_sq_2 += adjusted_2 * adjusted_2;
    }

    fn weight(&self) -> f64 {
        let denominator = self.sum_sq_1.sqrt() * self.sum_sq_2.sqrt();
        let denominator = if denominator == 0.0 { EPSILON } else { denominator };
        self.numerator / denominator
    }
}

/// Builds a [`SimilarityMatrix`] from mean-adjusted ratings
#[derive(Debug, Clone, Default)]
pub struct SimilarityMatrixBuilder;

impl SimilarityMatrixBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Compute the full matrix
    ///
    /// Both `weight(i, j)` and `weight(j, i)` are computed, each from its own
    /// pass over the co-rating users.
    #[instrument(skip_all, fields(ratings = adjusted.len()))]
    pub fn build(&self, adjusted: &[AdjustedRating]) -> SimilarityMatrix {
        let user_items = index_by_user(adjusted);

        // Users who rated each item
        let mut item_users: BTreeMap<ItemId, Vec<&str>> = BTreeMap::new();
        for (&user_id, items) in &user_items {
            for &item_id in items.keys() {
                item_users.entry(item_id).or_default().push(user_id);
            }
        }
        debug!(
            "Building similarities for {} items from {} users",
            item_users.len(),
            user_items.len()
        );

        let rows: Vec<(ItemId, BTreeMap<ItemId, f64>)> = item_users
            .par_iter()
            .map(|(&item_1, users)| {
                let mut pairs: BTreeMap<ItemId, PairAccumulator> = BTreeMap::new();
                for user_id in users {
                    let Some(items) = user_items.get(user_id) else {
                        continue;
                    };
                    let Some(&adjusted_1) = items.get(&item_1) else {
                        continue;
                    };
                    for (&item_2, &adjusted_2) in items {
                        if item_2 != item_1 {
                            pairs.entry(item_2).or_default().add(adjusted_1, adjusted_2);
                        }
                    }
                }

                let row = pairs
                    .into_iter()
                    .map(|(item_2, acc)| (item_2, acc.weight()))
                    .collect();
                (item_1, row)
            })
            .collect();

        let matrix = SimilarityMatrix {
            weights: rows.into_iter().filter(|(_, row)| !row.is_empty()).collect(),
        };
        info!("Built similarity matrix with {} entries", matrix.len());
        matrix
    }
}

/// `user -> item -> adjusted rating`, keeping the first row per (user, item)
fn index_by_user(adjusted: &[AdjustedRating]) -> BTreeMap<&str, BTreeMap<ItemId, f64>> {
    let mut user_items: BTreeMap<&str, BTreeMap<ItemId, f64>> = BTreeMap::new();
    for rating in adjusted {
        user_items
            .entry(rating.user_id.as_str())
            .or_default()
            .entry(rating.item_id)
            .or_insert(rating.rating_adjusted);
    }
    user_items
}
