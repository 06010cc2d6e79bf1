//! Core domain types for the rating data.
//!
//! Everything the recommender learns comes from star ratings, so the model
//! here is small:
//! - Type aliases for domain clarity (UserId, ItemId, RatingValue)
//! - The raw `Rating` observation and its mean-centered twin `AdjustedRating`
//! - The fixed `Catalog` of item ids
//! - `ItemStats` precomputed per item

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

// =============================================================================
// Type Aliases
// =============================================================================

/// Username of a rater. Seed users and interactive users share one namespace.
pub type UserId = String;

/// Catalog item identifier (1..=N)
pub type ItemId = u32;

/// Star rating, 1 to 5
pub type RatingValue = u8;

/// Valid star values
pub const RATING_RANGE: RangeInclusive<RatingValue> = 1..=5;

/// Substitute for an exact zero in adjusted ratings and similarity denominators
pub const EPSILON: f64 = 1e-8;

/// Number of items in the clothing catalog
pub const DEFAULT_CATALOG_SIZE: u32 = 60;

// =============================================================================
// Rating Types
// =============================================================================

/// A single rating from a user for an item
///
/// The log is append-only: re-rating an item adds another row instead of
/// replacing the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: RatingValue,
}

impl Rating {
    pub fn new(user_id: impl Into<UserId>, item_id: ItemId, rating: RatingValue) -> Self {
        Self {
            user_id: user_id.into(),
            item_id,
            rating,
        }
    }
}

/// A rating with the item's mean subtracted
///
/// `rating_adjusted` is never exactly 0.0: zeros are replaced by [`EPSILON`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedRating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: RatingValue,
    pub rating_adjusted: f64,
}

/// Precomputed statistics for an item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub mean_rating: f64,
    pub rating_count: u32,
}

// =============================================================================
// Catalog
// =============================================================================

/// The fixed, ordered set of item ids `1..=size`
///
/// Immutable once built; every rating must reference an item in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    size: u32,
}

impl Catalog {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn len(&self) -> usize {
        self.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        (1..=self.size).contains(&item_id)
    }

    /// Item ids in catalog order
    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        1..=self.size
    }

    pub fn to_vec(&self) -> Vec<ItemId> {
        self.items().collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_SIZE)
    }
}
