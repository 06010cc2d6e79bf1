//! The append-only rating log and its derived indices.
//!
//! `RatingStore` owns:
//! - the raw rating log, in insertion order
//! - a per-user index into that log
//! - the current `MeanCentering`, rebuilt in full after every append

use crate::centering::MeanCentering;
use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct RatingStore {
    catalog: Catalog,
    ratings: Vec<Rating>,
    /// Positions in `ratings` for each user, in insertion order
    user_index: HashMap<UserId, Vec<usize>>,
    centering: MeanCentering,
}

impl RatingStore {
    /// Creates an empty store over `catalog`
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            ratings: Vec::new(),
            user_index: HashMap::new(),
            centering: MeanCentering::default(),
        }
    }

    /// Builds a store from seed ratings, validating every row
    pub fn from_ratings(catalog: Catalog, ratings: Vec<Rating>) -> Result<Self> {
        let mut store = Self::new(catalog);
        for rating in &ratings {
            store.validate(rating)?;
        }
        for rating in ratings {
            store.push(rating);
        }
        store.recompute();
        Ok(store)
    }

    /// Load the seed ratings file and build the store
    pub fn load_from_file(path: &Path, catalog: Catalog) -> Result<Self> {
        info!("Loading ratings from {:?}", path);
        let ratings = parser::parse_ratings(path)?;
        let store = Self::from_ratings(catalog, ratings)?;

        let (users, items, ratings) = store.counts();
        info!(
            "Loaded {} ratings from {} users over {} items",
            ratings, users, items
        );
        Ok(store)
    }

    pub fn catalog(&self) -> Catalog {
        self.catalog
    }

    /// The raw log, oldest first
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    pub fn centering(&self) -> &MeanCentering {
        &self.centering
    }

    pub fn item_mean(&self, item_id: ItemId) -> Result<f64> {
        self.centering.item_mean(item_id)
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.user_index.contains_key(user_id)
    }

    /// All ratings made by a user, oldest first
    pub fn user_ratings<'a>(&'a self, user_id: &str) -> impl Iterator<Item = &'a Rating> + 'a {
        self.user_index
            .get(user_id)
            .into_iter()
            .flatten()
            .map(move |&pos| &self.ratings[pos])
    }

    /// The user's distinct rated items, each with its first recorded rating
    pub fn user_rated_items(&self, user_id: &str) -> BTreeMap<ItemId, RatingValue> {
        let mut items = BTreeMap::new();
        for rating in self.user_ratings(user_id) {
            items.entry(rating.item_id).or_insert(rating.rating);
        }
        items
    }

    /// Append one rating per `(item, rating)` pair for `user_id`
    ///
    /// The whole batch is validated first, so a bad batch leaves the store
    /// untouched. On success the mean-centering is recomputed in full.
    /// The similarity matrix is not this store's concern and stays as it was.
    #[instrument(skip(self, items, ratings), fields(batch = items.len()))]
    pub fn append(
        &mut self,
        user_id: &str,
        items: &[ItemId],
        ratings: &[RatingValue],
    ) -> Result<()> {
        if items.len() != ratings.len() {
            return Err(DataLoadError::LengthMismatch {
                items: items.len(),
                ratings: ratings.len(),
            });
        }

        let batch: Vec<Rating> = items
            .iter()
            .zip(ratings)
            .map(|(&item_id, &rating)| Rating::new(user_id, item_id, rating))
            .collect();
        for rating in &batch {
            self.validate(rating)?;
        }

        for rating in batch {
            self.push(rating);
        }
        self.recompute();
        debug!("Store now holds {} ratings", self.ratings.len());
        Ok(())
    }

    /// (distinct users, distinct rated items, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.user_index.len(),
            self.centering.all_item_stats().len(),
            self.ratings.len(),
        )
    }

    /// Check that a rating references a catalog item and has a valid value
    pub fn validate(&self, rating: &Rating) -> Result<()> {
        if !self.catalog.contains(rating.item_id) {
            return Err(DataLoadError::MissingReference {
                entity: "Item".to_string(),
                id: rating.item_id,
            });
        }
        if !RATING_RANGE.contains(&rating.rating) {
            return Err(DataLoadError::InvalidValue {
                field: "rating".to_string(),
                value: rating.rating.to_string(),
            });
        }
        Ok(())
    }

    fn push(&mut self, rating: Rating) {
        let pos = self.ratings.len();
        self.user_index
            .entry(rating.user_id.clone())
            .or_default()
            .push(pos);
        self.ratings.push(rating);
    }

    fn recompute(&mut self) {
        self.centering = MeanCentering::compute(&self.ratings);
    }
}

impl Default for RatingStore {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}
