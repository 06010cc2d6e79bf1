//! Matrix-factorization backend.
//!
//! Biased factorization trained with stochastic gradient descent:
//!
//! ```text
//! r̂(u, i) = μ + b_u + b_i + p_u · q_i
//! ```
//!
//! clipped to the rating bounds. New ratings re-fit only the submitting
//! user's bias and factors; item parameters stay frozen after the initial fit.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use data_loader::{ItemId, RatingStore, RatingValue, UserId};

use crate::ranker::{ScoredItem, rank_and_select};
use crate::session::{Session, SessionSampler};
use crate::traits::Recommender;

/// Training parameters for [`FactorizationRecommender`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorizationConfig {
    /// Latent dimension
    pub n_factors: usize,
    pub n_epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    /// Factors start uniformly in `[-init_spread, init_spread)`
    pub init_spread: f64,
    pub min_rating: f64,
    pub max_rating: f64,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            n_factors: 50,
            n_epochs: 100,
            learning_rate: 0.01,
            regularization: 0.1,
            init_spread: 0.1,
            min_rating: 1.0,
            max_rating: 5.0,
        }
    }
}

impl FactorizationConfig {
    pub fn with_factors(mut self, n_factors: usize) -> Self {
        self.n_factors = n_factors;
        self
    }

    pub fn with_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_factors == 0 {
            bail!("n_factors must be at least 1");
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        if self.regularization < 0.0 {
            bail!("regularization must not be negative, got {}", self.regularization);
        }
        if self.min_rating.is_nan()
            || self.max_rating.is_nan()
            || self.min_rating >= self.max_rating
        {
            bail!(
                "min_rating ({}) must be below max_rating ({})",
                self.min_rating,
                self.max_rating
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct LatentParams {
    bias: f64,
    factors: Vec<f64>,
}

impl LatentParams {
    fn random(n_factors: usize, spread: f64, rng: &mut StdRng) -> Self {
        let factors = (0..n_factors)
            .map(|_| {
                if spread > 0.0 {
                    rng.random_range(-spread..spread)
                } else {
                    0.0
                }
            })
            .collect();
        Self { bias: 0.0, factors }
    }
}

pub struct FactorizationRecommender {
    store: RatingStore,
    config: FactorizationConfig,
    global_mean: f64,
    users: HashMap<UserId, LatentParams>,
    /// Indexed by `item_id - 1`
    items: Vec<LatentParams>,
    /// Items each user rated through `submit_ratings`; seed rows are not here
    submitted: HashMap<UserId, BTreeSet<ItemId>>,
    sampler: SessionSampler,
    rng: StdRng,
}

impl FactorizationRecommender {
    /// Fit on every rating in the store
    #[instrument(skip(store, config))]
    pub fn new(store: RatingStore, config: FactorizationConfig, seed: Option<u64>) -> Result<Self> {
        config.validate().context("Invalid factorization config")?;

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut sampler = SessionSampler::new(store.catalog());
        if let Some(seed) = seed {
            sampler = sampler.with_seed(seed);
        }

        let ratings = store.ratings();
        let global_mean = if ratings.is_empty() {
            (config.min_rating + config.max_rating) / 2.0
        } else {
            ratings.iter().map(|r| r.rating as f64).sum::<f64>() / ratings.len() as f64
        };

        let items = store
            .catalog()
            .items()
            .map(|_| LatentParams::random(config.n_factors, config.init_spread, &mut rng))
            .collect();

        let mut recommender = Self {
            store,
            config,
            global_mean,
            users: HashMap::new(),
            items,
            submitted: HashMap::new(),
            sampler,
            rng,
        };
        recommender.fit();
        Ok(recommender)
    }

    /// Clipped estimate; unknown users fall back to `μ + b_i`
    pub fn predict(&self, user_id: &str, item_id: ItemId) -> f64 {
        let raw = match self.item_params(item_id) {
            Some(item) => {
                let user = self.users.get(user_id);
                self.raw_estimate(user, item)
            }
            None => self.global_mean,
        };
        raw.clamp(self.config.min_rating, self.config.max_rating)
    }

    /// Items the user has not rated in this process, best first
    pub fn recommend_scored(&self, session: &Session, top_n: usize) -> Vec<ScoredItem> {
        let known = self.submitted.get(session.user_id());
        let scored = self
            .store
            .catalog()
            .items()
            .filter(|item_id| known.is_none_or(|rated| !rated.contains(item_id)))
            .map(|item_id| ScoredItem {
                item_id,
                score: self.predict(session.user_id(), item_id),
                known: false,
            })
            .collect();
        rank_and_select(scored, top_n)
    }

    fn item_params(&self, item_id: ItemId) -> Option<&LatentParams> {
        let idx = (item_id as usize).checked_sub(1)?;
        self.items.get(idx)
    }

    fn raw_estimate(&self, user: Option<&LatentParams>, item: &LatentParams) -> f64 {
        let mut estimate = self.global_mean + item.bias;
        if let Some(user) = user {
            estimate += user.bias + dot(&user.factors, &item.factors);
        }
        estimate
    }

    /// Joint SGD over users and items
    fn fit(&mut self) {
        let start = Instant::now();
        let samples: Vec<(UserId, usize, f64)> = self
            .store
            .ratings()
            .iter()
            .map(|r| (r.user_id.clone(), (r.item_id - 1) as usize, r.rating as f64))
            .collect();

        for (user_id, _, _) in &samples {
            if !self.users.contains_key(user_id) {
                let params = LatentParams::random(
                    self.config.n_factors,
                    self.config.init_spread,
                    &mut self.rng,
                );
                self.users.insert(user_id.clone(), params);
            }
        }

        let lr = self.config.learning_rate;
        let reg = self.config.regularization;
        let mut order: Vec<usize> = (0..samples.len()).collect();

        for epoch in 0..self.config.n_epochs {
            order.shuffle(&mut self.rng);
            let mut squared_error = 0.0;

            for &idx in &order {
                let (user_id, item_idx, rating) = &samples[idx];
                let (Some(user), Some(item)) =
                    (self.users.get_mut(user_id), self.items.get_mut(*item_idx))
                else {
                    continue;
                };

                let estimate =
                    self.global_mean + user.bias + item.bias + dot(&user.factors, &item.factors);
                let err = rating - estimate;
                squared_error += err * err;

                user.bias += lr * (err - reg * user.bias);
                item.bias += lr * (err - reg * item.bias);
                for (p, q) in user.factors.iter_mut().zip(item.factors.iter_mut()) {
                    let (p_old, q_old) = (*p, *q);
                    *p += lr * (err * q_old - reg * p_old);
                    *q += lr * (err * p_old - reg * q_old);
                }
            }

            if epoch % 20 == 0 && !samples.is_empty() {
                debug!(
                    "Epoch {}: RMSE = {:.4}",
                    epoch,
                    (squared_error / samples.len() as f64).sqrt()
                );
            }
        }

        info!(
            "Fitted {} users x {} items in {:.2?}",
            self.users.len(),
            self.items.len(),
            start.elapsed()
        );
    }

    /// Re-learn one user's parameters against the frozen item parameters
    fn refit_user(&mut self, user_id: &str) {
        let samples: Vec<(usize, f64)> = self
            .store
            .user_ratings(user_id)
            .map(|r| ((r.item_id - 1) as usize, r.rating as f64))
            .collect();

        let mut user = LatentParams::random(
            self.config.n_factors,
            self.config.init_spread,
            &mut self.rng,
        );
        let lr = self.config.learning_rate;
        let reg = self.config.regularization;
        let mut order: Vec<usize> = (0..samples.len()).collect();

        for _ in 0..self.config.n_epochs {
            order.shuffle(&mut self.rng);
            for &idx in &order {
                let (item_idx, rating) = samples[idx];
                let Some(item) = self.items.get(item_idx) else {
                    continue;
                };

                let estimate =
                    self.global_mean + user.bias + item.bias + dot(&user.factors, &item.factors);
                let err = rating - estimate;

                user.bias += lr * (err - reg * user.bias);
                for (p, q) in user.factors.iter_mut().zip(&item.factors) {
                    *p += lr * (err * q - reg * *p);
                }
            }
        }

        debug!(user_id, "Refitted user on {} ratings", samples.len());
        self.users.insert(user_id.to_string(), user);
    }
}

impl Recommender for FactorizationRecommender {
    fn name(&self) -> &str {
        "factorization"
    }

    fn login(&mut self, username: &str) -> Session {
        info!(username, "Login");
        self.sampler.login(username)
    }

    #[instrument(skip(self, session), fields(user = session.user_id()))]
    fn recommend(&self, session: &Session, top_n: usize) -> Result<Vec<ItemId>> {
        Ok(self
            .recommend_scored(session, top_n)
            .into_iter()
            .map(|s| s.item_id)
            .collect())
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
        self.submitted
            .entry(session.user_id().to_string())
            .or_default()
            .extend(items.iter().copied());
        self.refit_user(session.user_id());
        info!("Recorded {} ratings for {}", items.len(), session.user_id());
        Ok(())
    }

    fn next_item_to_rate(&mut self, session: Option<&Session>) -> Option<ItemId> {
        self.sampler.next_item(session)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
