//! Sessions and per-user elicitation sampling.
//!
//! Each user that logs in gets a shuffled copy of the catalog and a cursor
//! into it. Items are handed out in that order, so every catalog item is
//! offered exactly once per cycle. When the cursor reaches the end the order
//! is reshuffled and the generation counter moves on.

use data_loader::{Catalog, ItemId, UserId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::debug;

/// The identity an operation is performed for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    user_id: UserId,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// One user's pass through the catalog
#[derive(Debug, Clone)]
struct SamplingPool {
    order: Vec<ItemId>,
    cursor: usize,
    generation: u64,
}

impl SamplingPool {
    fn fresh(catalog: Catalog, rng: &mut StdRng) -> Self {
        let mut order = catalog.to_vec();
        order.shuffle(rng);
        Self {
            order,
            cursor: 0,
            generation: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    fn next(&mut self, rng: &mut StdRng) -> Option<ItemId> {
        if self.remaining() == 0 {
            self.order.shuffle(rng);
            self.cursor = 0;
            self.generation += 1;
        }
        let item = self.order.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(item)
    }
}

/// Tracks which items each user has not been offered yet in this cycle
#[derive(Debug)]
pub struct SessionSampler {
    catalog: Catalog,
    pools: HashMap<UserId, SamplingPool>,
    rng: StdRng,
}

impl SessionSampler {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            pools: HashMap::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sampling, for tests and reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn catalog(&self) -> Catalog {
        self.catalog
    }

    /// Create the user's pool on first login; later logins leave it alone
    pub fn login(&mut self, username: &str) -> Session {
        if !self.pools.contains_key(username) {
            debug!(username, "Creating sampling pool");
            let pool = SamplingPool::fresh(self.catalog, &mut self.rng);
            self.pools.insert(username.to_string(), pool);
        }
        Session::new(username)
    }

    /// Next item to offer
    ///
    /// Without a session a uniformly random catalog item is returned and no
    /// pool changes.
    pub fn next_item(&mut self, session: Option<&Session>) -> Option<ItemId> {
        let Some(session) = session else {
            if self.catalog.is_empty() {
                return None;
            }
            let idx = self.rng.random_range(0..self.catalog.len());
            return self.catalog.items().nth(idx);
        };

        let catalog = self.catalog;
        let rng = &mut self.rng;
        self.pools
            .entry(session.user_id().to_string())
            .or_insert_with(|| SamplingPool::fresh(catalog, rng))
            .next(&mut self.rng)
    }

    /// Items left before the user's pool refills
    pub fn remaining(&self, session: &Session) -> Option<usize> {
        self.pools.get(session.user_id()).map(SamplingPool::remaining)
    }

    /// How many times the user's pool has been refilled
    pub fn generation(&self, session: &Session) -> Option<u64> {
        self.pools.get(session.user_id()).map(|pool| pool.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sampler(size: u32) -> SessionSampler {
        SessionSampler::new(Catalog::new(size)).with_seed(42)
    }

    #[test]
    fn test_every_item_once_per_cycle() {
        let mut sampler = sampler(60);
        let session = sampler.login("alice");

        let offered: HashSet<ItemId> = (0..60)
            .map(|_| sampler.next_item(Some(&session)).unwrap())
            .collect();

        assert_eq!(offered.len(), 60);
        assert_eq!(offered, Catalog::new(60).items().collect::<HashSet<_>>());
        assert_eq!(sampler.remaining(&session), Some(0));
        assert_eq!(sampler.generation(&session), Some(0));
    }

    #[test]
    fn test_pool_refills_after_exhaustion() {
        let mut sampler = sampler(5);
        let session = sampler.login("alice");
        for _ in 0..5 {
            sampler.next_item(Some(&session)).unwrap();
        }

        let second_cycle: HashSet<ItemId> = (0..5)
            .map(|_| sampler.next_item(Some(&session)).unwrap())
            .collect();

        assert_eq!(second_cycle.len(), 5);
        assert_eq!(sampler.generation(&session), Some(1));
    }

    #[test]
    fn test_login_is_idempotent() {
        let mut sampler = sampler(10);
        let session = sampler.login("alice");
        sampler.next_item(Some(&session)).unwrap();
        sampler.next_item(Some(&session)).unwrap();

        let again = sampler.login("alice");
        assert_eq!(again, session);
        assert_eq!(sampler.remaining(&again), Some(8));
    }

    #[test]
    fn test_pools_are_per_user() {
        let mut sampler = sampler(4);
        let alice = sampler.login("alice");
        let bob = sampler.login("bob");

        for _ in 0..3 {
            sampler.next_item(Some(&alice)).unwrap();
        }
        assert_eq!(sampler.remaining(&alice), Some(1));
        assert_eq!(sampler.remaining(&bob), Some(4));
    }

    #[test]
    fn test_anonymous_sampling_leaves_pools_alone() {
        let mut sampler = sampler(6);
        let alice = sampler.login("alice");

        for _ in 0..20 {
            let item = sampler.next_item(None).unwrap();
            assert!((1..=6).contains(&item));
        }
        assert_eq!(sampler.remaining(&alice), Some(6));
    }

    #[test]
    fn test_unknown_session_gets_a_pool() {
        let mut sampler = sampler(3);
        let session = Session::new("carol");
        assert!(sampler.next_item(Some(&session)).is_some());
        assert_eq!(sampler.remaining(&session), Some(2));
    }

    #[test]
    fn test_empty_catalog() {
        let mut sampler = sampler(0);
        let session = sampler.login("alice");
        assert_eq!(sampler.next_item(None), None);
        assert_eq!(sampler.next_item(Some(&session)), None);
    }
}
