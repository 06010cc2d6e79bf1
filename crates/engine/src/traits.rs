//! The capability every recommender backend exposes to front ends.

use crate::session::Session;
use anyhow::Result;
use data_loader::{ItemId, RatingValue};

/// Core trait for recommender backends.
///
/// Front ends only talk to this trait, so the item-based and the
/// factorization engines are interchangeable behind a `Box<dyn Recommender>`.
pub trait Recommender: Send {
    /// Returns the name of this backend (for logging/debugging)
    fn name(&self) -> &str;

    /// Start (or resume) a session for `username`.
    ///
    /// Idempotent: logging in again keeps the user's elicitation progress.
    fn login(&mut self, username: &str) -> Session;

    /// Up to `top_n` item ids, best first
    fn recommend(&self, session: &Session, top_n: usize) -> Result<Vec<ItemId>>;

    /// Record one rating per `(item, rating)` pair for the session's user
    fn submit_ratings(
        &mut self,
        session: &Session,
        items: &[ItemId],
        ratings: &[RatingValue],
    ) -> Result<()>;

    /// Next item to ask the user about.
    ///
    /// Without a session any catalog item may come back. `None` only for an
    /// empty catalog.
    fn next_item_to_rate(&mut self, session: Option<&Session>) -> Option<ItemId>;
}
