use data_loader::{Catalog, MeanCentering, RatingStore};
use std::path::Path;
use std::time::Instant;

fn main() {
    let path = Path::new("data/ratings.csv");

    println!("Loading seed ratings...\n");

    let start = Instant::now();
    let store = RatingStore::load_from_file(path, Catalog::default())
        .expect("Failed to load ratings");
    let elapsed = start.elapsed();

    let (users, items, ratings) = store.counts();

    let start = Instant::now();
    let centering = MeanCentering::compute(store.ratings());
    let centering_elapsed = start.elapsed();

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", users);
    println!("Items: {}", items);
    println!("Ratings: {}", ratings);
    println!(
        "Mean-centering {} ratings took {:?}",
        centering.adjusted_ratings().len(),
        centering_elapsed
    );
}
