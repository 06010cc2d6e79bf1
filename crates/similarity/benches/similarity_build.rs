//! Benchmarks for the similarity build and prediction
//!
//! Run with: cargo bench --package similarity
//!
//! Uses a synthetic 60-item catalog rated by a few hundred users.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use data_loader::{Catalog, Rating, RatingStore};
use similarity::{PredictionEngine, SimilarityMatrixBuilder};

fn synthetic_store() -> RatingStore {
    let catalog = Catalog::new(60);
    let mut ratings = Vec::new();
    for user in 0..300u32 {
        for item in catalog.items() {
            // Each user rates roughly a third of the catalog
            if (user + item) % 3 == 0 {
                let value = ((user * 7 + item * 13) % 5 + 1) as u8;
                ratings.push(Rating::new(format!("user{}", user), item, value));
            }
        }
    }
    RatingStore::from_ratings(catalog, ratings).expect("synthetic ratings are valid")
}

fn bench_build_matrix(c: &mut Criterion) {
    let store = synthetic_store();
    let builder = SimilarityMatrixBuilder::new();

    c.bench_function("similarity_build", |b| {
        b.iter(|| {
            let matrix = builder.build(black_box(store.centering().adjusted_ratings()));
            black_box(matrix)
        })
    });
}

fn bench_predict_catalog(c: &mut Criterion) {
    let store = synthetic_store();
    let matrix = SimilarityMatrixBuilder::new().build(store.centering().adjusted_ratings());
    let engine = PredictionEngine::new(&store, &matrix);

    c.bench_function("predict_full_catalog", |b| {
        b.iter(|| {
            for item in store.catalog().items() {
                black_box(engine.predict(black_box("user1"), item).ok());
            }
        })
    });
}

criterion_group!(benches, bench_build_matrix, bench_predict_catalog);
criterion_main!(benches);
