use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use titanic_pipeline::training::{ForestParams, GridSearch, ParamGrid, RandomForest};

fn create_passenger_like_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);

    // Label from the first two features plus noise
    let y = Array1::from_shape_fn(n_rows, |i| {
        let score = x[[i, 0]] + 0.5 * x[[i, 1]] + rng.gen::<f64>() * 3.0;
        if score > 9.0 { 1.0 } else { 0.0 }
    });

    (x, y)
}

fn bench_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [700, 2000, 5000].iter() {
        let (x, y) = create_passenger_like_data(*n_rows, 16);

        group.bench_with_input(
            BenchmarkId::new("fit", n_rows),
            &(x, y),
            |b, (x, y)| {
                b.iter(|| {
                    let mut forest = RandomForest::new(100).with_max_depth(4).with_random_state(0);
                    forest.fit(black_box(x), black_box(y)).unwrap();
                })
            },
        );
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    let (x, y) = create_passenger_like_data(700, 16);
    group.bench_function("default_grid", |b| {
        b.iter(|| {
            let base = ForestParams { random_state: Some(0), ..Default::default() };
            let mut search = GridSearch::new(base, ParamGrid::default());
            search.fit(black_box(&x), black_box(&y)).unwrap();
        })
    });

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (x_train, y_train) = create_passenger_like_data(2000, 16);
    let mut forest = RandomForest::new(100).with_max_depth(4).with_random_state(0);
    forest.fit(&x_train, &y_train).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let (x_test, _) = create_passenger_like_data(*n_rows, 16);

        group.bench_with_input(
            BenchmarkId::new("predict", n_rows),
            &x_test,
            |b, x| {
                b.iter(|| forest.predict(black_box(x)).unwrap())
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_forest_fit, bench_grid_search, bench_prediction);
criterion_main!(benches);
