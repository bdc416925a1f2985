use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use credit_default::synthetic::{KMeansSMOTE, KMeansSmoteConfig, Sampler};
use credit_default::training::{XGBoostClassifier, XGBoostConfig};
use ndarray::{Array1, Array2};
use rand::prelude::*;

fn create_classification_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<i64>) {
    let mut rng = rand::thread_rng();

    // Every fifth row is positive and shifted away from the rest
    let y: Array1<i64> = (0..n_rows).map(|i| if i % 5 == 0 { 1 } else { 0 }).collect();
    let x = Array2::from_shape_fn((n_rows, n_features), |(i, _)| {
        let shift = if y[i] == 1 { 3.0 } else { 0.0 };
        shift + rng.gen::<f64>() * 2.0
    });

    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [1000, 5000, 10000].iter() {
        let data = create_classification_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &data, |b, (x, y)| {
            b.iter(|| {
                let mut model = XGBoostClassifier::new(XGBoostConfig::credit_default());
                model.fit(black_box(x), black_box(y), None).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (x_train, y_train) = create_classification_data(5000, 10);
    let mut model = XGBoostClassifier::new(XGBoostConfig::credit_default());
    model.fit(&x_train, &y_train, None).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let (x, _) = create_classification_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("predict", n_rows), &x, |b, x| {
            b.iter(|| model.predict(black_box(x)).unwrap())
        });
    }

    group.finish();
}

fn bench_resampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampling");
    group.sample_size(10);

    for n_rows in [1000, 5000].iter() {
        let data = create_classification_data(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("kmeans_smote", n_rows), &data, |b, (x, y)| {
            b.iter(|| {
                let mut sampler = KMeansSMOTE::new(KMeansSmoteConfig::default().with_random_state(Some(0)));
                sampler.fit_resample(black_box(x), black_box(y)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction, bench_resampling);
criterion_main!(benches);
