//! Integration test: Full pipeline (load → encode → resample → split → scale → train → report)

use credit_default::data::DataLoader;
use credit_default::pipeline::{run_experiment, run_experiment_with, ExperimentConfig, StageEvent};
use credit_default::training::SplitConfig;
use credit_default::CreditError;
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

/// 1000 rows, 80/20 target. Defaulters carry a much larger balance, so they
/// form their own region in feature space.
fn credit_frame(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_default = n / 5;

    let mut sex = Vec::with_capacity(n);
    let mut edu = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut sta_1 = Vec::with_capacity(n);
    let mut sta_2 = Vec::with_capacity(n);
    let mut sta_3 = Vec::with_capacity(n);
    let mut limit = Vec::with_capacity(n);
    let mut bill = Vec::with_capacity(n);
    let mut pay = Vec::with_capacity(n);

    for i in 0..n {
        let defaulted = i % 5 == 0 && i / 5 < n_default;
        sex.push(rng.gen_range(1i64..=2));
        edu.push(rng.gen_range(1i64..=4));
        age.push(rng.gen_range(21i64..=70));
        sta_1.push(rng.gen_range(-2i64..=8));
        sta_2.push(rng.gen_range(-2i64..=8));
        sta_3.push(rng.gen_range(-2i64..=8));
        if defaulted {
            limit.push(400_000.0 + rng.gen::<f64>() * 20_000.0);
            bill.push(150_000.0 + rng.gen::<f64>() * 10_000.0);
        } else {
            limit.push(20_000.0 + rng.gen::<f64>() * 20_000.0);
            bill.push(5_000.0 + rng.gen::<f64>() * 10_000.0);
        }
        pay.push(if defaulted { 1i64 } else { 0 });
    }

    df!(
        "SEX" => &sex,
        "EDU" => &edu,
        "AGE" => &age,
        "STA_1" => &sta_1,
        "STA_2" => &sta_2,
        "STA_3" => &sta_3,
        "LIMIT_BAL" => &limit,
        "BILL_AMT" => &bill,
        "PAY" => &pay
    )
    .unwrap()
}

fn write_csv(dir: &Path, df: &mut DataFrame) -> PathBuf {
    let path = dir.join("uci_credit_card_default.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

#[test]
fn test_full_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), &mut credit_frame(1000, 42));

    let config = ExperimentConfig::new().with_data_path(&path).with_random_state(Some(42));
    let outcome = run_experiment(&config).unwrap();

    // Scores
    assert!((0.0..=1.0).contains(&outcome.train_score));
    assert!((0.0..=1.0).contains(&outcome.test_score));
    assert!((0.0..=1.0).contains(&outcome.roc_auc));
    let lines = outcome.score_lines();
    assert!(lines[0].starts_with("Training Score: "));
    assert!(lines[1].starts_with("Testing Score: "));
    assert!(lines[2].starts_with("ROC AUC: "));

    // Resampling grows the minority class only
    assert_eq!(outcome.class_histogram, vec![(0, 800), (1, 200)]);
    assert_eq!(outcome.resample_histogram[0], (0, 800));
    assert!(outcome.resample_histogram[1].1 > 200);

    // The split still uses the original 1000 rows
    assert_eq!(outcome.train_shape, (700, 6));
    assert_eq!(outcome.test_shape, (300, 6));
    assert_eq!(
        outcome.shape_summary,
        "X_train.shape = (700, 6), y_train.shape = (700,), X_test.shape = (300, 6), y_test.shape = (300,)"
    );

    // SEX and EDU are gone, PAY is the target
    assert_eq!(
        outcome.feature_names,
        vec!["AGE", "STA_1", "STA_2", "STA_3", "LIMIT_BAL", "BILL_AMT"]
    );
}

#[test]
fn test_report_renders_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), &mut credit_frame(1000, 7));

    let outcome = run_experiment(&ExperimentConfig::new().with_data_path(&path).with_random_state(Some(7))).unwrap();
    let report = &outcome.report;

    assert_eq!(report.labels, vec!["0", "1"]);
    let total: usize = report.confusion_matrix.iter().flatten().sum();
    assert_eq!(total, 300);
    assert_eq!(report.eval_history.len(), 10);
    assert!(report.top_features.len() <= 10);
    assert!(!report.render().is_empty());

    let json_path = dir.path().join("report.json");
    report.save_json(&json_path).unwrap();
    assert!(json_path.exists());
}

#[test]
fn test_seeded_runs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), &mut credit_frame(1000, 3));
    let config = ExperimentConfig::new().with_data_path(&path).with_random_state(Some(3));

    let a = run_experiment(&config).unwrap();
    let b = run_experiment(&config).unwrap();
    assert_eq!(a.resample_histogram, b.resample_histogram);
    assert_eq!(a.test_score, b.test_score);
    assert_eq!(a.report.confusion_matrix, b.report.confusion_matrix);
}

#[test]
fn test_stage_events_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), &mut credit_frame(1000, 5));
    let config = ExperimentConfig::new().with_data_path(&path).with_random_state(Some(5));

    let mut events = Vec::new();
    let outcome = run_experiment_with(&config, |event| match event {
        StageEvent::Resampled(h) => events.push(format!("{:?}", h)),
        StageEvent::Split(s) => events.push(s.to_string()),
    })
    .unwrap();

    assert_eq!(
        events,
        vec![format!("{:?}", outcome.resample_histogram), outcome.shape_summary.clone()]
    );
}

#[test]
fn test_histogram_emitted_before_split_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), &mut credit_frame(1000, 6));
    let config = ExperimentConfig::new()
        .with_data_path(&path)
        .with_random_state(Some(6))
        .with_split(SplitConfig::default().with_test_size(1.5));

    let mut histogram = None;
    let mut saw_split = false;
    let result = run_experiment_with(&config, |event| match event {
        StageEvent::Resampled(h) => histogram = Some(h.to_vec()),
        StageEvent::Split(_) => saw_split = true,
    });

    assert!(matches!(result, Err(CreditError::InvalidParameter { ref name, .. }) if name == "test_size"));
    let histogram = histogram.unwrap();
    assert_eq!(histogram[0], (0, 800));
    assert!(histogram[1].1 > 200);
    assert!(!saw_split);
}

#[test]
fn test_missing_file() {
    let config = ExperimentConfig::new().with_data_path("/nonexistent/credit.csv");
    assert!(matches!(run_experiment(&config), Err(CreditError::IoError(_))));
}

#[test]
fn test_missing_dropped_column() {
    let dir = tempfile::tempdir().unwrap();
    let mut df = credit_frame(100, 1).drop("EDU").unwrap();
    let path = write_csv(dir.path(), &mut df);

    let err = run_experiment(&ExperimentConfig::new().with_data_path(&path)).unwrap_err();
    assert!(matches!(err, CreditError::FeatureNotFound(ref c) if c == "EDU"));
}

#[test]
fn test_file_info() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), &mut credit_frame(50, 1));
    let info = DataLoader::new().file_info(&path).unwrap();
    assert_eq!(info.n_rows, 50);
    assert_eq!(info.n_cols, 9);
}
