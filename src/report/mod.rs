//! Result reporting
//!
//! Turns the trained classifier, the held-out labels and its predictions into
//! a [`ResultReport`]: a confusion matrix and per-class metrics labelled with
//! the original target values, the most used features, and the per-round
//! validation curve. The report prints as a boxed terminal summary and
//! serializes to JSON.

mod style;

use crate::error::{CreditError, Result};
use crate::preprocessing::LabelEncoder;
use crate::training::{classification_report, confusion_matrix, AveragedMetrics, XGBoostClassifier};
use colored::*;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;
use style::{accent, bar, dim, kv, muted, ok, BoxWriter};

/// Default number of features kept by [`ResultReport::truncate_features`]
pub const DEFAULT_TOP_FEATURES: usize = 10;

/// Metrics for one class, keyed by its decoded label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSummary {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Everything shown after training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultReport {
    /// Decoded class labels, indexing both confusion matrix axes
    pub labels: Vec<String>,
    /// Rows are true labels, columns are predicted labels
    pub confusion_matrix: Vec<Vec<usize>>,
    pub classes: Vec<ClassSummary>,
    pub accuracy: f64,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    /// Split-count importances of every feature, descending
    pub top_features: Vec<FeatureImportance>,
    pub eval_metric: String,
    /// Eval metric after each boosting round
    pub eval_history: Vec<f64>,
}

/// Build the result report for a fitted model.
///
/// `y_test` and `y_pred` hold encoded labels; `target_encoder` maps them back
/// to the original target values. Every feature is listed, named `f0, f1, ...`
/// until [`ResultReport::with_feature_names`] is applied; callers cut the list
/// with [`ResultReport::truncate_features`].
pub fn show_result(
    model: &XGBoostClassifier,
    y_test: &Array1<i64>,
    y_pred: &Array1<i64>,
    target_encoder: &LabelEncoder,
) -> Result<ResultReport> {
    let cm = confusion_matrix(y_test, y_pred)?;
    let metrics = classification_report(y_test, y_pred)?;

    let labels = cm
        .labels
        .iter()
        .map(|&code| target_encoder.decode(code))
        .collect::<Result<Vec<String>>>()?;

    let classes = metrics
        .per_class
        .iter()
        .zip(labels.iter())
        .map(|(m, label)| ClassSummary {
            label: label.clone(),
            precision: m.precision,
            recall: m.recall,
            f1_score: m.f1_score,
            support: m.support,
        })
        .collect();

    let importances = model.feature_importances().ok_or(CreditError::ModelNotFitted)?;
    let mut top_features: Vec<FeatureImportance> = importances
        .iter()
        .enumerate()
        .map(|(i, &importance)| FeatureImportance { feature: format!("f{}", i), importance })
        .collect();
    top_features.sort_by(|a, b| {
        b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(ResultReport {
        labels,
        confusion_matrix: cm.matrix.rows().into_iter().map(|r| r.to_vec()).collect(),
        classes,
        accuracy: metrics.accuracy,
        macro_avg: metrics.macro_avg,
        weighted_avg: metrics.weighted_avg,
        top_features,
        eval_metric: model.config().eval_metric.name().to_string(),
        eval_history: model.evals_result().to_vec(),
    })
}

impl ResultReport {
    /// Replace the positional `f{i}` names with real column names
    pub fn with_feature_names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for fi in self.top_features.iter_mut() {
            let name = fi
                .feature
                .strip_prefix('f')
                .and_then(|i| i.parse::<usize>().ok())
                .and_then(|i| names.get(i));
            if let Some(name) = name {
                fi.feature = name.as_ref().to_string();
            }
        }
        self
    }

    /// Keep at most `n` features
    pub fn truncate_features(mut self, n: usize) -> Self {
        self.top_features.truncate(n);
        self
    }

    /// Boxed text summary
    pub fn render(&self) -> String {
        let mut w = BoxWriter::new();
        w.top();
        w.center(&"Results".white().bold().to_string());
        w.sep();

        w.line(&kv("Accuracy", &format!("{:.4}", self.accuracy)));
        w.line(&kv("Macro F1", &format!("{:.4}", self.macro_avg.f1_score)));
        w.line(&kv("Weighted F1", &format!("{:.4}", self.weighted_avg.f1_score)));
        w.line(&kv("Support", &self.weighted_avg.support.to_string()));

        w.sep();
        w.line(&muted("Confusion matrix (rows = actual)").to_string());
        let header: String = self.labels.iter().map(|l| format!("{:>10}", truncated(l, 10))).collect();
        w.line(&format!("{}{}", " ".repeat(12), accent(&header)));
        for (label, row) in self.labels.iter().zip(self.confusion_matrix.iter()) {
            let cells: String = row.iter().map(|c| format!("{:>10}", c)).collect();
            w.line(&format!("{}{}", accent(&format!("{:<12}", truncated(label, 12))), cells));
        }

        w.sep();
        w.line(&format!(
            "{}",
            muted(&format!("{:<12}{:>10}{:>10}{:>10}{:>10}", "class", "precision", "recall", "f1", "support"))
        ));
        for class in &self.classes {
            w.line(&format!(
                "{:<12}{:>10.2}{:>10.2}{:>10.2}{:>10}",
                truncated(&class.label, 12),
                class.precision,
                class.recall,
                class.f1_score,
                class.support
            ));
        }

        if !self.top_features.is_empty() {
            w.sep();
            w.line(&muted("Feature importance").to_string());
            for fi in &self.top_features {
                w.line(&format!(
                    "{:<16} {} {}",
                    truncated(&fi.feature, 16),
                    ok(&bar(fi.importance, 24)),
                    dim(&format!("{:.3}", fi.importance))
                ));
            }
        }

        if !self.eval_history.is_empty() {
            w.sep();
            w.line(&muted(&format!("Validation {} per round", self.eval_metric)).to_string());
            let max = self.eval_history.iter().cloned().fold(f64::MIN, f64::max);
            for (round, value) in self.eval_history.iter().enumerate() {
                let fraction = if max > 0.0 { value / max } else { 0.0 };
                w.line(&format!(
                    "{:>4}  {} {}",
                    round,
                    accent(&bar(fraction, 30)),
                    dim(&format!("{:.5}", value))
                ));
            }
        }

        w.empty();
        w.bottom();
        w.finish()
    }

    /// Print the boxed summary to stdout
    pub fn print(&self) {
        print!("{}", self.render());
    }

    /// Write the report as pretty JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn truncated(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max.saturating_sub(1)).chain(std::iter::once('…')).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::XGBoostConfig;
    use ndarray::{array, Array2};

    fn fitted() -> (XGBoostClassifier, Array1<i64>, LabelEncoder) {
        let x = Array2::from_shape_fn((40, 3), |(i, j)| if j == 1 { (i % 20) as f64 } else { (i * j) as f64 * 0.1 });
        let y: Array1<i64> = (0..40).map(|i| if i % 20 >= 10 { 1 } else { 0 }).collect();
        let mut model = XGBoostClassifier::new(XGBoostConfig::credit_default().with_random_state(Some(0)));
        model.fit(&x, &y, Some((&x, &y))).unwrap();

        let mut encoder = LabelEncoder::new();
        encoder.fit(&["no", "yes"]).unwrap();
        (model, y, encoder)
    }

    #[test]
    fn test_report_uses_decoded_labels() {
        let (model, y, encoder) = fitted();
        let y_pred = y.clone();
        let report = show_result(&model, &y, &y_pred, &encoder).unwrap();

        assert_eq!(report.labels, vec!["no", "yes"]);
        assert_eq!(report.confusion_matrix, vec![vec![20, 0], vec![0, 20]]);
        assert_eq!(report.classes[1].label, "yes");
        assert!((report.accuracy - 1.0).abs() < 1e-12);
        assert_eq!(report.eval_metric, "logloss");
        assert_eq!(report.eval_history.len(), 10);
    }

    #[test]
    fn test_feature_names_applied() {
        let (model, y, encoder) = fitted();
        let report = show_result(&model, &y, &y, &encoder)
            .unwrap()
            .with_feature_names(&["AGE", "STA_1", "BILL"]);
        assert!(!report.top_features.is_empty());
        assert!(report
            .top_features
            .iter()
            .all(|f| ["AGE", "STA_1", "BILL"].contains(&f.feature.as_str())));
    }

    #[test]
    fn test_render_contains_sections() {
        let (model, y, encoder) = fitted();
        let y_pred: Array1<i64> = (0..40).map(|i| (i % 2) as i64).collect();
        let text = style::strip_ansi(&show_result(&model, &y, &y_pred, &encoder).unwrap().render());

        assert!(text.contains("Results"));
        assert!(text.contains("Confusion matrix"));
        assert!(text.contains("yes"));
        assert!(text.contains("Validation logloss per round"));
    }

    #[test]
    fn test_save_json() {
        let (model, y, encoder) = fitted();
        let report = show_result(&model, &y, &y, &encoder).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save_json(&path).unwrap();

        let back: ResultReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.labels, report.labels);
        assert_eq!(back.confusion_matrix, report.confusion_matrix);
    }

    #[test]
    fn test_feature_limit_above_default() {
        let x = Array2::from_shape_fn((60, 15), |(i, j)| ((i * (j + 1)) % 17) as f64);
        let y: Array1<i64> = (0..60).map(|i| if i % 3 == 0 { 1 } else { 0 }).collect();
        let mut model = XGBoostClassifier::new(XGBoostConfig::credit_default().with_random_state(Some(0)));
        model.fit(&x, &y, None).unwrap();

        let mut encoder = LabelEncoder::new();
        encoder.fit(&["0", "1"]).unwrap();
        let report = show_result(&model, &y, &y, &encoder).unwrap();
        assert_eq!(report.top_features.len(), 15);
        assert_eq!(report.clone().truncate_features(12).top_features.len(), 12);
        assert_eq!(report.truncate_features(DEFAULT_TOP_FEATURES).top_features.len(), 10);
    }

    #[test]
    fn test_unfitted_model() {
        let model = XGBoostClassifier::new(XGBoostConfig::default());
        let mut encoder = LabelEncoder::new();
        encoder.fit(&["0", "1"]).unwrap();
        let y = array![0i64, 1];
        assert!(matches!(show_result(&model, &y, &y, &encoder), Err(CreditError::ModelNotFitted)));
    }
}
