//! Classification metrics

use crate::error::{CreditError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn check_lengths(a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(CreditError::ShapeError {
            expected: format!("{} predictions", a),
            actual: b.to_string(),
        });
    }
    if a == 0 {
        return Err(CreditError::ValidationError("empty input".to_string()));
    }
    Ok(())
}

fn check_binary(y_true: &Array1<i64>) -> Result<()> {
    if let Some(&bad) = y_true.iter().find(|&&v| v != 0 && v != 1) {
        return Err(CreditError::ValidationError(format!(
            "expected binary labels in {{0, 1}}, found {}",
            bad
        )));
    }
    Ok(())
}

/// Fraction of exact label matches
pub fn accuracy_score(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Area under the ROC curve for binary labels, with class 1 as positive.
///
/// Computed from average ranks of the scores, so tied scores count half.
/// Hard 0/1 predictions are valid scores.
pub fn roc_auc_score(y_true: &Array1<i64>, y_score: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true.len(), y_score.len())?;
    check_binary(y_true)?;

    let n_pos = y_true.iter().filter(|&&v| v == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(CreditError::ValidationError(
            "Only one class present in y_true. ROC AUC score is not defined in that case.".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].partial_cmp(&y_score[b]).unwrap_or(std::cmp::Ordering::Equal));

    // Average 1-based ranks over tied groups
    let mut ranks = vec![0.0; order.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t == 1)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Mean binary cross-entropy of positive-class probabilities
pub fn log_loss(y_true: &Array1<i64>, probs: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true.len(), probs.len())?;
    check_binary(y_true)?;

    let eps = 1e-15;
    let total: f64 = y_true
        .iter()
        .zip(probs.iter())
        .map(|(&t, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            if t == 1 { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    Ok(total / y_true.len() as f64)
}

/// Counts of (true, predicted) label pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Sorted labels indexing both axes
    pub labels: Vec<i64>,
    /// Row = true label, column = predicted label
    pub matrix: Array2<usize>,
}

impl ConfusionMatrix {
    pub fn count(&self, actual: i64, predicted: i64) -> usize {
        let row = self.labels.iter().position(|&l| l == actual);
        let col = self.labels.iter().position(|&l| l == predicted);
        match (row, col) {
            (Some(r), Some(c)) => self.matrix[[r, c]],
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.matrix.sum()
    }
}

pub fn confusion_matrix(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<ConfusionMatrix> {
    check_lengths(y_true.len(), y_pred.len())?;

    let labels: Vec<i64> = y_true
        .iter()
        .chain(y_pred.iter())
        .copied()
        .collect::<BTreeSet<i64>>()
        .into_iter()
        .collect();

    let n = labels.len();
    let mut matrix = Array2::zeros((n, n));
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        let r = labels.binary_search(t).unwrap_or(0);
        let c = labels.binary_search(p).unwrap_or(0);
        matrix[[r, c]] += 1;
    }

    Ok(ConfusionMatrix { labels, matrix })
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averaged precision/recall/F1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
}

pub fn classification_report(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<ClassificationReport> {
    let cm = confusion_matrix(y_true, y_pred)?;
    let n = cm.labels.len();

    let per_class: Vec<ClassMetrics> = (0..n)
        .map(|i| {
            let tp = cm.matrix[[i, i]] as f64;
            let predicted: usize = cm.matrix.column(i).sum();
            let support: usize = cm.matrix.row(i).sum();

            let precision = if predicted > 0 { tp / predicted as f64 } else { 0.0 };
            let recall = if support > 0 { tp / support as f64 } else { 0.0 };
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics { label: cm.labels[i], precision, recall, f1_score, support }
        })
        .collect();

    let total_support: usize = per_class.iter().map(|m| m.support).sum();
    let mean = |f: fn(&ClassMetrics) -> f64| per_class.iter().map(f).sum::<f64>() / n as f64;
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        if total_support == 0 {
            return 0.0;
        }
        per_class.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total_support as f64
    };

    let macro_avg = AveragedMetrics {
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1_score: mean(|m| m.f1_score),
        support: total_support,
    };
    let weighted_avg = AveragedMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1_score: weighted(|m| m.f1_score),
        support: total_support,
    };

    Ok(ClassificationReport {
        accuracy: accuracy_score(y_true, y_pred)?,
        per_class,
        macro_avg,
        weighted_avg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        let y_true = array![1i64, 0, 1, 1, 0, 1, 0, 0];
        let y_pred = array![1i64, 0, 1, 0, 0, 1, 1, 0];
        assert!((accuracy_score(&y_true, &y_pred).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let y = array![0i64, 0, 1, 1];
        assert!((roc_auc_score(&y, &array![0.1, 0.2, 0.8, 0.9]).unwrap() - 1.0).abs() < 1e-12);
        assert!(roc_auc_score(&y, &array![0.9, 0.8, 0.2, 0.1]).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_with_ties() {
        // Classic example: 0.75
        let y = array![0i64, 0, 1, 1];
        let scores = array![0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc_score(&y, &scores).unwrap() - 0.75).abs() < 1e-12);

        // Hard predictions: AUC = (TPR + TNR) / 2
        let y = array![1i64, 0, 1, 1, 0, 1, 0, 0];
        let pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        assert!((roc_auc_score(&y, &pred).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class() {
        let y = array![1i64, 1, 1];
        assert!(matches!(
            roc_auc_score(&y, &array![0.2, 0.5, 0.9]),
            Err(CreditError::ValidationError(_))
        ));
    }

    #[test]
    fn test_log_loss() {
        let y = array![1i64, 0];
        let loss = log_loss(&y, &array![0.5, 0.5]).unwrap();
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_confusion_matrix_and_report() {
        let y_true = array![1i64, 0, 1, 1, 0, 1, 0, 0];
        let y_pred = array![1i64, 0, 1, 0, 0, 1, 1, 0];

        let cm = confusion_matrix(&y_true, &y_pred).unwrap();
        assert_eq!(cm.labels, vec![0, 1]);
        assert_eq!(cm.count(0, 0), 3);
        assert_eq!(cm.count(0, 1), 1);
        assert_eq!(cm.count(1, 0), 1);
        assert_eq!(cm.count(1, 1), 3);
        assert_eq!(cm.total(), 8);

        let report = classification_report(&y_true, &y_pred).unwrap();
        assert_eq!(report.per_class.len(), 2);
        assert!((report.per_class[1].precision - 0.75).abs() < 1e-12);
        assert!((report.per_class[1].recall - 0.75).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 8);
        assert!((report.accuracy - 0.75).abs() < 1e-12);
    }
}
