//! Metrics Module for Model Evaluation
//!
//! Evaluation metrics for the binary waste classifier:
//! - Accuracy
//! - Per-class and macro precision, recall, F1-score
//! - 2x2 confusion matrix

use serde::{Deserialize, Serialize};

use crate::dataset::CLASS_NAMES;

/// Evaluation metrics for the two-class problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Optional average loss (set externally by the evaluator)
    pub loss: Option<f64>,

    /// Macro-averaged precision over both classes
    pub macro_precision: f64,

    /// Macro-averaged recall
    pub macro_recall: f64,

    /// Macro-averaged F1-score
    pub macro_f1: f64,

    /// Per-class metrics, indexed by class (0 = organik, 1 = anorganik)
    pub per_class: Vec<ClassMetrics>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Create metrics from predicted and ground-truth class indices
    pub fn from_predictions(predictions: &[usize], ground_truth: &[usize]) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "Predictions and ground truth must have same length"
        );

        let total_samples = predictions.len();
        if total_samples == 0 {
            return Self::default();
        }

        let confusion_matrix = ConfusionMatrix::from_predictions(predictions, ground_truth);

        let correct_predictions = confusion_matrix.correct();
        let accuracy = correct_predictions as f64 / total_samples as f64;

        let per_class: Vec<ClassMetrics> = (0..2)
            .map(|class_idx| ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx))
            .collect();

        // Macro averages over classes that actually occur
        let valid: Vec<&ClassMetrics> = per_class.iter().filter(|m| m.support > 0).collect();
        let num_valid = valid.len().max(1) as f64;

        let macro_precision = valid.iter().map(|m| m.precision).sum::<f64>() / num_valid;
        let macro_recall = valid.iter().map(|m| m.recall).sum::<f64>() / num_valid;
        let macro_f1 = valid.iter().map(|m| m.f1).sum::<f64>() / num_valid;

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            loss: None,
            macro_precision,
            macro_recall,
            macro_f1,
            per_class,
            confusion_matrix,
        }
    }

    /// Render a classification-report style table
    pub fn display(&self) -> String {
        let mut out = String::new();

        out.push_str("Classification Report:\n");
        out.push_str(&format!(
            "  {:>12} {:>10} {:>10} {:>10} {:>10}\n",
            "", "precision", "recall", "f1-score", "support"
        ));

        for (idx, m) in self.per_class.iter().enumerate() {
            let name = CLASS_NAMES.get(idx).copied().unwrap_or("?");
            out.push_str(&format!(
                "  {:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}\n",
                name, m.precision, m.recall, m.f1, m.support
            ));
        }

        out.push('\n');
        out.push_str(&format!(
            "  accuracy: {:.4} ({}/{})\n",
            self.accuracy, self.correct_predictions, self.total_samples
        ));
        out.push_str(&format!(
            "  macro avg: precision {:.4} | recall {:.4} | f1 {:.4}\n",
            self.macro_precision, self.macro_recall, self.macro_f1
        ));
        if let Some(loss) = self.loss {
            out.push_str(&format!("  loss: {:.4}\n", loss));
        }

        out.push('\n');
        out.push_str(&self.confusion_matrix.display());

        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            total_samples: 0,
            correct_predictions: 0,
            accuracy: 0.0,
            loss: None,
            macro_precision: 0.0,
            macro_recall: 0.0,
            macro_f1: 0.0,
            per_class: Vec::new(),
            confusion_matrix: ConfusionMatrix::default(),
        }
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index (0 = organik, 1 = anorganik)
    pub class_idx: usize,

    /// True positives
    pub true_positives: usize,

    /// False positives
    pub false_positives: usize,

    /// False negatives
    pub false_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for one class from the confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize) -> Self {
        let other = 1 - class_idx;

        let true_positives = cm.get(class_idx, class_idx);
        let false_positives = cm.get(other, class_idx);
        let false_negatives = cm.get(class_idx, other);
        let support = true_positives + false_negatives;

        let precision = if true_positives + false_positives > 0 {
            true_positives as f64 / (true_positives + false_positives) as f64
        } else {
            0.0
        };

        let recall = if support > 0 {
            true_positives as f64 / support as f64
        } else {
            0.0
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// 2x2 confusion matrix (row = actual, column = predicted)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Create an empty confusion matrix
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the confusion matrix from predictions and ground truth
    pub fn from_predictions(predictions: &[usize], ground_truth: &[usize]) -> Self {
        let mut cm = Self::new();
        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }
        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < 2 && predicted < 2 {
            self.matrix[actual][predicted] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < 2 && predicted < 2 {
            self.matrix[actual][predicted]
        } else {
            0
        }
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        self.matrix[0][0] + self.matrix[1][1]
    }

    /// Overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Pretty print the matrix with class names
    pub fn display(&self) -> String {
        let mut out = String::new();

        out.push_str("Confusion Matrix (rows=actual, cols=predicted):\n");
        out.push_str(&format!(
            "  {:>12} {:>10} {:>10}\n",
            "", CLASS_NAMES[0], CLASS_NAMES[1]
        ));
        for actual in 0..2 {
            out.push_str(&format!(
                "  {:>12} {:>10} {:>10}\n",
                CLASS_NAMES[actual],
                self.get(actual, 0),
                self.get(actual, 1)
            ));
        }

        out
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
