//! Model Evaluation
//!
//! Runs the classifier over a held-out split without augmentation and
//! produces loss, accuracy and a full classification report.

use std::path::Path;

use burn::data::dataset::Dataset;
use burn::prelude::*;
use burn::tensor::activation;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{WasteBatcher, WasteBurnDataset, WasteDataset, WasteItem};
use crate::model::{ModelConfig, WasteClassifier};
use crate::training::{binary_cross_entropy_with_logits, load_checkpoint};
use crate::utils::error::Result;
use crate::utils::metrics::Metrics;
use crate::SCORE_THRESHOLD;

/// Results of evaluating a model on one split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Average binary cross-entropy loss over the split
    pub loss: f64,
    /// Overall accuracy
    pub accuracy: f64,
    /// Full metrics including per-class precision/recall/F1
    pub metrics: Metrics,
}

/// Evaluate a model on an in-memory dataset.
///
/// Scores at or above the threshold predict class 1 (anorganik).
pub fn evaluate<B: Backend>(
    model: &WasteClassifier<B>,
    dataset: &WasteBurnDataset,
    batch_size: usize,
    image_size: usize,
    device: &B::Device,
) -> Result<EvaluationReport> {
    let batcher = WasteBatcher::new(image_size);

    let mut predictions = Vec::with_capacity(dataset.len());
    let mut total_loss = 0.0f64;
    let mut num_batches = 0usize;

    let indices: Vec<usize> = (0..dataset.len()).collect();
    for chunk in indices.chunks(batch_size.max(1)) {
        let items: Vec<WasteItem> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }

        let batch = batcher.batch::<B>(items, device);
        let logits = model.forward(batch.images);

        let loss = binary_cross_entropy_with_logits(logits.clone(), batch.targets);
        total_loss += loss.into_scalar().elem::<f64>();
        num_batches += 1;

        let scores: Vec<f32> = activation::sigmoid(logits)
            .into_data()
            .to_vec()
            .map_err(|e| crate::utils::error::WasteError::Model(format!(
                "failed to read scores: {:?}",
                e
            )))?;
        predictions.extend(
            scores
                .iter()
                .map(|&s| usize::from(s as f64 >= SCORE_THRESHOLD)),
        );
    }

    let ground_truth = dataset.labels();
    let mut metrics = Metrics::from_predictions(&predictions, &ground_truth);

    let loss = if num_batches > 0 {
        total_loss / num_batches as f64
    } else {
        0.0
    };
    metrics.loss = Some(loss);
    let accuracy = metrics.accuracy;

    Ok(EvaluationReport {
        loss,
        accuracy,
        metrics,
    })
}

/// Load a checkpoint and evaluate it on a test directory, printing the report
pub fn evaluate_checkpoint<B: Backend>(
    checkpoint: &Path,
    test_dir: &Path,
    model_config: &ModelConfig,
    batch_size: usize,
    device: &B::Device,
) -> Result<EvaluationReport> {
    println!("{}", "=== Evaluating Waste Classifier ===".bold().cyan());

    let model = load_checkpoint::<B>(model_config, checkpoint, device)?;
    info!("Loaded checkpoint from {:?}", checkpoint);

    let test_data = WasteDataset::new(test_dir)?;
    test_data.stats().print();

    let dataset = WasteBurnDataset::from_samples(&test_data.samples, model_config.image_size)?;
    let report = evaluate(&model, &dataset, batch_size, model_config.image_size, device)?;

    println!();
    println!(
        "Test loss: {:.4} | Test accuracy: {}",
        report.loss,
        format!("{:.2}%", report.accuracy * 100.0).green().bold()
    );
    println!();
    println!("{}", report.metrics.display());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn synthetic_split(images_per_class: usize) -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        for (class, color) in [("organik", [30u8, 180, 40]), ("anorganik", [200, 50, 60])] {
            let class_dir = dir.path().join(class);
            std::fs::create_dir_all(&class_dir).unwrap();
            for i in 0..images_per_class {
                let img = image::RgbImage::from_pixel(16, 16, image::Rgb(color));
                img.save(class_dir.join(format!("img_{}.png", i))).unwrap();
            }
        }
        dir
    }

    #[test]
    fn test_evaluate_report_consistency() {
        let dir = synthetic_split(3);
        let data = WasteDataset::new(dir.path()).unwrap();
        let dataset = WasteBurnDataset::from_samples(&data.samples, 32).unwrap();

        let config = ModelConfig {
            image_size: 32,
            in_channels: 3,
            base_filters: 4,
            dropout_rate: 0.2,
        };
        let device = Default::default();
        let model = WasteClassifier::<TestBackend>::new(&config, &device);

        let report = evaluate(&model, &dataset, 4, 32, &device).unwrap();

        assert_eq!(report.metrics.total_samples, 6);
        assert!(report.loss.is_finite());
        assert!((0.0..=1.0).contains(&report.accuracy));
        assert_eq!(report.metrics.loss, Some(report.loss));
        // Confusion matrix covers every sample
        assert_eq!(report.metrics.confusion_matrix.total(), 6);
    }

    #[test]
    fn test_evaluate_checkpoint_missing_file() {
        let dir = synthetic_split(1);
        let config = ModelConfig {
            image_size: 32,
            in_channels: 3,
            base_filters: 4,
            dropout_rate: 0.2,
        };
        let device = Default::default();

        let result = evaluate_checkpoint::<TestBackend>(
            Path::new("/nonexistent/best_model"),
            dir.path(),
            &config,
            4,
            &device,
        );
        assert!(result.is_err());
    }
}
