//! Training Loop
//!
//! Transfer-style training of the waste classifier: the convolutional
//! backbone output is detached so only the sigmoid head learns, matching a
//! frozen feature extractor. Validation runs on the TEST split after every
//! epoch, with best-checkpoint saving and early stopping on validation loss.

use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::CompactRecorder;
use burn::tensor::backend::AutodiffBackend;
use colored::Colorize;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{Augmenter, WasteBatcher, WasteBurnDataset, WasteDataset, WasteItem};
use crate::inference::evaluator;
use crate::model::{ModelConfig, TrainingConfig, WasteClassifier};
use crate::utils::error::{Result, WasteError};

/// File stem of the best-validation-loss checkpoint
pub const BEST_MODEL_STEM: &str = "best_model";

/// File stem of the last-epoch checkpoint
pub const FINAL_MODEL_STEM: &str = "final_model";

/// Paths used by a training run
#[derive(Debug, Clone)]
pub struct TrainPaths {
    /// Directory of the training split
    pub train_dir: PathBuf,
    /// Directory of the validation split (the held-out TEST folder)
    pub val_dir: PathBuf,
    /// Output directory for checkpoints and the model config
    pub model_dir: PathBuf,
    /// Optional checkpoint providing pretrained backbone weights
    pub backbone: Option<PathBuf>,
}

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_val_loss: f64,
    pub final_train_loss: f64,
    pub stopped_early: bool,
    /// RFC 3339 timestamp of when the run finished
    pub completed_at: String,
}

/// Numerically stable binary cross-entropy from raw logits.
///
/// Computes mean over the batch of
/// `max(z, 0) - z * y + ln(1 + exp(-|z|))`.
pub fn binary_cross_entropy_with_logits<B: Backend>(
    logits: Tensor<B, 1>,
    targets: Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let y = targets.float();
    let z = logits;

    let per_sample = z.clone().clamp_min(0.0) - z.clone() * y
        + (z.abs().neg().exp().add_scalar(1.0)).log();
    per_sample.mean()
}

/// Train the classifier and return a summary of the run.
///
/// Saves `best_model` whenever validation loss improves and `final_model`
/// when training finishes, both under `paths.model_dir`.
pub fn run_training<B: AutodiffBackend>(
    paths: &TrainPaths,
    model_config: &ModelConfig,
    train_config: &TrainingConfig,
    device: &B::Device,
) -> Result<TrainingSummary> {
    model_config.validate()?;
    train_config.validate()?;

    std::fs::create_dir_all(&paths.model_dir)?;

    println!("{}", "=== Training Waste Classifier ===".bold().cyan());

    // Data
    let mut train_data = WasteDataset::new(&paths.train_dir)?;
    let val_data = WasteDataset::new(&paths.val_dir)?;

    println!("Train split:");
    train_data.stats().print();
    println!("Validation split:");
    val_data.stats().print();

    info!("Caching validation images in memory");
    let val_dataset = WasteBurnDataset::from_samples(&val_data.samples, model_config.image_size)?;

    // Model
    let mut model = WasteClassifier::<B>::new(model_config, device);
    if let Some(backbone) = &paths.backbone {
        info!("Loading backbone weights from {:?}", backbone);
        model = model
            .load_file(backbone.clone(), &CompactRecorder::new(), device)
            .map_err(|e| WasteError::Model(format!("failed to load backbone: {}", e)))?;
    }

    model_config.save(&paths.model_dir.join("config.json"))?;

    let mut optimizer = AdamConfig::new().init();
    let batcher = WasteBatcher::new(model_config.image_size);
    let augmenter = Augmenter::default();
    let mut rng = ChaCha8Rng::seed_from_u64(train_config.seed);

    let mut best_val_loss = f64::INFINITY;
    let mut best_epoch = 0usize;
    let mut epochs_without_improvement = 0usize;
    let mut final_train_loss = 0.0f64;
    let mut epochs_run = 0usize;
    let mut stopped_early = false;

    for epoch in 1..=train_config.epochs {
        epochs_run = epoch;
        train_data.shuffle(train_config.seed.wrapping_add(epoch as u64));

        let mut epoch_loss = 0.0f64;
        let mut num_batches = 0usize;

        for chunk in train_data.samples.chunks(train_config.batch_size) {
            let items: Result<Vec<WasteItem>> = chunk
                .iter()
                .map(|s| {
                    if train_config.augment {
                        WasteItem::from_path_augmented(
                            &s.path,
                            s.label,
                            model_config.image_size,
                            &augmenter,
                            &mut rng,
                        )
                    } else {
                        WasteItem::from_path(&s.path, s.label, model_config.image_size)
                    }
                })
                .collect();

            let batch = batcher.batch::<B>(items?, device);

            // Frozen backbone: gradients flow through the head only
            let features = model.features(batch.images).detach();
            let logits = model.classify(features);
            let loss = binary_cross_entropy_with_logits(logits, batch.targets);

            epoch_loss += loss.clone().into_scalar().elem::<f64>();
            num_batches += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(train_config.learning_rate, model, grads);
        }

        let train_loss = if num_batches > 0 {
            epoch_loss / num_batches as f64
        } else {
            0.0
        };
        final_train_loss = train_loss;

        // Validation on the inner (non-autodiff) backend
        let report = evaluator::evaluate(
            &model.valid(),
            &val_dataset,
            train_config.batch_size,
            model_config.image_size,
            device,
        )?;

        println!(
            "Epoch {}/{} | train loss: {:.4} | val loss: {:.4} | val acc: {:.2}%",
            epoch,
            train_config.epochs,
            train_loss,
            report.loss,
            report.accuracy * 100.0
        );

        if report.loss < best_val_loss {
            best_val_loss = report.loss;
            best_epoch = epoch;
            epochs_without_improvement = 0;

            save_checkpoint(&model, &paths.model_dir, BEST_MODEL_STEM)?;
            println!(
                "  {} val loss improved, checkpoint saved",
                "✓".green().bold()
            );
        } else {
            epochs_without_improvement += 1;
            info!(
                "No improvement for {} epoch(s) (best: {:.4} at epoch {})",
                epochs_without_improvement, best_val_loss, best_epoch
            );

            if epochs_without_improvement >= train_config.patience {
                println!(
                    "{}",
                    format!("Early stopping after epoch {}", epoch).yellow()
                );
                stopped_early = true;
                break;
            }
        }
    }

    save_checkpoint(&model, &paths.model_dir, FINAL_MODEL_STEM)?;

    println!(
        "{}",
        format!(
            "Training complete: best val loss {:.4} at epoch {}",
            best_val_loss, best_epoch
        )
        .green()
        .bold()
    );

    let summary = TrainingSummary {
        epochs_run,
        best_epoch,
        best_val_loss,
        final_train_loss,
        stopped_early,
        completed_at: chrono::Local::now().to_rfc3339(),
    };

    let summary_json = serde_json::to_string_pretty(&summary)
        .map_err(|e| WasteError::Model(format!("failed to serialize summary: {}", e)))?;
    std::fs::write(paths.model_dir.join("training_summary.json"), summary_json)?;

    Ok(summary)
}

/// Save a model checkpoint under `model_dir` with the given file stem
fn save_checkpoint<B: Backend>(
    model: &WasteClassifier<B>,
    model_dir: &Path,
    stem: &str,
) -> Result<()> {
    let path = model_dir.join(stem);
    model
        .clone()
        .save_file(path, &CompactRecorder::new())
        .map_err(|e| WasteError::Model(format!("failed to save checkpoint: {}", e)))?;
    Ok(())
}

/// Load a model checkpoint saved by `run_training`
pub fn load_checkpoint<B: Backend>(
    model_config: &ModelConfig,
    checkpoint: &Path,
    device: &B::Device,
) -> Result<WasteClassifier<B>> {
    let model = WasteClassifier::<B>::new(model_config, device)
        .load_file(checkpoint.to_path_buf(), &CompactRecorder::new(), device)
        .map_err(|e| WasteError::Model(format!("failed to load checkpoint: {}", e)))?;
    Ok(model)
}
