//! Waste Classifier
//!
//! A binary image classifier separating organic (organik) from inorganic
//! (anorganik) waste, built on the Burn deep learning framework.
//!
//! The pipeline covers four stages:
//! - Training a small convolutional model with a frozen backbone and a
//!   single-logit sigmoid head, with augmentation and early stopping
//! - Evaluating a checkpoint on the held-out test split
//! - Exporting the trained model as an int8-quantized artifact
//! - Verifying the quantized artifact on individual images

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod quant;
pub mod training;
pub mod utils;

pub use dataset::{WasteDataset, CLASS_NAMES, NUM_CLASSES};
pub use inference::{EvaluationReport, Prediction};
pub use model::{ModelConfig, TrainingConfig, WasteClassifier};
pub use quant::QuantizedArtifact;
pub use training::TrainingSummary;
pub use utils::error::{Result, WasteError};

/// Default input image size (square)
pub const IMAGE_SIZE: usize = 224;

/// Decision threshold on the sigmoid score: at or above predicts anorganik
pub const SCORE_THRESHOLD: f64 = 0.5;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
