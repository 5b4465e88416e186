//! Inference module: evaluation and single-image prediction

pub mod evaluator;
pub mod predictor;

pub use evaluator::{evaluate, evaluate_checkpoint, EvaluationReport};
pub use predictor::{label_for_score, predict_image, Prediction};
