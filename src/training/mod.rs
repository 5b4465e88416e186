//! Training module: transfer-style training with early stopping

pub mod trainer;

pub use trainer::{
    binary_cross_entropy_with_logits, load_checkpoint, run_training, TrainPaths, TrainingSummary,
    BEST_MODEL_STEM, FINAL_MODEL_STEM,
};
