//! Dataset module for waste image data handling
//!
//! This module provides functionality for:
//! - Loading the two-class waste dataset from disk
//!   (`data/processed/{TRAIN,TEST}/<class>/*.jpg|png`)
//! - The fixed augmentation policy applied to the training split
//! - Burn `Dataset` and batching integration

pub mod augmentation;
pub mod burn_dataset;
pub mod loader;

pub use augmentation::{AugmentConfig, Augmenter};
pub use burn_dataset::{WasteBatch, WasteBatcher, WasteBurnDataset, WasteItem};
pub use loader::{DatasetStats, ImageSample, WasteDataset};

/// Number of waste classes
pub const NUM_CLASSES: usize = 2;

/// Class names, ordered by class index.
///
/// The sigmoid head outputs the probability of class 1 (anorganik); a score
/// at or above the threshold maps to "anorganik", below to "organik".
pub const CLASS_NAMES: [&str; NUM_CLASSES] = ["organik", "anorganik"];

/// Get the class name for a given label index
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}

/// Map a class directory name to its label index.
///
/// Accepts the Indonesian names used by the dataset along with common
/// English aliases and the single-letter folder names of the raw dump.
pub fn class_index_for_dir(name: &str) -> Option<usize> {
    match name.to_lowercase().as_str() {
        "organik" | "organic" | "o" => Some(0),
        "anorganik" | "anorganic" | "inorganic" | "r" => Some(1),
        _ => None,
    }
}
