//! Model module: classifier architecture and configuration

pub mod classifier;
pub mod config;

pub use classifier::{ConvBlock, WasteClassifier};
pub use config::{ModelConfig, TrainingConfig};
