//! Model and Training Configuration
//!
//! Serde-backed configuration structures with validation and JSON
//! persistence.

use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, WasteError};

/// Configuration for the classifier topology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Input image size (width and height, assumed square)
    pub image_size: usize,

    /// Number of input channels (3 for RGB)
    pub in_channels: usize,

    /// Base number of convolutional filters; doubles at each backbone stage
    pub base_filters: usize,

    /// Dropout rate applied before the sigmoid head
    pub dropout_rate: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            image_size: crate::IMAGE_SIZE,
            in_channels: 3,
            base_filters: 16,
            dropout_rate: 0.2,
        }
    }
}

impl ModelConfig {
    /// Create a configuration with a custom input size
    pub fn with_image_size(image_size: usize) -> Self {
        Self {
            image_size,
            ..Default::default()
        }
    }

    /// Number of features produced by the backbone after global pooling
    pub fn feature_dim(&self) -> usize {
        self.base_filters * 8
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.image_size == 0 || self.image_size % 16 != 0 {
            return Err(WasteError::Config(
                "image_size must be a positive multiple of 16".to_string(),
            ));
        }
        if self.base_filters == 0 {
            return Err(WasteError::Config(
                "base_filters must be greater than 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(WasteError::Config(
                "dropout_rate must be in range [0.0, 1.0)".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| WasteError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| WasteError::Config(e.to_string()))
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,

    /// Batch size
    pub batch_size: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Early stopping patience: epochs without validation-loss improvement
    pub patience: usize,

    /// Random seed for shuffling and augmentation
    pub seed: u64,

    /// Whether to augment the training split
    pub augment: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 15,
            batch_size: 32,
            learning_rate: 1e-4,
            patience: 3,
            seed: 42,
            augment: true,
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(WasteError::Config("epochs must be greater than 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(WasteError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(WasteError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_default() {
        let config = ModelConfig::default();
        assert_eq!(config.image_size, 224);
        assert_eq!(config.in_channels, 3);
        assert_eq!(config.feature_dim(), 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_config_validation() {
        let mut config = ModelConfig::default();
        config.image_size = 100; // not a multiple of 16
        assert!(config.validate().is_err());

        config = ModelConfig::default();
        config.dropout_rate = 1.5;
        assert!(config.validate().is_err());

        config = ModelConfig::default();
        config.base_filters = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 15);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.patience, 3);
        assert!(config.augment);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("model.json");

        let config = ModelConfig::with_image_size(64);
        config.save(&path).unwrap();

        let loaded = ModelConfig::load(&path).unwrap();
        assert_eq!(loaded.image_size, 64);
        assert_eq!(loaded.base_filters, config.base_filters);
    }
}
