//! Single-Image Prediction
//!
//! Classifies individual images with a trained float model: load, resize,
//! rescale to [0, 1], forward, threshold the sigmoid score.

use std::path::Path;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::{class_name, WasteBatcher, WasteItem};
use crate::model::WasteClassifier;
use crate::utils::error::Result;
use crate::SCORE_THRESHOLD;

/// Outcome of classifying a single image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Sigmoid score, the probability of class 1 (anorganik)
    pub score: f64,
    /// Predicted class index
    pub class_index: usize,
    /// Predicted class name
    pub label: String,
}

/// Map a sigmoid score to its class label
pub fn label_for_score(score: f64) -> (usize, &'static str) {
    let class_index = usize::from(score >= SCORE_THRESHOLD);
    // Index is always 0 or 1
    (class_index, class_name(class_index).unwrap_or("?"))
}

/// Classify one image file with a float model
pub fn predict_image<B: Backend>(
    model: &WasteClassifier<B>,
    path: &Path,
    image_size: usize,
    device: &B::Device,
) -> Result<Prediction> {
    let item = WasteItem::from_path(path, 0, image_size)?;
    let batcher = WasteBatcher::new(image_size);
    let batch = batcher.batch::<B>(vec![item], device);

    let score = model
        .forward_score(batch.images)
        .into_scalar()
        .elem::<f64>();

    let (class_index, label) = label_for_score(score);

    Ok(Prediction {
        score,
        class_index,
        label: label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;
    use image::RgbImage;
    use tempfile::TempDir;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_label_for_score_threshold() {
        assert_eq!(label_for_score(0.0), (0, "organik"));
        assert_eq!(label_for_score(0.49), (0, "organik"));
        // Threshold itself maps to anorganik
        assert_eq!(label_for_score(0.5), (1, "anorganik"));
        assert_eq!(label_for_score(1.0), (1, "anorganik"));
    }

    #[test]
    fn test_predict_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.png");
        RgbImage::from_pixel(16, 16, image::Rgb([120, 90, 60]))
            .save(&path)
            .unwrap();

        let config = ModelConfig {
            image_size: 32,
            in_channels: 3,
            base_filters: 4,
            dropout_rate: 0.2,
        };
        let device = Default::default();
        let model = WasteClassifier::<TestBackend>::new(&config, &device);

        let prediction = predict_image(&model, &path, 32, &device).unwrap();
        assert!((0.0..=1.0).contains(&prediction.score));
        assert!(prediction.class_index < 2);
        assert_eq!(
            prediction.label,
            class_name(prediction.class_index).unwrap()
        );
    }

    #[test]
    fn test_predict_missing_image() {
        let config = ModelConfig {
            image_size: 32,
            in_channels: 3,
            base_filters: 4,
            dropout_rate: 0.2,
        };
        let device = Default::default();
        let model = WasteClassifier::<TestBackend>::new(&config, &device);

        let result = predict_image(&model, Path::new("/nonexistent.png"), 32, &device);
        assert!(result.is_err());
    }
}
