//! Burn Dataset Integration
//!
//! Tensor-ready items, an in-memory Burn dataset for the evaluation path
//! and the batcher that assembles image/target tensors.

use std::path::Path;

use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::RgbImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::augmentation::Augmenter;
use crate::dataset::loader::{load_image, ImageSample};
use crate::utils::error::Result;

/// A single image sample ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WasteItem {
    /// Image data as flattened CHW float array [3 * H * W], values in [0, 1]
    pub image: Vec<f32>,
    /// Class label (0 = organik, 1 = anorganik)
    pub label: usize,
    /// Image path (for debugging/logging)
    pub path: String,
}

impl WasteItem {
    /// Load and preprocess an image without augmentation
    pub fn from_path(path: &Path, label: usize, image_size: usize) -> Result<Self> {
        let rgb = load_image(path, image_size as u32)?.to_rgb8();
        Ok(Self {
            image: to_chw_tensor(&rgb),
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Load, augment and preprocess an image (training split only)
    pub fn from_path_augmented<R: Rng>(
        path: &Path,
        label: usize,
        image_size: usize,
        augmenter: &Augmenter,
        rng: &mut R,
    ) -> Result<Self> {
        let rgb = load_image(path, image_size as u32)?.to_rgb8();
        let rgb = augmenter.apply(&rgb, rng);
        Ok(Self {
            image: to_chw_tensor(&rgb),
            label,
            path: path.to_string_lossy().to_string(),
        })
    }
}

/// Convert an RGB image to a CHW float vector rescaled to [0, 1]
fn to_chw_tensor(rgb: &RgbImage) -> Vec<f32> {
    let (width, height) = rgb.dimensions();
    let num_pixels = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in rgb.pixels().enumerate() {
        data[i] = pixel[0] as f32 / 255.0;
        data[num_pixels + i] = pixel[1] as f32 / 255.0;
        data[2 * num_pixels + i] = pixel[2] as f32 / 255.0;
    }

    data
}

/// In-memory waste dataset implementing Burn's Dataset trait.
///
/// Used for the validation/evaluation path, where images are loaded once
/// without augmentation.
#[derive(Debug, Clone)]
pub struct WasteBurnDataset {
    items: Vec<WasteItem>,
}

impl WasteBurnDataset {
    /// Load all samples into memory at the given image size
    pub fn from_samples(samples: &[ImageSample], image_size: usize) -> Result<Self> {
        let items: Result<Vec<_>> = samples
            .iter()
            .map(|s| WasteItem::from_path(&s.path, s.label, image_size))
            .collect();

        Ok(Self { items: items? })
    }

    /// Ground-truth labels in dataset order
    pub fn labels(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.label).collect()
    }
}

impl Dataset<WasteItem> for WasteBurnDataset {
    fn get(&self, index: usize) -> Option<WasteItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of waste images with binary targets
#[derive(Clone, Debug)]
pub struct WasteBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size], values 0 or 1
    pub targets: Tensor<B, 1, Int>,
}

/// Assembles image/target tensors from items
#[derive(Clone, Debug)]
pub struct WasteBatcher {
    image_size: usize,
}

impl WasteBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }

    /// Build a batch on the given device
    pub fn batch<B: Backend>(&self, items: Vec<WasteItem>, device: &B::Device) -> WasteBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        WasteBatch { images, targets }
    }
}
