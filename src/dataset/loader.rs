//! Waste Dataset Loader
//!
//! Scans a split directory (e.g. `data/processed/TRAIN`) whose class
//! subfolders hold the images for each of the two waste classes.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::dataset::{class_index_for_dir, CLASS_NAMES, NUM_CLASSES};
use crate::utils::error::{Result, WasteError};

/// File extensions recognized as images
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// A single image sample with its label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index (0 = organik, 1 = anorganik)
    pub label: usize,
}

/// A split of the waste dataset, loaded lazily from disk
#[derive(Debug, Clone)]
pub struct WasteDataset {
    /// Root directory of the split
    pub root_dir: PathBuf,
    /// All samples in the split
    pub samples: Vec<ImageSample>,
}

impl WasteDataset {
    /// Load a dataset split from a directory.
    ///
    /// The directory should be structured as:
    /// ```text
    /// root_dir/
    /// ├── organik/
    /// │   ├── image1.jpg
    /// │   └── image2.png
    /// └── anorganik/
    ///     └── ...
    /// ```
    ///
    /// Class directory names outside the known set are an error rather than
    /// being silently ordered.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading waste dataset from: {:?}", root_dir);

        if !root_dir.exists() {
            return Err(WasteError::PathNotFound(root_dir));
        }

        let mut samples = Vec::new();

        let mut class_dirs: Vec<PathBuf> = std::fs::read_dir(&root_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .collect();
        class_dirs.sort();

        if class_dirs.is_empty() {
            return Err(WasteError::Dataset(format!(
                "no class directories found under {:?}",
                root_dir
            )));
        }

        for class_dir in &class_dirs {
            let dir_name = class_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();

            let label = class_index_for_dir(dir_name).ok_or_else(|| {
                WasteError::Dataset(format!(
                    "unknown class directory '{}' (expected one of {:?})",
                    dir_name, CLASS_NAMES
                ))
            })?;

            let mut class_count = 0usize;
            for entry in WalkDir::new(class_dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path().to_path_buf();
                if is_image_file(&path) {
                    samples.push(ImageSample { path, label });
                    class_count += 1;
                }
            }

            debug!(
                "Class '{}' (label {}): {} images",
                dir_name, label, class_count
            );
        }

        if samples.is_empty() {
            return Err(WasteError::Dataset(format!(
                "no images found under {:?}",
                root_dir
            )));
        }

        info!("Loaded {} samples", samples.len());

        Ok(Self { root_dir, samples })
    }

    /// Number of samples in the split
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the split is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Load an image from disk and resize it to a square of `size` pixels
    pub fn load_image(&self, sample: &ImageSample, size: u32) -> Result<DynamicImage> {
        load_image(&sample.path, size)
    }

    /// Shuffle the samples in place with a given seed
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.samples.shuffle(&mut rng);
    }

    /// Get samples for a specific class
    pub fn samples_by_class(&self, class_idx: usize) -> Vec<&ImageSample> {
        self.samples
            .iter()
            .filter(|s| s.label == class_idx)
            .collect()
    }

    /// Get statistics about the split
    pub fn stats(&self) -> DatasetStats {
        let mut class_counts = [0usize; NUM_CLASSES];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            class_counts,
        }
    }
}

/// Check whether the path looks like a supported image file
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Open, decode and resize an image to `size` x `size`
pub fn load_image(path: &Path, size: u32) -> Result<DynamicImage> {
    let img = ImageReader::open(path)
        .map_err(|e| WasteError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| WasteError::ImageLoad(path.to_path_buf(), e.to_string()))?;

    Ok(img.resize_exact(size, size, image::imageops::FilterType::Triangle))
}

/// Statistics about a dataset split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub class_counts: [usize; NUM_CLASSES],
}

impl DatasetStats {
    /// Print statistics to the console
    pub fn print(&self) {
        println!("Dataset statistics:");
        println!("  Total samples: {}", self.total_samples);
        for (idx, name) in CLASS_NAMES.iter().enumerate() {
            let count = self.class_counts[idx];
            let pct = if self.total_samples > 0 {
                100.0 * count as f64 / self.total_samples as f64
            } else {
                0.0
            };
            println!("  {:>12}: {:>6} ({:.1}%)", name, count, pct);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::TempDir;

    /// Write a tiny solid-color image dataset under a temp directory
    pub(crate) fn synthetic_split(images_per_class: usize) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (class, color) in [("organik", [30u8, 180, 40]), ("anorganik", [200, 50, 60])] {
            let class_dir = dir.path().join(class);
            std::fs::create_dir_all(&class_dir).unwrap();
            for i in 0..images_per_class {
                let img = RgbImage::from_pixel(16, 16, image::Rgb(color));
                img.save(class_dir.join(format!("img_{}.png", i))).unwrap();
            }
        }
        dir
    }

    #[test]
    fn test_load_synthetic_split() {
        let dir = synthetic_split(3);
        let dataset = WasteDataset::new(dir.path()).unwrap();

        assert_eq!(dataset.len(), 6);
        let stats = dataset.stats();
        assert_eq!(stats.class_counts, [3, 3]);
        assert_eq!(dataset.samples_by_class(0).len(), 3);
        assert_eq!(dataset.samples_by_class(1).len(), 3);
    }

    #[test]
    fn test_unknown_class_directory() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("plastics");
        std::fs::create_dir_all(&bad).unwrap();
        RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0]))
            .save(bad.join("x.png"))
            .unwrap();

        let result = WasteDataset::new(dir.path());
        assert!(matches!(result, Err(WasteError::Dataset(_))));
    }

    #[test]
    fn test_missing_directory() {
        let result = WasteDataset::new("/nonexistent/waste/data");
        assert!(matches!(result, Err(WasteError::PathNotFound(_))));
    }

    #[test]
    fn test_load_image_resizes() {
        let dir = synthetic_split(1);
        let dataset = WasteDataset::new(dir.path()).unwrap();
        let img = dataset.load_image(&dataset.samples[0], 32).unwrap();
        assert_eq!(img.width(), 32);
        assert_eq!(img.height(), 32);
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a.jpg")));
        assert!(is_image_file(Path::new("a.PNG")));
        assert!(!is_image_file(Path::new("a.txt")));
        assert!(!is_image_file(Path::new("a")));
    }
}
