//! Quantized Export
//!
//! Converts a trained float checkpoint into the int8 artifact: every
//! convolution and head weight is quantized with a symmetric per-tensor
//! scheme, and the input/output are declared as uint8 tensors with a
//! 1/255 scale. An optional calibration pass measures the score divergence
//! introduced by quantization on representative training images.

use std::path::{Path, PathBuf};

use burn::prelude::*;
use colored::Colorize;
use tracing::{info, warn};

use crate::dataset::{WasteBatcher, WasteDataset, WasteItem, CLASS_NAMES, NUM_CLASSES};
use crate::model::{ModelConfig, WasteClassifier};
use crate::quant::artifact::{
    QuantizedArtifact, QuantizedTensor, TensorDtype, TensorSpec, ARTIFACT_VERSION,
};
use crate::quant::verify::rebuild_model;
use crate::training::load_checkpoint;
use crate::utils::error::{Result, WasteError};

/// Options for an export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Trained float checkpoint to convert
    pub checkpoint: PathBuf,
    /// Output path of the quantized artifact
    pub artifact_path: PathBuf,
    /// Optional directory of representative images for calibration
    pub calibration_dir: Option<PathBuf>,
    /// Number of calibration images sampled per class
    pub calibration_per_class: usize,
}

/// Read a tensor's shape and float values off the backend
fn tensor_values<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
) -> Result<(Vec<usize>, Vec<f32>)> {
    let shape = tensor.dims().to_vec();
    let values = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| WasteError::Model(format!("failed to read tensor data: {:?}", e)))?;
    Ok((shape, values))
}

fn quantize_param<B: Backend, const D: usize>(
    name: &str,
    tensor: Tensor<B, D>,
) -> Result<QuantizedTensor> {
    let (shape, values) = tensor_values(tensor)?;
    Ok(QuantizedTensor::quantize(name, shape, &values))
}

/// Quantize all learned parameters of the model
fn collect_tensors<B: Backend>(model: &WasteClassifier<B>) -> Result<Vec<QuantizedTensor>> {
    let blocks = [
        ("conv1", &model.conv1),
        ("conv2", &model.conv2),
        ("conv3", &model.conv3),
        ("conv4", &model.conv4),
    ];

    let mut tensors = Vec::with_capacity(blocks.len() * 2 + 2);

    for (name, block) in blocks {
        tensors.push(quantize_param(
            &format!("{}.weight", name),
            block.conv.weight.val(),
        )?);

        let bias = block.conv.bias.as_ref().ok_or_else(|| {
            WasteError::Model(format!("checkpoint has no bias for {}", name))
        })?;
        tensors.push(quantize_param(&format!("{}.bias", name), bias.val())?);
    }

    tensors.push(quantize_param("head.weight", model.head.weight.val())?);
    let head_bias = model
        .head
        .bias
        .as_ref()
        .ok_or_else(|| WasteError::Model("checkpoint has no head bias".to_string()))?;
    tensors.push(quantize_param("head.bias", head_bias.val())?);

    Ok(tensors)
}

/// Export a trained checkpoint as a quantized artifact.
///
/// When a calibration directory is given, the float and quantized models
/// are compared on up to `calibration_per_class` images per class and the
/// maximum score divergence is reported.
pub fn run_export<B: Backend>(
    options: &ExportOptions,
    model_config: &ModelConfig,
    device: &B::Device,
) -> Result<QuantizedArtifact> {
    println!("{}", "=== Exporting Quantized Model ===".bold().cyan());

    let model = load_checkpoint::<B>(model_config, &options.checkpoint, device)?;
    info!("Loaded checkpoint from {:?}", options.checkpoint);

    let tensors = collect_tensors(&model)?;

    let size = model_config.image_size;
    let artifact = QuantizedArtifact {
        version: ARTIFACT_VERSION,
        image_size: size,
        base_filters: model_config.base_filters,
        class_names: CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
        input: TensorSpec {
            dtype: TensorDtype::Uint8,
            shape: vec![1, 3, size, size],
            scale: 1.0 / 255.0,
            zero_point: 0,
        },
        output: TensorSpec {
            dtype: TensorDtype::Uint8,
            shape: vec![1, 1],
            scale: 1.0 / 255.0,
            zero_point: 0,
        },
        tensors,
    };

    match &options.calibration_dir {
        Some(dir) if dir.exists() => {
            calibrate(&model, &artifact, dir, options.calibration_per_class, size, device)?;
        }
        Some(dir) => {
            warn!("Calibration directory {:?} not found, skipping divergence check", dir);
        }
        None => {
            warn!("No calibration directory given, skipping divergence check");
        }
    }

    artifact.save(&options.artifact_path)?;

    let file_size = std::fs::metadata(&options.artifact_path)?.len();
    println!(
        "{}",
        format!(
            "Saved quantized artifact to {:?} ({:.1} KiB, {} tensors)",
            options.artifact_path,
            file_size as f64 / 1024.0,
            artifact.tensors.len()
        )
        .green()
    );

    Ok(artifact)
}

/// Compare float and quantized scores on representative images
fn calibrate<B: Backend>(
    float_model: &WasteClassifier<B>,
    artifact: &QuantizedArtifact,
    calibration_dir: &Path,
    per_class: usize,
    image_size: usize,
    device: &B::Device,
) -> Result<()> {
    let data = WasteDataset::new(calibration_dir)?;
    let quant_model = rebuild_model::<B>(artifact, device)?;
    let batcher = WasteBatcher::new(image_size);

    let mut max_divergence = 0.0f64;
    let mut num_images = 0usize;

    for class in 0..NUM_CLASSES {
        for sample in data.samples_by_class(class).into_iter().take(per_class) {
            let item = WasteItem::from_path(&sample.path, sample.label, image_size)?;
            let batch = batcher.batch::<B>(vec![item], device);

            let float_score = float_model
                .forward_score(batch.images.clone())
                .into_scalar()
                .elem::<f64>();
            let quant_score = quant_model
                .forward_score(batch.images)
                .into_scalar()
                .elem::<f64>();

            max_divergence = max_divergence.max((float_score - quant_score).abs());
            num_images += 1;
        }
    }

    info!(
        "Calibration over {} images: max score divergence {:.6}",
        num_images, max_divergence
    );
    println!(
        "Calibration: {} images, max score divergence {:.6}",
        num_images, max_divergence
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::record::CompactRecorder;
    use tempfile::TempDir;

    type TestBackend = burn::backend::NdArray;

    fn small_model_config() -> ModelConfig {
        ModelConfig {
            image_size: 32,
            in_channels: 3,
            base_filters: 4,
            dropout_rate: 0.2,
        }
    }

    fn saved_checkpoint(dir: &TempDir, config: &ModelConfig) -> PathBuf {
        let device = Default::default();
        let model = WasteClassifier::<TestBackend>::new(config, &device);
        let path = dir.path().join("checkpoint");
        model.save_file(path.clone(), &CompactRecorder::new()).unwrap();
        path
    }

    #[test]
    fn test_export_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let config = small_model_config();
        let checkpoint = saved_checkpoint(&dir, &config);
        let artifact_path = dir.path().join("quant.bin");

        let options = ExportOptions {
            checkpoint,
            artifact_path: artifact_path.clone(),
            calibration_dir: None,
            calibration_per_class: 0,
        };

        let device = Default::default();
        let artifact = run_export::<TestBackend>(&options, &config, &device).unwrap();

        assert!(artifact_path.exists());
        // 4 conv blocks and the head, each with weight and bias
        assert_eq!(artifact.tensors.len(), 10);
        assert_eq!(artifact.input.dtype, TensorDtype::Uint8);
        assert_eq!(artifact.input.shape, vec![1, 3, 32, 32]);
        assert!((artifact.input.scale - 1.0 / 255.0).abs() < 1e-9);

        let reloaded = QuantizedArtifact::load(&artifact_path).unwrap();
        assert_eq!(reloaded.tensors.len(), 10);
        let head = reloaded.tensor("head.weight").unwrap();
        assert_eq!(head.shape, vec![32, 1]);
    }

    #[test]
    fn test_export_missing_checkpoint() {
        let dir = TempDir::new().unwrap();
        let config = small_model_config();

        let options = ExportOptions {
            checkpoint: dir.path().join("missing"),
            artifact_path: dir.path().join("quant.bin"),
            calibration_dir: None,
            calibration_per_class: 0,
        };

        let device = Default::default();
        let result = run_export::<TestBackend>(&options, &config, &device);
        assert!(result.is_err());
    }
}
