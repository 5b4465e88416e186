//! Quantized Model Verification
//!
//! Loads the int8 artifact, rebuilds a runnable model from its dequantized
//! weights and classifies images with it, honoring the artifact's declared
//! input and output dtypes. Only float32 and uint8 inputs are supported;
//! anything else is rejected with an error.

use std::path::{Path, PathBuf};

use burn::module::Param;
use burn::prelude::*;
use colored::Colorize;
use tracing::info;

use crate::dataset::WasteItem;
use crate::inference::{label_for_score, Prediction};
use crate::model::{ModelConfig, WasteClassifier};
use crate::quant::artifact::{QuantizedArtifact, QuantizedTensor, TensorDtype, TensorSpec};
use crate::utils::error::{Result, WasteError};

/// Result of verifying one image against the quantized model
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub path: PathBuf,
    pub prediction: Prediction,
}

/// Build a backend tensor from a quantized weight tensor
fn tensor_from<B: Backend, const D: usize>(
    qt: &QuantizedTensor,
    device: &B::Device,
) -> Result<Tensor<B, D>> {
    if qt.shape.len() != D {
        return Err(WasteError::Artifact(format!(
            "tensor '{}' has rank {} (expected {})",
            qt.name,
            qt.shape.len(),
            D
        )));
    }
    if qt.data.len() != qt.num_elements() {
        return Err(WasteError::Artifact(format!(
            "tensor '{}' holds {} values for shape {:?}",
            qt.name,
            qt.data.len(),
            qt.shape
        )));
    }

    let mut dims = [0usize; D];
    dims.copy_from_slice(&qt.shape);

    Ok(Tensor::from_floats(
        TensorData::new(qt.dequantize(), dims),
        device,
    ))
}

/// Rebuild a runnable classifier from the artifact's dequantized weights
pub fn rebuild_model<B: Backend>(
    artifact: &QuantizedArtifact,
    device: &B::Device,
) -> Result<WasteClassifier<B>> {
    let config = ModelConfig {
        image_size: artifact.image_size,
        base_filters: artifact.base_filters,
        ..Default::default()
    };
    let mut model = WasteClassifier::<B>::new(&config, device);

    {
        let blocks = [
            ("conv1", &mut model.conv1),
            ("conv2", &mut model.conv2),
            ("conv3", &mut model.conv3),
            ("conv4", &mut model.conv4),
        ];

        for (name, block) in blocks {
            let weight = tensor_from::<B, 4>(artifact.tensor(&format!("{}.weight", name))?, device)?;
            let bias = tensor_from::<B, 1>(artifact.tensor(&format!("{}.bias", name))?, device)?;
            block.conv.weight = Param::from_tensor(weight);
            block.conv.bias = Some(Param::from_tensor(bias));
        }
    }

    let head_weight = tensor_from::<B, 2>(artifact.tensor("head.weight")?, device)?;
    let head_bias = tensor_from::<B, 1>(artifact.tensor("head.bias")?, device)?;
    model.head.weight = Param::from_tensor(head_weight);
    model.head.bias = Some(Param::from_tensor(head_bias));

    Ok(model)
}

/// Check that the declared input dtype can be fed by this runtime
fn validate_input_dtype(spec: &TensorSpec) -> Result<()> {
    match spec.dtype {
        TensorDtype::Float32 | TensorDtype::Uint8 => Ok(()),
        other => Err(WasteError::UnsupportedDtype(format!(
            "unsupported input dtype: {}",
            other
        ))),
    }
}

/// Convert [0, 1] pixel data into the artifact's declared input encoding
fn preprocess_input(pixels: &[f32], spec: &TensorSpec) -> Result<Vec<f32>> {
    match spec.dtype {
        TensorDtype::Float32 => Ok(pixels.to_vec()),
        TensorDtype::Uint8 => {
            // Quantize to the uint8 grid, then apply the declared scale
            Ok(pixels
                .iter()
                .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) * spec.scale)
                .collect())
        }
        other => Err(WasteError::UnsupportedDtype(format!(
            "unsupported input dtype: {}",
            other
        ))),
    }
}

/// Apply the declared output encoding to a raw sigmoid score
fn postprocess_score(score: f64, spec: &TensorSpec) -> f64 {
    match spec.dtype {
        TensorDtype::Uint8 => {
            let q = (score / spec.scale as f64).round().clamp(0.0, 255.0);
            q * spec.scale as f64
        }
        _ => score,
    }
}

/// Classify one image file with the quantized model
pub fn classify_with_artifact<B: Backend>(
    model: &WasteClassifier<B>,
    artifact: &QuantizedArtifact,
    path: &Path,
    device: &B::Device,
) -> Result<Prediction> {
    let size = artifact.image_size;
    let item = WasteItem::from_path(path, 0, size)?;
    let data = preprocess_input(&item.image, &artifact.input)?;

    let images = Tensor::<B, 4>::from_floats(TensorData::new(data, [1, 3, size, size]), device);
    let raw_score = model.forward_score(images).into_scalar().elem::<f64>();
    let score = postprocess_score(raw_score, &artifact.output);

    let (class_index, label) = label_for_score(score);

    Ok(Prediction {
        score,
        class_index,
        label: label.to_string(),
    })
}

/// Verify a quantized artifact by classifying the given images.
///
/// Prints one line per image and returns the outcomes.
pub fn run_verify<B: Backend>(
    artifact_path: &Path,
    images: &[PathBuf],
    device: &B::Device,
) -> Result<Vec<VerifyOutcome>> {
    println!("{}", "=== Verifying Quantized Model ===".bold().cyan());

    let artifact = QuantizedArtifact::load(artifact_path)?;
    validate_input_dtype(&artifact.input)?;
    info!(
        "Loaded artifact: input {} {:?}, output {} {:?}",
        artifact.input.dtype, artifact.input.shape, artifact.output.dtype, artifact.output.shape
    );

    let model = rebuild_model::<B>(&artifact, device)?;

    let mut outcomes = Vec::with_capacity(images.len());
    for path in images {
        let prediction = classify_with_artifact(&model, &artifact, path, device)?;

        let label = if prediction.class_index == 0 {
            prediction.label.green()
        } else {
            prediction.label.yellow()
        };
        println!("{:?}: {} | score {:.4}", path, label.bold(), prediction.score);

        outcomes.push(VerifyOutcome {
            path: path.clone(),
            prediction,
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quant::artifact::ARTIFACT_VERSION;
    use crate::quant::export::{run_export, ExportOptions};
    use burn::record::CompactRecorder;
    use image::RgbImage;
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

    fn exported_artifact(dir: &TempDir) -> (PathBuf, WasteClassifier<TestBackend>) {
        let config = small_model_config();
        let device = Default::default();
        let model = WasteClassifier::<TestBackend>::new(&config, &device);

        let checkpoint = dir.path().join("checkpoint");
        model
            .clone()
            .save_file(checkpoint.clone(), &CompactRecorder::new())
            .unwrap();

        let artifact_path = dir.path().join("quant.bin");
        let options = ExportOptions {
            checkpoint,
            artifact_path: artifact_path.clone(),
            calibration_dir: None,
            calibration_per_class: 0,
        };
        run_export::<TestBackend>(&options, &config, &device).unwrap();

        (artifact_path, model)
    }

    fn test_image(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("sample.png");
        RgbImage::from_fn(16, 16, |x, y| image::Rgb([(x * 10) as u8, (y * 10) as u8, 128]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_rebuilt_model_close_to_float() {
        let dir = TempDir::new().unwrap();
        let (artifact_path, float_model) = exported_artifact(&dir);
        let image = test_image(&dir);

        let device = Default::default();
        let artifact = QuantizedArtifact::load(&artifact_path).unwrap();
        let quant_model = rebuild_model::<TestBackend>(&artifact, &device).unwrap();

        let float_pred =
            crate::inference::predict_image(&float_model, &image, 32, &device).unwrap();
        let quant_pred =
            classify_with_artifact(&quant_model, &artifact, &image, &device).unwrap();

        assert!((0.0..=1.0).contains(&quant_pred.score));
        // Quantization of a freshly initialized model should barely move the score
        assert!((float_pred.score - quant_pred.score).abs() < 0.1);
    }

    #[test]
    fn test_run_verify_outcomes() {
        let dir = TempDir::new().unwrap();
        let (artifact_path, _) = exported_artifact(&dir);
        let image = test_image(&dir);

        let device = Default::default();
        let outcomes =
            run_verify::<TestBackend>(&artifact_path, &[image.clone()], &device).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].path, image);
        let p = &outcomes[0].prediction;
        assert!(p.label == "organik" || p.label == "anorganik");
        assert_eq!(usize::from(p.score >= 0.5), p.class_index);
    }

    #[test]
    fn test_unsupported_input_dtype() {
        let dir = TempDir::new().unwrap();
        let (artifact_path, _) = exported_artifact(&dir);

        // Rewrite the artifact with an int8 input declaration
        let mut artifact = QuantizedArtifact::load(&artifact_path).unwrap();
        artifact.input.dtype = TensorDtype::Int8;
        assert_eq!(artifact.version, ARTIFACT_VERSION);
        let bad_path = dir.path().join("bad.bin");
        artifact.save(&bad_path).unwrap();

        let device = Default::default();
        let result = run_verify::<TestBackend>(&bad_path, &[], &device);
        assert!(matches!(result, Err(WasteError::UnsupportedDtype(_))));
    }

    #[test]
    fn test_uint8_output_rounds_score() {
        let spec = TensorSpec {
            dtype: TensorDtype::Uint8,
            shape: vec![1, 1],
            scale: 1.0 / 255.0,
            zero_point: 0,
        };

        let rounded = postprocess_score(0.5001, &spec);
        // Snapped to the nearest multiple of 1/255
        assert!((rounded - (0.5001f64 * 255.0).round() / 255.0).abs() < 1e-9);

        let float_spec = TensorSpec {
            dtype: TensorDtype::Float32,
            shape: vec![1, 1],
            scale: 1.0,
            zero_point: 0,
        };
        assert_eq!(postprocess_score(0.5001, &float_spec), 0.5001);
    }

    #[test]
    fn test_uint8_input_matches_float_for_file_pixels() {
        // Pixels loaded from disk already sit on the uint8 grid, so the
        // uint8 encoding must reproduce them exactly
        let spec = TensorSpec {
            dtype: TensorDtype::Uint8,
            shape: vec![1, 3, 2, 2],
            scale: 1.0 / 255.0,
            zero_point: 0,
        };
        let pixels = [0.0f32, 17.0 / 255.0, 128.0 / 255.0, 1.0];
        let encoded = preprocess_input(&pixels, &spec).unwrap();
        for (a, b) in pixels.iter().zip(encoded.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
