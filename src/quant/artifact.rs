//! Quantized Model Artifact
//!
//! The on-disk format for the int8-quantized classifier: a versioned
//! bincode container holding per-tensor symmetric int8 weights plus the
//! declared input/output tensor specifications.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, WasteError};

/// Current artifact format version
pub const ARTIFACT_VERSION: u32 = 1;

/// Element type of a declared model input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorDtype {
    Float32,
    Uint8,
    Int8,
}

impl std::fmt::Display for TensorDtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TensorDtype::Float32 => "float32",
            TensorDtype::Uint8 => "uint8",
            TensorDtype::Int8 => "int8",
        };
        write!(f, "{}", name)
    }
}

/// Declared specification of a model input or output tensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorSpec {
    pub dtype: TensorDtype,
    pub shape: Vec<usize>,
    /// Quantization scale (dequantized = quantized * scale)
    pub scale: f32,
    pub zero_point: i32,
}

/// A weight tensor stored as symmetric per-tensor int8
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantizedTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub scale: f32,
    pub data: Vec<i8>,
}

impl QuantizedTensor {
    /// Quantize float values with a symmetric per-tensor scheme.
    ///
    /// The scale maps the largest absolute value onto 127; an all-zero
    /// tensor gets a scale of 1.
    pub fn quantize(name: &str, shape: Vec<usize>, values: &[f32]) -> Self {
        let max_abs = values.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
        let scale = if max_abs > 0.0 { max_abs / 127.0 } else { 1.0 };

        let data = values
            .iter()
            .map(|&v| (v / scale).round().clamp(-127.0, 127.0) as i8)
            .collect();

        Self {
            name: name.to_string(),
            shape,
            scale,
            data,
        }
    }

    /// Recover the float values
    pub fn dequantize(&self) -> Vec<f32> {
        self.data.iter().map(|&q| q as f32 * self.scale).collect()
    }

    /// Number of elements implied by the shape
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

/// The complete quantized model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantizedArtifact {
    pub version: u32,
    /// Input image size the model was trained at
    pub image_size: usize,
    /// Base filter count of the backbone
    pub base_filters: usize,
    /// Class names ordered by index
    pub class_names: Vec<String>,
    /// Declared input tensor
    pub input: TensorSpec,
    /// Declared output tensor
    pub output: TensorSpec,
    /// Quantized weight tensors
    pub tensors: Vec<QuantizedTensor>,
}

impl QuantizedArtifact {
    /// Look up a weight tensor by name
    pub fn tensor(&self, name: &str) -> Result<&QuantizedTensor> {
        self.tensors
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| WasteError::Artifact(format!("missing tensor '{}'", name)))
    }

    /// Serialize the artifact to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| WasteError::Artifact(format!("serialization failed: {}", e)))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load an artifact from disk, checking the format version
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WasteError::PathNotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path)?;
        let artifact: Self = bincode::deserialize(&bytes)
            .map_err(|e| WasteError::Artifact(format!("deserialization failed: {}", e)))?;

        if artifact.version != ARTIFACT_VERSION {
            return Err(WasteError::Artifact(format!(
                "unsupported artifact version {} (expected {})",
                artifact.version, ARTIFACT_VERSION
            )));
        }

        Ok(artifact)
    }
}
