//! Quantization module: int8 export and artifact verification

pub mod artifact;
pub mod export;
pub mod verify;

pub use artifact::{QuantizedArtifact, QuantizedTensor, TensorDtype, TensorSpec, ARTIFACT_VERSION};
pub use export::{run_export, ExportOptions};
pub use verify::{classify_with_artifact, rebuild_model, run_verify, VerifyOutcome};
