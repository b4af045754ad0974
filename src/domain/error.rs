//! Pipeline error taxonomy.
//!
//! Every failure inside the request pipeline is a typed value from this
//! enum. Errors flow through the steps as `Result`s and are converted to
//! a display fragment only at the router boundary; nothing here ever
//! terminates a connection or the process.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the prediction pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The artifact file does not exist at the configured path.
    ///
    /// The path is included: it is the one piece of filesystem detail an
    /// operator needs to fix the deployment.
    #[error("Artifact not found: {path}")]
    ArtifactNotFound { path: PathBuf },

    /// The artifact file exists but its bytes do not deserialize into a
    /// usable artifact.
    #[error("Artifact is corrupt ({name}): {reason}")]
    ArtifactCorrupt { name: String, reason: String },

    /// A submitted field is missing or cannot be parsed under its rule.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidFeatureValue { field: String, reason: String },

    /// The scaler was fit on a different number of features than the
    /// vector it was asked to transform.
    #[error("Scaler expects {expected} features, got {got}")]
    ScalingError { expected: usize, got: usize },

    /// The model rejected its input, or produced an unusable output.
    #[error("Prediction failed: {0}")]
    PredictionError(String),

    /// The template does not contain its placeholder marker.
    #[error("Template placeholder '{marker}' not found")]
    TemplateError { marker: String },
}

impl PipelineError {
    /// Whether this error indicates a broken deployment rather than bad
    /// user input.
    ///
    /// Deployment faults are logged at error severity every time they
    /// occur; routine input errors must never be logged as faults.
    #[must_use]
    pub fn is_deployment_fault(&self) -> bool {
        matches!(
            self,
            Self::ArtifactNotFound { .. }
                | Self::ArtifactCorrupt { .. }
                | Self::TemplateError { .. }
        )
    }
}
