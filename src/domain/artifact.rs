//! Persisted model and scaler artifacts.
//!
//! Artifacts are opaque outputs of an offline training pipeline,
//! exported as JSON. Beyond their input/output contract nothing about
//! their provenance is trusted: deserialization is followed by
//! structural sanity checks, and the predictor guards its own output.
//!
//! Cross-artifact dimensionality (model vs. scaler vs. schema) is NOT
//! checked here; the scaler transform and the predictor surface those
//! mismatches at use time, where both lengths are in hand.

use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::schema::FeatureVector;

/// Kind of fitted model, fixed at export time.
///
/// The kind decides the probability capability once at load time; it is
/// never re-probed per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Continuous output, no probability.
    LinearRegression,
    /// Binary classifier with a probability distribution over classes.
    LogisticRegression,
}

/// Validation metrics recorded by the training pipeline, if exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub f1_score: Option<f64>,
}

/// A previously fit predictive function, loaded once per process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Identifying name, as exported by training.
    pub name: String,
    pub kind: ModelKind,
    /// Expected input features, in fit order.
    pub feature_names: Vec<String>,
    /// One weight per feature, in `feature_names` order.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Class labels in class order (classifiers; index 1 is the
    /// positive class).
    #[serde(default)]
    pub class_labels: Vec<String>,
    /// Validation metrics from training, when present.
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
}

impl ModelArtifact {
    /// Expected input dimensionality.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.coefficients.len()
    }

    /// Whether this model produces a probability distribution.
    #[must_use]
    pub fn supports_probability(&self) -> bool {
        matches!(self.kind, ModelKind::LogisticRegression)
    }

    /// Structural sanity checks on the artifact itself.
    ///
    /// An artifact that fails these is unusable, which the store reports
    /// as corrupt.
    ///
    /// # Errors
    /// Returns a human-readable reason on the first inconsistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.is_empty() {
            return Err("model has no coefficients".to_string());
        }
        if self.feature_names.len() != self.coefficients.len() {
            return Err(format!(
                "feature_names length {} does not match coefficients length {}",
                self.feature_names.len(),
                self.coefficients.len()
            ));
        }
        for (i, &w) in self.coefficients.iter().enumerate() {
            if !w.is_finite() {
                return Err(format!("non-finite coefficient at index {i}: {w}"));
            }
        }
        if !self.intercept.is_finite() {
            return Err(format!("non-finite intercept: {}", self.intercept));
        }
        if matches!(self.kind, ModelKind::LogisticRegression) && self.class_labels.len() != 2 {
            return Err(format!(
                "logistic model requires 2 class labels, got {}",
                self.class_labels.len()
            ));
        }
        Ok(())
    }
}

/// A fitted standard scaler over the same feature order as its model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    /// Per-feature mean subtracted before division.
    pub mean: Vec<f64>,
    /// Per-feature standard deviation (divisor).
    pub scale: Vec<f64>,
}

impl ScalerArtifact {
    /// Expected input dimensionality.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    /// Structural sanity checks.
    ///
    /// # Errors
    /// Returns a human-readable reason on the first inconsistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "mean length {} does not match scale length {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        for (i, &s) in self.scale.iter().enumerate() {
            if !s.is_finite() || s == 0.0 {
                return Err(format!("unusable scale at index {i}: {s}"));
            }
        }
        for (i, &m) in self.mean.iter().enumerate() {
            if !m.is_finite() {
                return Err(format!("non-finite mean at index {i}: {m}"));
            }
        }
        Ok(())
    }

    fn apply(&self, vector: &FeatureVector) -> Result<FeatureVector, PipelineError> {
        if vector.len() != self.mean.len() {
            return Err(PipelineError::ScalingError {
                expected: self.mean.len(),
                got: vector.len(),
            });
        }

        let scaled = vector
            .as_slice()
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect();
        Ok(FeatureVector::new(scaled))
    }
}

/// Apply the optional scaler transform to a feature vector.
///
/// An absent scaler is the identity transform. This is the layer that
/// surfaces a schema mismatch between encoder and artifacts, since it
/// is the first to see both lengths.
///
/// # Errors
/// Returns `ScalingError` when the scaler's fitted length differs from
/// the vector length.
pub fn transform(
    vector: FeatureVector,
    scaler: Option<&ScalerArtifact>,
) -> Result<FeatureVector, PipelineError> {
    match scaler {
        None => Ok(vector),
        Some(scaler) => scaler.apply(&vector),
    }
}
