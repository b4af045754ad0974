//! Artifact store port: trait for model and scaler retrieval.
//!
//! This trait abstracts where artifacts come from, so the serving
//! pipeline can be exercised in tests against a fake store instead of
//! the filesystem.

use std::sync::Arc;

use crate::domain::{ModelArtifact, PipelineError, ScalerArtifact};

/// Process-wide access to the deployment's artifacts.
///
/// Implementations load lazily on first use, cache the loaded artifact
/// for the process lifetime, and share it read-only across all request
/// handlers. Both accessors are idempotent after their first success.
pub trait ArtifactStore: Send + Sync {
    /// Get the cached model, loading it on first use.
    ///
    /// # Errors
    /// Returns `ArtifactNotFound` if the backing file does not exist,
    /// `ArtifactCorrupt` if it cannot be deserialized into a usable
    /// artifact.
    fn get_model(&self) -> Result<Arc<ModelArtifact>, PipelineError>;

    /// Get the cached scaler, loading it on first use.
    ///
    /// `None` means this deployment has no scaler and feature vectors
    /// pass through unscaled.
    ///
    /// # Errors
    /// Same failure modes as `get_model` when a scaler path is
    /// configured.
    fn get_scaler(&self) -> Result<Option<Arc<ScalerArtifact>>, PipelineError>;
}
