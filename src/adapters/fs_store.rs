//! Filesystem artifact store: lazy, process-wide cached artifact
//! loading.
//!
//! Artifacts are read from deployment-configured paths on first use and
//! cached behind a mutex, so concurrent first requests observe exactly
//! one disk read and share the same artifact thereafter. A cached
//! artifact is never reloaded within the process lifetime; replacing
//! the file on disk requires a restart. A *failed* load is not cached,
//! so a fixed deployment recovers on the next request.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::domain::{ModelArtifact, PipelineError, ScalerArtifact};
use crate::ports::ArtifactStore;

fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Artifact store backed by JSON files on disk.
pub struct FsArtifactStore {
    model_path: PathBuf,
    scaler_path: Option<PathBuf>,
    model: Mutex<Option<Arc<ModelArtifact>>>,
    scaler: Mutex<Option<Arc<ScalerArtifact>>>,
    disk_reads: AtomicUsize,
}

impl FsArtifactStore {
    /// Create a store for the given artifact paths.
    ///
    /// Nothing is read until first use; a slow load lands on the first
    /// request, not on startup.
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>, scaler_path: Option<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            scaler_path,
            model: Mutex::new(None),
            scaler: Mutex::new(None),
            disk_reads: AtomicUsize::new(0),
        }
    }

    /// Number of times the backing files have actually been read.
    ///
    /// Diagnostics: after warmup this stays at one read per configured
    /// artifact for the process lifetime.
    #[must_use]
    pub fn disk_reads(&self) -> usize {
        self.disk_reads.load(Ordering::Relaxed)
    }

    fn read_artifact<T, F>(&self, path: &Path, validate: F) -> Result<(T, String), PipelineError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Result<(), String>,
    {
        if !path.exists() {
            return Err(PipelineError::ArtifactNotFound {
                path: path.to_path_buf(),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.disk_reads.fetch_add(1, Ordering::Relaxed);
        let bytes = std::fs::read(path).map_err(|e| PipelineError::ArtifactCorrupt {
            name: name.clone(),
            reason: format!("read failed: {e}"),
        })?;

        let artifact: T =
            serde_json::from_slice(&bytes).map_err(|e| PipelineError::ArtifactCorrupt {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        validate(&artifact).map_err(|reason| PipelineError::ArtifactCorrupt {
            name: name.clone(),
            reason,
        })?;

        Ok((artifact, sha256_hex_bytes(&bytes)))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn get_model(&self) -> Result<Arc<ModelArtifact>, PipelineError> {
        // The lock is held across the load so racing first requests
        // perform at most one read and all observe the same artifact.
        // A poisoned lock is recoverable: the cache is either still
        // empty or holds a fully loaded artifact.
        let mut cached = self
            .model
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(model) = cached.as_ref() {
            return Ok(Arc::clone(model));
        }

        let (model, fingerprint) =
            self.read_artifact::<ModelArtifact, _>(&self.model_path, ModelArtifact::validate)?;

        tracing::info!(
            "Loaded model '{}' (kind={:?}, n_features={}, sha256={}, at={})",
            model.name,
            model.kind,
            model.input_dim(),
            fingerprint,
            chrono::Utc::now().to_rfc3339()
        );
        if let Some(metrics) = &model.metrics {
            tracing::info!(
                "Model '{}' training metrics: accuracy={:?}, f1={:?}",
                model.name,
                metrics.accuracy,
                metrics.f1_score
            );
        }

        let model = Arc::new(model);
        *cached = Some(Arc::clone(&model));
        Ok(model)
    }

    fn get_scaler(&self) -> Result<Option<Arc<ScalerArtifact>>, PipelineError> {
        let Some(path) = self.scaler_path.as_ref() else {
            return Ok(None);
        };

        let mut cached = self
            .scaler
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(scaler) = cached.as_ref() {
            return Ok(Some(Arc::clone(scaler)));
        }

        let (scaler, fingerprint) =
            self.read_artifact::<ScalerArtifact, _>(path, ScalerArtifact::validate)?;
        tracing::info!(
            "Loaded scaler (n_features={}, sha256={})",
            scaler.input_dim(),
            fingerprint
        );

        let scaler = Arc::new(scaler);
        *cached = Some(Arc::clone(&scaler));
        Ok(Some(scaler))
    }
}
