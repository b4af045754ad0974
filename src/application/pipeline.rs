//! Prediction service: orchestrates the per-request pipeline.
//!
//! Steps run strictly in order (encode, scale, predict), each a
//! blocking synchronous call. Artifacts come from the store port, so
//! tests can drive the pipeline against a fake store.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{predict, transform, FeatureSchema, PipelineError, PredictionResult};
use crate::ports::ArtifactStore;

/// Service for running one prediction over submitted form fields.
pub struct PredictService<S: ArtifactStore> {
    store: Arc<S>,
    schema: FeatureSchema,
}

impl<S: ArtifactStore> PredictService<S> {
    /// Create a new prediction service.
    #[must_use]
    pub fn new(store: Arc<S>, schema: FeatureSchema) -> Self {
        Self { store, schema }
    }

    /// Run the full pipeline for one request's raw fields.
    ///
    /// # Errors
    /// Propagates every pipeline error unchanged; conversion to a
    /// display fragment happens at the router boundary, not here.
    pub fn run(&self, raw_fields: &BTreeMap<String, String>) -> Result<PredictionResult, PipelineError> {
        let vector = self.schema.encode(raw_fields)?;
        tracing::debug!("Encoded {} features", vector.len());

        let scaler = self.store.get_scaler()?;
        let vector = transform(vector, scaler.as_deref())?;

        let model = self.store.get_model()?;
        let result = predict(&model, &vector)?;

        tracing::debug!(
            "Prediction complete: label={:?}, probability={}",
            result.label,
            result.probability.is_some()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        FieldSpec, ModelArtifact, ModelKind, PredictedLabel, ScalerArtifact,
    };

    /// In-memory store standing in for the filesystem.
    struct FakeStore {
        model: Arc<ModelArtifact>,
        scaler: Option<Arc<ScalerArtifact>>,
    }

    impl ArtifactStore for FakeStore {
        fn get_model(&self) -> Result<Arc<ModelArtifact>, PipelineError> {
            Ok(Arc::clone(&self.model))
        }

        fn get_scaler(&self) -> Result<Option<Arc<ScalerArtifact>>, PipelineError> {
            Ok(self.scaler.clone())
        }
    }

    fn purchase_service() -> PredictService<FakeStore> {
        let model = ModelArtifact {
            name: "modelo_compra".into(),
            kind: ModelKind::LogisticRegression,
            feature_names: vec!["edad".into(), "salario".into()],
            coefficients: vec![0.02, 0.00001],
            intercept: -2.0,
            class_labels: vec!["No compraría".into(), "Compraría".into()],
            metrics: None,
        };
        let store = FakeStore {
            model: Arc::new(model),
            scaler: Some(Arc::new(ScalerArtifact {
                mean: vec![0.0, 0.0],
                scale: vec![1.0, 1.0],
            })),
        };
        let schema = FeatureSchema::new(vec![
            FieldSpec::numeric("edad"),
            FieldSpec::numeric("salario"),
        ]);
        PredictService::new(Arc::new(store), schema)
    }

    fn fields_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_well_formed_input_yields_declared_label() {
        let service = purchase_service();
        let result = service
            .run(&fields_of(&[("edad", "30"), ("salario", "50000.0")]))
            .expect("Should predict");

        match result.label {
            PredictedLabel::Class(label) => {
                assert!(label == "No compraría" || label == "Compraría");
            }
            other => panic!("Expected class label, got {other:?}"),
        }
        let dist = result.probability.expect("Classifier has probability");
        let total: f64 = dist.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_field_stops_before_artifacts() {
        let service = purchase_service();
        let err = service
            .run(&fields_of(&[("edad", "30")]))
            .expect_err("Should fail");
        assert!(matches!(err, PipelineError::InvalidFeatureValue { .. }));
    }

    #[test]
    fn test_schema_artifact_mismatch_surfaces_as_scaling_error() {
        // A three-field schema against two-feature artifacts: neither
        // encoder nor store can see the mismatch alone, the scaler can.
        let service = purchase_service();
        let wide_schema = FeatureSchema::new(vec![
            FieldSpec::numeric("edad"),
            FieldSpec::numeric("salario"),
            FieldSpec::numeric("extra"),
        ]);
        let service = PredictService::new(Arc::clone(&service.store), wide_schema);

        let err = service
            .run(&fields_of(&[
                ("edad", "30"),
                ("salario", "50000.0"),
                ("extra", "1"),
            ]))
            .expect_err("Should fail");
        assert!(matches!(err, PipelineError::ScalingError { .. }));
    }
}
