//! Predictor: runs the cached model on a (possibly scaled) feature
//! vector.
//!
//! Produces a discrete label and, when the model supports it, a full
//! probability distribution over classes. A model that does not support
//! probabilities yields an absent distribution, never a fabricated one.

use super::artifact::{ModelArtifact, ModelKind};
use super::error::PipelineError;
use super::schema::FeatureVector;

/// The discrete outcome of one prediction.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictedLabel {
    /// Continuous regression output.
    Value(f64),
    /// Class label of a classifier.
    Class(String),
}

/// Per-request prediction output, consumed immediately by the renderer.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub label: PredictedLabel,
    /// Mapping from every class label to its probability, in class
    /// order, summing to 1. Absent when the model kind does not
    /// support probabilities.
    pub probability: Option<Vec<(String, f64)>>,
}

impl PredictionResult {
    /// Probability of the positive class (index 1), when available.
    #[must_use]
    pub fn positive_probability(&self) -> Option<f64> {
        self.probability
            .as_ref()
            .and_then(|dist| dist.get(1).map(|(_, p)| *p))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn linear_score(model: &ModelArtifact, vector: &FeatureVector) -> f64 {
    model
        .coefficients
        .iter()
        .zip(vector.as_slice())
        .map(|(w, x)| w * x)
        .sum::<f64>()
        + model.intercept
}

/// Run the model on a feature vector.
///
/// The encoder and scaler contracts make a shape mismatch here
/// unreachable in a consistent deployment, but the model is an opaque
/// artifact of unknown provenance, so the check stays.
///
/// # Errors
/// Returns `PredictionError` if the model rejects the input shape or
/// produces a non-finite result.
pub fn predict(
    model: &ModelArtifact,
    vector: &FeatureVector,
) -> Result<PredictionResult, PipelineError> {
    if vector.len() != model.input_dim() {
        return Err(PipelineError::PredictionError(format!(
            "model '{}' expects {} features, got {}",
            model.name,
            model.input_dim(),
            vector.len()
        )));
    }

    let score = linear_score(model, vector);
    if !score.is_finite() {
        return Err(PipelineError::PredictionError(
            "model produced a non-finite score".to_string(),
        ));
    }

    match model.kind {
        ModelKind::LinearRegression => Ok(PredictionResult {
            label: PredictedLabel::Value(score),
            probability: None,
        }),
        ModelKind::LogisticRegression => {
            if model.class_labels.len() != 2 {
                return Err(PipelineError::PredictionError(format!(
                    "model '{}' declares {} class labels, expected 2",
                    model.name,
                    model.class_labels.len()
                )));
            }

            let positive = sigmoid(score);
            let class = usize::from(positive >= 0.5);
            let probability = vec![
                (model.class_labels[0].clone(), 1.0 - positive),
                (model.class_labels[1].clone(), positive),
            ];

            Ok(PredictionResult {
                label: PredictedLabel::Class(model.class_labels[class].clone()),
                probability: Some(probability),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salary_model() -> ModelArtifact {
        ModelArtifact {
            name: "modelo_salario".into(),
            kind: ModelKind::LinearRegression,
            feature_names: vec!["anios".into()],
            coefficients: vec![5000.0],
            intercept: 20000.0,
            class_labels: vec![],
            metrics: None,
        }
    }

    fn purchase_model() -> ModelArtifact {
        ModelArtifact {
            name: "modelo_compra".into(),
            kind: ModelKind::LogisticRegression,
            feature_names: vec!["edad".into(), "salario".into()],
            coefficients: vec![0.0, 0.0],
            // sigmoid of this intercept is 0.3: the model always answers
            // [0.7, 0.3] regardless of input.
            intercept: -0.847_297_860_387_203_4,
            class_labels: vec!["No compraría".into(), "Compraría".into()],
            metrics: None,
        }
    }

    #[test]
    fn test_linear_regression_value() {
        let model = salary_model();
        let vector = FeatureVector::new(vec![5.0]);

        let result = predict(&model, &vector).expect("Should predict");
        assert_eq!(result.label, PredictedLabel::Value(45000.0));
        // Regression never fabricates a probability.
        assert!(result.probability.is_none());
        assert!(result.positive_probability().is_none());
    }

    #[test]
    fn test_logistic_probability_distribution() {
        let model = purchase_model();
        let vector = FeatureVector::new(vec![30.0, 50000.0]);

        let result = predict(&model, &vector).expect("Should predict");
        assert_eq!(result.label, PredictedLabel::Class("No compraría".into()));

        let dist = result.probability.as_ref().expect("Should have probability");
        assert_eq!(dist.len(), 2);
        assert!((dist[0].1 - 0.7).abs() < 1e-9);
        assert!((dist[1].1 - 0.3).abs() < 1e-9);
        assert!((dist[0].1 + dist[1].1 - 1.0).abs() < 1e-12);

        assert!((result.positive_probability().expect("positive") - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_label_is_a_declared_class() {
        let model = purchase_model();
        let vector = FeatureVector::new(vec![1.0, 2.0]);

        let result = predict(&model, &vector).expect("Should predict");
        match result.label {
            PredictedLabel::Class(label) => assert!(model.class_labels.contains(&label)),
            other => panic!("Expected class label, got {other:?}"),
        }
    }

    #[test]
    fn test_shape_mismatch_is_prediction_error() {
        let model = salary_model();
        let vector = FeatureVector::new(vec![5.0, 1.0]);

        let err = predict(&model, &vector).expect_err("Should fail");
        assert!(matches!(err, PipelineError::PredictionError(_)));
    }

    #[test]
    fn test_non_finite_score_is_caught() {
        let mut model = salary_model();
        model.intercept = f64::MAX;
        model.coefficients = vec![f64::MAX];
        let vector = FeatureVector::new(vec![f64::MAX]);

        let err = predict(&model, &vector).expect_err("Should fail");
        match err {
            PipelineError::PredictionError(reason) => assert!(reason.contains("non-finite")),
            other => panic!("Expected PredictionError, got {other:?}"),
        }
    }
}
