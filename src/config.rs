//! Deployment configuration.
//!
//! Each deployment is a static schema plus artifact, template and
//! listening-port constants, selected by name at startup. Environment
//! variables override the preset paths; nothing else is configurable at
//! runtime.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{FeatureSchema, FieldSpec};

/// Default placeholder marker, as shipped in the deployment templates.
pub const DEFAULT_MARKER: &str = "<!-- Aquí aparecerá el resultado -->";

const DEFAULT_PORT: u16 = 8080;

/// Configuration errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown deployment '{0}' (expected salario, compra or pulmon)")]
    UnknownDeployment(String),

    #[error("Invalid port: '{0}'")]
    InvalidPort(String),
}

/// One deployment: its schema and its filesystem constants.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub name: &'static str,
    pub schema: FeatureSchema,
    pub model_path: PathBuf,
    pub scaler_path: Option<PathBuf>,
    pub template_path: PathBuf,
    /// Unique placeholder marker inside the template.
    pub marker: &'static str,
}

impl Deployment {
    /// Look up a built-in deployment preset by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "salario" => Some(Self::salario()),
            "compra" => Some(Self::compra()),
            "pulmon" => Some(Self::pulmon()),
            _ => None,
        }
    }

    /// Single-feature linear regression: years of experience → salary.
    #[must_use]
    pub fn salario() -> Self {
        Self {
            name: "salario",
            schema: FeatureSchema::new(vec![FieldSpec::numeric("anios")]),
            model_path: PathBuf::from("models/salario.json"),
            scaler_path: None,
            template_path: PathBuf::from("assets/salario.html"),
            marker: DEFAULT_MARKER,
        }
    }

    /// Two-feature logistic classifier: age + salary → purchase.
    #[must_use]
    pub fn compra() -> Self {
        Self {
            name: "compra",
            schema: FeatureSchema::new(vec![
                FieldSpec::numeric("edad"),
                FieldSpec::numeric("salario"),
            ]),
            model_path: PathBuf::from("models/compra.json"),
            scaler_path: Some(PathBuf::from("models/compra_scaler.json")),
            template_path: PathBuf::from("assets/compra.html"),
            marker: DEFAULT_MARKER,
        }
    }

    /// Fifteen-feature lung-cancer risk classifier.
    ///
    /// The two binary encodings differ on purpose: gender was fit as
    /// {0, 1}, the yes/no symptom fields as {1, 2}. Both copy the
    /// training pipeline of this deployment and neither is canonical.
    #[must_use]
    pub fn pulmon() -> Self {
        let si_no = || vec![("No", 1.0), ("Sí", 2.0)];
        Self {
            name: "pulmon",
            schema: FeatureSchema::new(vec![
                FieldSpec::categorical("gender", vec![("Femenino", 0.0), ("Masculino", 1.0)]),
                FieldSpec::numeric("age"),
                FieldSpec::categorical("smoking", si_no()),
                FieldSpec::categorical("yellow_fingers", si_no()),
                FieldSpec::categorical("anxiety", si_no()),
                FieldSpec::categorical("peer_pressure", si_no()),
                FieldSpec::categorical("chronic_disease", si_no()),
                FieldSpec::categorical("fatigue", si_no()),
                FieldSpec::categorical("allergy", si_no()),
                FieldSpec::categorical("wheezing", si_no()),
                FieldSpec::categorical("alcohol_consuming", si_no()),
                FieldSpec::categorical("coughing", si_no()),
                FieldSpec::categorical("shortness_of_breath", si_no()),
                FieldSpec::categorical("swallowing_difficulty", si_no()),
                FieldSpec::categorical("chest_pain", si_no()),
            ]),
            model_path: PathBuf::from("models/pulmon.json"),
            scaler_path: Some(PathBuf::from("models/pulmon_scaler.json")),
            template_path: PathBuf::from("assets/pulmon.html"),
            marker: DEFAULT_MARKER,
        }
    }
}

/// Runtime configuration: deployment plus listening port.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub deployment: Deployment,
}

impl Config {
    /// Build configuration from the environment.
    ///
    /// `INFERD_DEPLOYMENT` selects the preset (default `salario`);
    /// `INFERD_PORT`, `INFERD_MODEL_PATH`, `INFERD_SCALER_PATH` and
    /// `INFERD_TEMPLATE_PATH` override the deployment-time constants.
    ///
    /// # Errors
    /// Returns error on an unknown deployment name or unparseable port.
    pub fn from_env() -> Result<Self, ConfigError> {
        let name = std::env::var("INFERD_DEPLOYMENT").unwrap_or_else(|_| "salario".to_string());
        let mut deployment =
            Deployment::preset(&name).ok_or(ConfigError::UnknownDeployment(name))?;

        if let Ok(path) = std::env::var("INFERD_MODEL_PATH") {
            deployment.model_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("INFERD_SCALER_PATH") {
            deployment.scaler_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("INFERD_TEMPLATE_PATH") {
            deployment.template_path = PathBuf::from(path);
        }

        let port = match std::env::var("INFERD_PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self { port, deployment })
    }
}
