//! Feature schema: ordered field specifications and request encoding.
//!
//! Each deployment fixes an ordered list of fields with a parse rule per
//! field. Encoding maps the raw string fields of one request into a
//! numeric vector in exactly that order, which must match the order the
//! model artifact was fit on.

use std::collections::BTreeMap;

use super::error::PipelineError;

/// An ordered numeric feature vector, built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// How a raw field value is turned into a number.
#[derive(Debug, Clone)]
pub enum ParseRule {
    /// Parse the value as a floating-point number.
    Numeric,
    /// Map a small fixed set of accepted tokens to numeric codes.
    ///
    /// The two binary encodings seen across deployments are
    /// `{negative→0, affirmative→1}` and `{negative→1, affirmative→2}`.
    /// The codes are deployment configuration, not a universal constant,
    /// so each field carries its own token table.
    Categorical(Vec<(&'static str, f64)>),
}

/// One field of a deployment schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Form field name as submitted by the client.
    pub name: &'static str,
    /// Parse rule for the raw string value.
    pub rule: ParseRule,
    /// Value used when the field is absent. `None` makes the field
    /// required: a missing required field is a hard failure, never a
    /// silent zero-fill.
    pub default: Option<f64>,
}

impl FieldSpec {
    /// A required numeric field.
    #[must_use]
    pub fn numeric(name: &'static str) -> Self {
        Self {
            name,
            rule: ParseRule::Numeric,
            default: None,
        }
    }

    /// A required categorical field with its token table.
    #[must_use]
    pub fn categorical(name: &'static str, tokens: Vec<(&'static str, f64)>) -> Self {
        Self {
            name,
            rule: ParseRule::Categorical(tokens),
            default: None,
        }
    }

    fn parse(&self, raw: &str) -> Result<f64, PipelineError> {
        match &self.rule {
            ParseRule::Numeric => raw.trim().parse::<f64>().map_err(|_| {
                PipelineError::InvalidFeatureValue {
                    field: self.name.to_string(),
                    reason: format!("not a number: '{raw}'"),
                }
            }),
            ParseRule::Categorical(tokens) => tokens
                .iter()
                .find(|(token, _)| *token == raw.trim())
                .map(|(_, code)| *code)
                .ok_or_else(|| PipelineError::InvalidFeatureValue {
                    field: self.name.to_string(),
                    reason: format!("unrecognized value: '{raw}'"),
                }),
        }
    }
}

/// Ordered per-deployment feature schema.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    fields: Vec<FieldSpec>,
}

impl FeatureSchema {
    #[must_use]
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Number of features this schema produces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in schema order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Encode raw request fields into a feature vector in schema order.
    ///
    /// # Errors
    /// Returns `InvalidFeatureValue` when a required field is missing or
    /// a value cannot be parsed under its rule.
    pub fn encode(&self, raw_fields: &BTreeMap<String, String>) -> Result<FeatureVector, PipelineError> {
        let mut values = Vec::with_capacity(self.fields.len());

        for field in &self.fields {
            let value = match raw_fields.get(field.name) {
                Some(raw) => field.parse(raw)?,
                None => field.default.ok_or_else(|| PipelineError::InvalidFeatureValue {
                    field: field.name.to_string(),
                    reason: "missing required field".to_string(),
                })?,
            };
            values.push(value);
        }

        Ok(FeatureVector::new(values))
    }
}
