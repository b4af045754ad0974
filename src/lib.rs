//! # inferd
//!
//! Synchronous HTTP serving of frozen statistical prediction models.
//!
//! This crate provides:
//! - A raw HTTP request router with worker-per-connection concurrency
//! - Process-wide cached loading of model and scaler artifacts
//! - Ordered feature encoding with per-deployment schemas
//! - HTML template rendering with in-page error reporting
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (schema, artifacts, predictor, errors)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (filesystem store, renderer)
//! - `application`: Use cases orchestrating domain and ports
//! - `server`: Raw HTTP front end
//! - `config`: Deployment presets and environment overrides

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod server;

pub use domain::{PipelineError, PredictionResult};

/// Result type for inferd operations.
pub type Result<T> = std::result::Result<T, InferdError>;

/// Top-level error type for the binary's bootstrap path.
///
/// Pipeline errors never reach this level during serving; the router
/// converts them to in-page fragments. This type covers the failures
/// that legitimately stop the process: bad configuration and an
/// unbindable socket.
#[derive(Debug, thiserror::Error)]
pub enum InferdError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] domain::PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
