//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the integration with the outside world:
//! - `fs_store`: filesystem-backed artifact store with process caching
//! - `render`: HTML template substitution and result fragments

pub mod fs_store;
pub mod render;

pub use fs_store::FsArtifactStore;
