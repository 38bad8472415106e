//! Agrégation et analytics des logs de sondes réseau multi-hôtes.
//!
//! Lecteurs tolérants -> chargement par hôte -> {dernier état, historique
//! fenêtré, analytics, bandes / santé mesh, rapports} -> API HTTP.

pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod history;
pub mod hosts;
pub mod http;
pub mod loader;
pub mod mesh;
pub mod models;
pub mod readers;
pub mod reports;
pub mod summary;
pub mod timestamp;

pub use config::KernelConfig;
pub use engine::Aggregator;
pub use error::{AggregatorError, Result};
