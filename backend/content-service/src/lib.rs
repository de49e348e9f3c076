/// Content Service Library
///
/// Handles ephemeral posts and stories for the Ephora platform. Every record
/// carries an absolute expiry stamped from the server clock and drops out of
/// every read once that instant passes; stories also keep a viewer ledger.
///
/// # Modules
///
/// - `clock`: Injected time source
/// - `handlers`: Content-related HTTP request handlers
/// - `models`: Data structures for posts, stories and profiles
/// - `services`: Expiry policy, visibility filters and the content services
/// - `db`: Storage seam with PostgreSQL and in-memory implementations
/// - `jobs`: Optional expiry flag reconciler
/// - `middleware`: Gateway identity and request metrics
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Observability and metrics collection
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
