//! Background jobs for content-service.
pub mod expiry_reconciler;

pub use expiry_reconciler::{ExpiryReconcileJob, ReconcileReport};
