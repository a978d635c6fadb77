//! Catalog synchronization service.
//!
//! Reconciles the local catalog with the upstream source under an
//! exclusivity guarantee: at most one update or drop is in flight, enforced
//! with an atomic compare-and-set, with no queueing of rejected attempts.

mod service;
mod types;

pub use service::UpdateService;
pub use types::*;
