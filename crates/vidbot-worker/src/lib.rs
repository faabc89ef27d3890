//! Preparation worker.
//!
//! Takes a chosen candidate to a delivered, recorded artifact:
//! - [`AdmissionGate`]: at most one in-flight job per dedup key
//! - [`PreparationExecutor`]: detached jobs under a concurrency ceiling,
//!   with panics converted into a failure notification
//! - [`Preparer`]: pre-flight checks, ladder fetch, delivery, library record
//! - Local collaborators used by the binaries

pub mod admission;
pub mod collaborators;
pub mod config;
pub mod delivery;
pub mod error;
pub mod executor;
pub mod library;
pub mod logging;
pub mod metrics;
pub mod notifier;
pub mod prepare;

#[cfg(test)]
mod executor_tests;

pub use admission::{AdmissionGate, AdmissionGuard};
pub use collaborators::{Delivery, MediaLibrary, Notifier};
pub use config::WorkerConfig;
pub use delivery::OutboxDelivery;
pub use error::{WorkerError, WorkerResult};
pub use executor::PreparationExecutor;
pub use library::{JsonlLibrary, LibraryEntry};
pub use logging::JobLogger;
pub use notifier::LogNotifier;
pub use prepare::Preparer;
