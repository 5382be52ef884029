//! Service Module
//!
//! Business logic layer for the API server.
//! Each step of the upload path lives in its own module and is invoked in
//! order by the handlers: ingest, resolve scope, authorize, create.

pub mod authorization;
pub mod counters;
pub mod ingest;
pub mod pipeline;
pub mod scope;

// Re-export for convenience
pub use pipeline as pipeline_service;
