//! Core domain types
//!
//! Records persisted by the resource manager and the query model used to
//! list them. Shared between the API server (serves) and clients (consume).

pub mod filter;
pub mod pipeline;
