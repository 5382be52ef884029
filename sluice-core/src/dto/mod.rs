//! Data Transfer Objects
//!
//! Request and response shapes exchanged between the API server and its
//! clients that are not domain records themselves.

pub mod error;
pub mod pipeline;
