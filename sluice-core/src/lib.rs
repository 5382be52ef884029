//! Sluice Core
//!
//! Core types shared by the Sluice API server and its clients.
//!
//! This crate contains:
//! - Domain types: Pipeline, PipelineVersion, resource references and the
//!   typed Filter/Predicate query model
//! - DTOs: Upload parameters, list responses and the wire error body

pub mod domain;
pub mod dto;
