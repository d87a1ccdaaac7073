//! Core types for the GovSight retrieval cascade.
//!
//! This crate defines the data structures shared by the fact store, the
//! retrieval adapters, the cascade orchestrator and the CLI. It contains no
//! business logic.

pub mod config;
pub mod error;
pub mod fact;
pub mod retrieval;
