//! Orchestration layer for GovSight.
//!
//! Loads configuration, opens the stores, builds the adapters and runs the
//! local → vector → web cascade for each query.

pub mod cascade;
pub mod config;
pub mod error;
pub mod kernel;

pub use cascade::{CancelHandle, Cascade, CascadeStatsSnapshot};
pub use kernel::GovsightKernel;
