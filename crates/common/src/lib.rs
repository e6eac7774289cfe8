//! Common types shared across the storage cluster test harness crates.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for common data types
pub mod types;

/// Module for test run configuration
pub mod config;

/// Module for the contracts the harness consumes from external collaborators
pub mod contracts;
