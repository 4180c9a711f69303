//! Jewel Ops Core - Shared types library.
//!
//! This crate provides common types used across the Jewel Ops components:
//! - `backoffice` - Back-office HTTP API, including the sales analysis engine
//! - `cli` - Command-line tools for running analyses
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - ERP ids, sales rows, metrics, request filters and the
//!   analysis result tree

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
