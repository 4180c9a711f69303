//! Jewel Ops back-office library.
//!
//! This crate provides the back-office API as a library, allowing it to be
//! tested and reused by the CLI.
//!
//! # Data access
//!
//! Reads the ERP `PostgreSQL` schema only; nothing is written back.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
