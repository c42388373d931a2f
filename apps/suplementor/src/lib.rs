//! # suplementor
//!
//! The Suplementor binary's library half: HTTP API, CLI, and configuration.
//! Split out of `main.rs` so integration tests can drive the router directly.

pub mod api;
pub mod cli;
pub mod config;
