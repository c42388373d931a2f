//! # Formats
//!
//! Interchange formats for loading and exporting content.
//! File I/O stays in the app layer; everything here works on strings and
//! in-memory values.

pub mod seed;

pub use seed::{SeedBundle, SeedSummary, MAX_SEED_BUNDLE_SIZE};
