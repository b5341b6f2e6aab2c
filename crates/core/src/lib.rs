//! Domain types and pure logic for the ad publishing pipeline.
//!
//! No I/O lives here: request/spec types, input validation, the default
//! bid heuristic, and the retry policy are shared by the image, platform,
//! and pipeline crates.

pub mod account;
pub mod ad;
pub mod error;
pub mod image;
pub mod retry;
pub mod steps;
pub mod types;
