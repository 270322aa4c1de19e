//! Integration test crate for the Cadenza royalty engine.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end accounting flows across multiple workspace
//! crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p cadenza-integration-tests
//! ```
