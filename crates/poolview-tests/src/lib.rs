//! Integration test crate for PoolView.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the preview cache with a scripted frame source whose fetches
//! finish only when a test releases them.


#[cfg(test)]
mod preview_cache;
