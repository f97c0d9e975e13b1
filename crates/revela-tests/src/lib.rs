//! Integration tests for the revela crates.
//!
//! End-to-end properties that cross crate boundaries: cache-hit renders
//! against full recomputation, incremental renders against cold renders,
//! the persistence boundary, and the RAW decode path.
