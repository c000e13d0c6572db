//! Common API utilities shared across versions

pub mod tracing;
