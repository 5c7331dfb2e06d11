//! Shared fixtures for OpenOverlay integration tests.

pub mod fixtures;
