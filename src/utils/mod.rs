//! The `utils` module provides shared building blocks used across `roomcast`:
//! the crate-level error type and logging initialisation.

pub mod error;
pub mod logging;
