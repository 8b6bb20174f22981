//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `telebridge` service.
//!
//! It holds the error taxonomy shared by every layer and the logging
//! initialisation used by the binary and by tests.

pub mod error;
pub mod logging;
