//! The `reading` module turns a decoded device payload into a typed `Reading`.
//!
//! Validation is pure: it never performs I/O and never fails through an
//! error channel. A payload either becomes a `Reading` or yields the full,
//! ordered list of `Violation`s found in it.

pub mod validator;

pub use validator::{
    Reading, TEMPERATURE_MAX, TEMPERATURE_MIN, Violation, decode, validate,
};
