//! Crate-level tests that run the whole pipeline against local stand-ins
//! for the broker and the time-series store.

pub(crate) mod support;
