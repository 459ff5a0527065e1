//! Common test utilities for loopsync-core
//!
//! Loop builders shared by the integration and property tests.

#![allow(dead_code)]

mod builders;

pub use builders::*;
