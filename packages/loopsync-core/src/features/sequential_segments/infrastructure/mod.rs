//! Sequential segment infrastructure: diagnostic dumps and JSON fixtures

mod dump;
mod fixture;

pub use dump::{dump_paths, dump_sccdags};
pub use fixture::{BuiltFixture, LoopDescriptor, LoopFixture};
