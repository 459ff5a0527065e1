//! Sequential Segments - synchronization regions of a parallelized loop
//!
//! Given an original loop and its cloned task body, decides which partition
//! sets of the task's SCCDAG must run in original iteration order across
//! replicas, and where each region starts and ends.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    requires_synchronization, synthesize, LoopJob, LoopPlan, LoopPlanner, SegmentInputs,
    SequentialSegmentSynthesizer,
};
pub use domain::{
    CorrelationMap, LoopAnalysis, LoopView, ReduciblePolicy, SequentialSegment, SynthesisReport,
};
pub use infrastructure::{dump_paths, dump_sccdags, BuiltFixture, LoopDescriptor, LoopFixture};
