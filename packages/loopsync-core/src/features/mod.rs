//! Feature modules
//!
//! Leaves first: loop structure → dependence graph → SCCDAG → attributes →
//! partitioner → reachability → sequential segments. The sequencer is the
//! runtime counterpart of the segments' ordering contract.

pub mod loop_structure;

pub mod dependence;

pub mod sccdag;

pub mod scc_attributes;

pub mod partitioner;

pub mod reachability;

pub mod sequential_segments;

// Iteration-ordered mutual exclusion for generated code and tests
pub mod sequencer;
