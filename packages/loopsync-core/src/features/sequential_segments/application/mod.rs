//! Sequential Segments Application Layer
//!
//! Main entry points: `SequentialSegmentSynthesizer::identify()` for one
//! loop and `LoopPlanner::plan_all()` for many.

mod plan_loop;
mod synthesize;

pub use plan_loop::{LoopJob, LoopPlan, LoopPlanner};
pub use synthesize::{
    requires_synchronization, synthesize, SegmentInputs, SequentialSegmentSynthesizer,
};
