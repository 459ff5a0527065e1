//! SCC classifier implementation

mod classifier;

pub use classifier::{ClassifierContext, SccClassifier};
