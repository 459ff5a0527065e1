//! Integer handles into arena tables
//!
//! Ownership graphs are expressed as lookups by handle, never as references
//! between entities.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Position in the owning table
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_handle!(
    /// Instruction handle (index into `Function::insts`)
    InstId,
    "%"
);
define_handle!(
    /// Basic block handle (index into `Function::blocks`)
    BlockId,
    "bb"
);
define_handle!(
    /// SCC handle (index into the SCCDAG node table)
    SccId,
    "scc"
);
define_handle!(
    /// Sequential segment id, 0-based and contiguous
    SegmentId,
    "ss"
);
define_handle!(
    /// Loop handle assigned by the loop-analysis collaborator
    LoopId,
    "loop"
);
