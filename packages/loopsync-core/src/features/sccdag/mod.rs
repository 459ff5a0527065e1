//! SCCDAG - condensation of a loop dependence graph
//!
//! Nodes are the SCCs of the dependence graph (trivial singletons included),
//! edges summarize the dependences between distinct SCCs. Acyclic by
//! construction; `SccDag::build` still checks it and reports a cycle as an
//! internal consistency violation.

mod dag;
mod dot;
mod scc;

pub use dag::{SccDag, SccDagEdge};
pub use dot::{render_dot, write_dot};
pub use scc::Scc;
