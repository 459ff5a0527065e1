//! JSON loop fixtures
//!
//! A fixture describes an original loop, optionally its task clone with the
//! correlation map, and the induction facts. Without a clone the original
//! body doubles as the task body under the identity correlation.

use crate::errors::Result;
use crate::features::dependence::{DependenceEdge, DependenceGraph};
use crate::features::loop_structure::LoopStructure;
use crate::features::scc_attributes::InductionFacts;
use crate::features::sequential_segments::domain::{CorrelationMap, LoopAnalysis};
use crate::shared::models::{BlockId, Function, LoopId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One loop of a fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopDescriptor {
    pub function: Function,
    pub loop_id: LoopId,
    pub header: BlockId,
    pub blocks: Vec<BlockId>,
    /// Seed the dependence graph with SSA def-use edges
    #[serde(default = "default_true")]
    pub def_use: bool,
    /// Add control dependences of the loop-exiting branches
    #[serde(default)]
    pub exit_control: bool,
    /// Extra dependences from the dependence-analysis collaborator
    #[serde(default)]
    pub dependences: Vec<DependenceEdge>,
}

fn default_true() -> bool {
    true
}

impl LoopDescriptor {
    pub fn build(&self) -> Result<LoopAnalysis> {
        let structure = LoopStructure::new(
            &self.function,
            self.loop_id,
            self.header,
            self.blocks.clone(),
        )?;
        let mut dependences = if self.def_use {
            DependenceGraph::with_def_use(&self.function, &structure)?
        } else {
            DependenceGraph::new(&structure)
        };
        if self.exit_control {
            dependences.add_exit_control_dependences(&self.function, &structure)?;
        }
        for edge in &self.dependences {
            dependences.add_dependence(*edge)?;
        }
        Ok(LoopAnalysis {
            function: self.function.clone(),
            structure,
            dependences,
        })
    }
}

/// Serialized synthesis input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopFixture {
    pub original: LoopDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloned: Option<LoopDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationMap>,
    #[serde(default)]
    pub facts: InductionFacts,
}

/// Analysis inputs materialized from a fixture
#[derive(Debug, Clone)]
pub struct BuiltFixture {
    pub original: LoopAnalysis,
    pub cloned: LoopAnalysis,
    pub correlation: CorrelationMap,
    pub facts: InductionFacts,
}

impl LoopFixture {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn build(&self) -> Result<BuiltFixture> {
        let original = self.original.build()?;
        let cloned = match &self.cloned {
            Some(descriptor) => descriptor.build()?,
            None => original.clone(),
        };
        let correlation = match &self.correlation {
            Some(map) => map.clone(),
            None => CorrelationMap::identity(&original.function),
        };
        let mut facts = self.facts.clone();
        facts.reindex();
        Ok(BuiltFixture {
            original,
            cloned,
            correlation,
            facts,
        })
    }
}
