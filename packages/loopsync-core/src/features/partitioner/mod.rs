//! Partitioner - dependency-respecting grouping of SCCDAG nodes
//!
//! Nodes are laid out in Kahn topological order (ties broken by discovery
//! order) and consecutive runs of at most `target_granularity` nodes become
//! one partition set. Every SCCDAG edge points forward in the linear order, so
//! every edge crossing two sets points to a later set.

use crate::errors::{ConsistencyViolation, LoopSyncError, Result};
use crate::features::sccdag::SccDag;
use crate::shared::models::SccId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Serializable DTO for Partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionDto {
    pub sets: Vec<Vec<SccId>>,
}

/// Ordered list of SCC sets covering an SCCDAG
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "PartitionDto", into = "PartitionDto")]
pub struct Partition {
    sets: Vec<Vec<SccId>>,
    index: FxHashMap<SccId, usize>,
}

impl From<PartitionDto> for Partition {
    fn from(dto: PartitionDto) -> Self {
        Partition::from_sets(dto.sets)
    }
}

impl From<Partition> for PartitionDto {
    fn from(partition: Partition) -> Self {
        PartitionDto {
            sets: partition.sets,
        }
    }
}

impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.sets == other.sets
    }
}

impl Eq for Partition {}

impl Partition {
    /// Build from explicit sets. Nothing is checked here, see `verify`.
    pub fn from_sets(sets: Vec<Vec<SccId>>) -> Self {
        let index = sets
            .iter()
            .enumerate()
            .flat_map(|(pos, set)| set.iter().map(move |&scc| (scc, pos)))
            .collect();
        Self { sets, index }
    }

    pub fn sets(&self) -> &[Vec<SccId>] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Index of the set holding `scc`
    pub fn set_of(&self, scc: SccId) -> Option<usize> {
        self.index.get(&scc).copied()
    }

    /// Sets sorted by the depth of their shallowest member, ties by set index.
    ///
    /// Depth is the longest path from any top-level node of `dag`.
    pub fn depth_ordered_sets(&self, dag: &SccDag) -> Vec<(usize, &[SccId])> {
        let depths = dag.depths();
        let mut ordered: Vec<(usize, usize, &[SccId])> = self
            .sets
            .iter()
            .enumerate()
            .map(|(pos, set)| {
                let depth = set
                    .iter()
                    .filter_map(|scc| depths.get(scc.index()).copied())
                    .min()
                    .unwrap_or(0);
                (depth, pos, set.as_slice())
            })
            .collect();
        ordered.sort_by_key(|&(depth, pos, _)| (depth, pos));
        ordered
            .into_iter()
            .map(|(_, pos, set)| (pos, set))
            .collect()
    }

    /// Check the cover and ordering properties against `dag`
    pub fn verify(&self, dag: &SccDag) -> Result<()> {
        let mut seen = vec![0usize; dag.len()];
        for set in &self.sets {
            for scc in set {
                match seen.get_mut(scc.index()) {
                    Some(count) => *count += 1,
                    None => {
                        return Err(ConsistencyViolation::PartitionCover { scc: *scc }.into())
                    }
                }
            }
        }
        if let Some(pos) = seen.iter().position(|&count| count != 1) {
            return Err(ConsistencyViolation::PartitionCover {
                scc: SccId::from_index(pos),
            }
            .into());
        }

        for edge in dag.edges() {
            let (Some(from_set), Some(to_set)) = (self.set_of(edge.from), self.set_of(edge.to))
            else {
                continue;
            };
            if from_set > to_set {
                return Err(ConsistencyViolation::PartitionOrder {
                    from: edge.from,
                    to: edge.to,
                    from_set,
                    to_set,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Partition `dag` into sets of at most `target_granularity` nodes
pub fn partition(dag: &SccDag, target_granularity: usize) -> Result<Partition> {
    if target_granularity == 0 {
        return Err(LoopSyncError::precondition(
            "target granularity must be at least 1",
        ));
    }

    let order = dag.topological_order();
    if order.len() != dag.len() {
        // topological_order drops nodes on a cycle
        let stuck = dag
            .nodes()
            .iter()
            .map(|s| s.id())
            .find(|id| !order.contains(id))
            .unwrap_or(SccId(0));
        return Err(ConsistencyViolation::CyclicSccDag { scc: stuck }.into());
    }

    let sets: Vec<Vec<SccId>> = order
        .chunks(target_granularity)
        .map(<[SccId]>::to_vec)
        .collect();
    let partition = Partition::from_sets(sets);
    partition.verify(dag)?;

    tracing::debug!(
        loop_id = %dag.loop_id(),
        nodes = dag.len(),
        sets = partition.len(),
        target_granularity,
        "sccdag partitioned"
    );
    Ok(partition)
}
