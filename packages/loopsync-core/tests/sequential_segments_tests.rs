//! End-to-end sequential segment synthesis on small loops

mod common;

use common::*;
use loopsync_core::config::{LoopSyncConfig, Preset};
use loopsync_core::features::sequential_segments::{
    dump_paths, CorrelationMap, LoopDescriptor, LoopFixture, LoopJob, LoopPlan, LoopPlanner,
    ReduciblePolicy, SequentialSegmentSynthesizer, SynthesisReport,
};
use loopsync_core::{
    ConsistencyViolation, DependenceGraph, InductionFacts, InstId, LoopAnalysis, LoopSyncError,
    SccAttributes, SccId, SegmentId,
};
use pretty_assertions::assert_eq;

fn identify(built: &BuiltLoop, config: LoopSyncConfig) -> SynthesisReport {
    let synthesizer = SequentialSegmentSynthesizer::new(config).unwrap();
    let correlation = CorrelationMap::identity(&built.analysis.function);
    synthesizer
        .identify(
            built.analysis.view(),
            built.analysis.view(),
            &correlation,
            &built.facts,
        )
        .unwrap()
}

// ============================================================================
// Scenario A: one non-associative recurrence
// ============================================================================

#[test]
fn test_division_recurrence_gets_one_segment() {
    let built = division_recurrence();
    let (acc, acc_next) = (built.marks[0], built.marks[2]);
    let report = identify(&built, LoopSyncConfig::default());

    assert_eq!(report.segments.len(), 1);
    let segment = &report.segments[0];
    assert_eq!(segment.id, SegmentId(0));
    assert_eq!(segment.instructions, vec![acc, acc_next]);
    // acquired at the phi reading the previous iteration's value
    assert_eq!(segment.entries, vec![acc]);
    // released after producing the next iteration's value
    assert_eq!(segment.exits, vec![acc_next]);

    assert!(report.iv_governed);
    assert_eq!(report.preamble, Some(SccId(0)));
    assert!(report.classification.get(SccId(0)).unwrap().is_induction_variable());
    assert_eq!(report.classification.get(SccId(1)), Some(&SccAttributes::Sequential));
}

#[test]
fn test_segment_lives_in_the_task_body() {
    let built = division_recurrence();
    let (acc, acc_next) = (built.marks[0], built.marks[2]);
    let (task, correlation) = shifted_clone(&built.analysis, 2);

    let synthesizer = SequentialSegmentSynthesizer::new(LoopSyncConfig::default()).unwrap();
    let report = synthesizer
        .identify(built.analysis.view(), task.view(), &correlation, &built.facts)
        .unwrap();

    let shifted = |i: InstId| InstId(i.0 + 2);
    assert_eq!(report.segments.len(), 1);
    assert_eq!(
        report.segments[0].instructions,
        vec![shifted(acc), shifted(acc_next)]
    );
    assert_eq!(report.scc_map, vec![SccId(0), SccId(1), SccId(2), SccId(3)]);
}

#[test]
fn test_spilled_phi_clone_outside_loop_is_skipped() {
    let built = division_recurrence();
    let acc = built.marks[0];
    let (task, shifted) = shifted_clone(&built.analysis, 2);

    // the spill load in the task entry block is listed first
    let mut correlation = CorrelationMap::new().with(acc, InstId(0));
    for inst in built.analysis.function.insts() {
        for &clone in shifted.clones_of(inst.id) {
            correlation.insert(inst.id, clone);
        }
    }
    assert_eq!(correlation.clones_of(acc), &[InstId(0), InstId(acc.0 + 2)]);

    let synthesizer = SequentialSegmentSynthesizer::default();
    let report = synthesizer
        .identify(built.analysis.view(), task.view(), &correlation, &built.facts)
        .unwrap();
    assert_eq!(report.segments.len(), 1);
    assert!(report.segments[0].contains(InstId(acc.0 + 2)));
}

#[test]
fn test_unmapped_scc_is_a_consistency_violation() {
    let built = division_recurrence();
    let x = built.marks[1];
    let mut correlation = CorrelationMap::new();
    for inst in built.analysis.function.insts() {
        if inst.id != x {
            correlation.insert(inst.id, inst.id);
        }
    }

    let err = SequentialSegmentSynthesizer::default()
        .identify(
            built.analysis.view(),
            built.analysis.view(),
            &correlation,
            &built.facts,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        LoopSyncError::InternalConsistency(ConsistencyViolation::UnmappedScc { scc: SccId(2) })
    ));
}

#[test]
fn test_split_recurrence_is_ambiguous() {
    let built = division_recurrence();
    let (acc, acc_next) = (built.marks[0], built.marks[2]);

    // the task body lost the recurrence edge, so acc and acc_next come apart
    let mut dependences = DependenceGraph::new(&built.analysis.structure);
    for edge in built.analysis.dependences.edges() {
        if !(edge.from == acc_next && edge.to == acc) {
            dependences.add_dependence(*edge).unwrap();
        }
    }
    let task = LoopAnalysis {
        function: built.analysis.function.clone(),
        structure: built.analysis.structure.clone(),
        dependences,
    };
    let correlation = CorrelationMap::identity(&built.analysis.function);

    let err = SequentialSegmentSynthesizer::default()
        .identify(built.analysis.view(), task.view(), &correlation, &built.facts)
        .unwrap_err();
    match err {
        LoopSyncError::InternalConsistency(ConsistencyViolation::AmbiguousScc {
            scc,
            candidates,
        }) => {
            assert_eq!(scc, SccId(1));
            assert_eq!(candidates, vec![SccId(1), SccId(3)]);
        }
        other => panic!("expected an ambiguous mapping, got {other}"),
    }
}

#[test]
fn test_task_only_carried_scc_is_reported() {
    let original = elementwise_scale();
    let task = elementwise_scale_with_log();
    let call = task.marks[3];

    // instructions after the store move down one slot in the task
    let mut correlation = CorrelationMap::new();
    for inst in original.analysis.function.insts() {
        let clone = if inst.id < call {
            inst.id
        } else {
            InstId(inst.id.0 + 1)
        };
        correlation.insert(inst.id, clone);
    }

    let err = SequentialSegmentSynthesizer::default()
        .identify(
            original.analysis.view(),
            task.analysis.view(),
            &correlation,
            &original.facts,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        LoopSyncError::InternalConsistency(ConsistencyViolation::UnmappedTaskScc { scc: SccId(4) })
    ));

    let plan = LoopPlanner::default().plan(LoopJob {
        original: original.analysis.view(),
        cloned: task.analysis.view(),
        correlation: &correlation,
        facts: &original.facts,
    });
    assert!(!plan.is_parallel());
}

// ============================================================================
// Scenario B: IV-governed loop without other cross-iteration dependences
// ============================================================================

#[test]
fn test_elementwise_loop_needs_no_segment() {
    let built = elementwise_scale();
    let report = identify(&built, LoopSyncConfig::default());
    assert!(report.segments.is_empty());
    assert_eq!(report.loop_carried, vec![SccId(0)]);

    // even one set holding every scc stays parallel
    let coarse = identify(&built, LoopSyncConfig::preset(Preset::Coarse));
    assert_eq!(coarse.partition.len(), 1);
    assert!(coarse.segments.is_empty());
}

#[test]
fn test_unknown_trip_count_orders_side_effects() {
    let built = elementwise_scale();
    let store = built.marks[2];
    let mut facts = built.facts.clone();
    facts.governing_iv = None;

    let synthesizer = SequentialSegmentSynthesizer::default();
    let correlation = CorrelationMap::identity(&built.analysis.function);
    let report = synthesizer
        .identify(built.analysis.view(), built.analysis.view(), &correlation, &facts)
        .unwrap();
    assert!(!report.iv_governed);
    assert!(report.segment_of(store).is_some());
    for (i, segment) in report.segments.iter().enumerate() {
        assert_eq!(segment.id, SegmentId(i as u32));
    }
}

// ============================================================================
// Scenario C: two independent sequential SCCs
// ============================================================================

#[test]
fn test_independent_sequential_sccs_get_ordered_segments() {
    let built = two_ordered_calls();
    let (call_a, call_b) = (built.marks[0], built.marks[1]);
    let report = identify(&built, LoopSyncConfig::default());

    assert_eq!(report.segments.len(), 2);
    let (first, second) = (&report.segments[0], &report.segments[1]);
    assert_eq!(first.id, SegmentId(0));
    assert_eq!(second.id, SegmentId(1));
    assert!(first.partition_index < second.partition_index);
    assert_eq!(first.instructions, vec![call_a]);
    assert_eq!(second.instructions, vec![call_b]);
    assert_eq!(first.entries, vec![call_a]);
    assert_eq!(first.exits, vec![call_a]);
}

#[test]
fn test_coarse_partition_merges_segments() {
    let built = two_ordered_calls();
    let report = identify(&built, LoopSyncConfig::preset(Preset::Coarse));

    assert_eq!(report.segments.len(), 1);
    let segment = &report.segments[0];
    assert_eq!(segment.instructions, built.analysis.structure.insts().to_vec());
    assert_eq!(segment.entries, vec![built.iv]);
    assert_eq!(segment.exits, vec![built.branch]);
}

// ============================================================================
// Reducible accumulators
// ============================================================================

#[test]
fn test_reducible_sum_runs_in_parallel_by_default() {
    let built = running_sum_with_store();
    let (sum, store) = (built.marks[0], built.marks[3]);
    let report = identify(&built, LoopSyncConfig::default());

    assert!(matches!(
        report.classification.get(SccId(1)),
        Some(SccAttributes::ReducibleAccumulator { phi, .. }) if *phi == sum
    ));
    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.segments[0].instructions, vec![store]);
    assert!(report.segment_of(sum).is_none());
}

#[test]
fn test_sequential_policy_orders_reducible_sum() {
    let built = running_sum_with_store();
    let (sum, sum_next, store) = (built.marks[0], built.marks[2], built.marks[3]);
    let config =
        LoopSyncConfig::default().segments(|s| s.reducible_policy(ReduciblePolicy::Sequential));
    let report = identify(&built, config);

    assert_eq!(report.segments.len(), 2);
    assert_eq!(report.segments[0].instructions, vec![sum, sum_next]);
    assert_eq!(report.segments[1].instructions, vec![store]);
}

// ============================================================================
// Preamble and planner fallback
// ============================================================================

#[test]
fn test_loop_without_single_preamble_stays_sequential() {
    let (function, structure, _) = straight_loop(3);
    let dependences = DependenceGraph::new(&structure);
    let analysis = LoopAnalysis {
        function,
        structure,
        dependences,
    };
    let correlation = CorrelationMap::identity(&analysis.function);
    let facts = InductionFacts::new();

    let err = SequentialSegmentSynthesizer::default()
        .identify(analysis.view(), analysis.view(), &correlation, &facts)
        .unwrap_err();
    assert!(matches!(
        err,
        LoopSyncError::InternalConsistency(ConsistencyViolation::MultiplePreambles { count: 4 })
    ));

    let planner = LoopPlanner::default();
    let plan = planner.plan(LoopJob {
        original: analysis.view(),
        cloned: analysis.view(),
        correlation: &correlation,
        facts: &facts,
    });
    match plan {
        LoopPlan::Sequential { reason } => assert!(reason.contains("preamble")),
        LoopPlan::Parallel { .. } => panic!("expected a sequential fallback"),
    }

    // relaxing the check lets the analysis run
    let relaxed = SequentialSegmentSynthesizer::new(
        LoopSyncConfig::default().segments(|s| s.require_single_preamble(false)),
    )
    .unwrap();
    let report = relaxed
        .identify(analysis.view(), analysis.view(), &correlation, &facts)
        .unwrap();
    assert_eq!(report.preamble, Some(SccId(0)));
}

#[test]
fn test_plan_all_handles_loops_independently() {
    let good = elementwise_scale();
    let bad = division_recurrence();
    let good_map = CorrelationMap::identity(&good.analysis.function);
    let empty = CorrelationMap::new();

    let plans = LoopPlanner::default().plan_all([
        LoopJob {
            original: good.analysis.view(),
            cloned: good.analysis.view(),
            correlation: &good_map,
            facts: &good.facts,
        },
        LoopJob {
            original: bad.analysis.view(),
            cloned: bad.analysis.view(),
            correlation: &empty,
            facts: &bad.facts,
        },
    ]);

    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].1, LoopPlan::Parallel { segments: vec![] });
    assert!(!plans[1].1.is_parallel());
    assert!(plans[1].1.segments().is_empty());
}

#[test]
fn test_zero_granularity_config_rejected() {
    let config = LoopSyncConfig::default().partition(|p| p.target_granularity(0));
    assert!(matches!(
        SequentialSegmentSynthesizer::new(config),
        Err(LoopSyncError::Config(_))
    ));
}

// ============================================================================
// Diagnostics and fixtures
// ============================================================================

#[test]
fn test_dump_dir_receives_both_sccdags() {
    let dir = tempfile::tempdir().unwrap();
    let built = division_recurrence();
    let config = LoopSyncConfig::default().segments(|s| s.dump_dir(dir.path().join("dots")));
    identify(&built, config);

    let (original, task) = dump_paths(&dir.path().join("dots"), built.analysis.structure.id());
    assert!(original.ends_with("sccdag-original-0.dot"));
    assert!(task.ends_with("sccdag-task-0.dot"));
    let text = std::fs::read_to_string(&original).unwrap();
    assert!(text.starts_with("digraph \"sccdag-original-0\""));
    assert!(std::fs::read_to_string(&task).unwrap().contains("cluster_1"));
}

#[test]
fn test_dump_failure_does_not_fail_analysis() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let built = division_recurrence();
    // a regular file cannot be used as the dump directory
    let config = LoopSyncConfig::default().segments(|s| s.dump_dir(file.path()));
    let report = identify(&built, config);
    assert_eq!(report.segments.len(), 1);
}

#[test]
fn test_fixture_file_drives_synthesis() {
    let built = two_ordered_calls();
    let fixture = LoopFixture {
        original: LoopDescriptor {
            function: built.analysis.function.clone(),
            loop_id: built.analysis.structure.id(),
            header: built.analysis.structure.header(),
            blocks: built.analysis.structure.blocks().to_vec(),
            def_use: true,
            exit_control: true,
            dependences: vec![
                loopsync_core::DependenceEdge::memory(built.marks[0], built.marks[0]).carried(),
                loopsync_core::DependenceEdge::memory(built.marks[1], built.marks[1]).carried(),
            ],
        },
        cloned: None,
        correlation: None,
        facts: built.facts.clone(),
    };
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), fixture.to_json_pretty().unwrap()).unwrap();

    let loaded = LoopFixture::from_path(file.path()).unwrap().build().unwrap();
    let report = SequentialSegmentSynthesizer::default()
        .identify(
            loaded.original.view(),
            loaded.cloned.view(),
            &loaded.correlation,
            &loaded.facts,
        )
        .unwrap();
    assert_eq!(report.segments, identify(&built, LoopSyncConfig::default()).segments);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["segments"][1]["id"], 1);
    assert_eq!(json["classification"]["tags"][0]["kind"], "induction_variable");
}
