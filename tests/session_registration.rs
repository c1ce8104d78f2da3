mod common;

use std::sync::Arc;

use anyhow::anyhow;
use branchdag::cache::{ArchiveRecovery, Cache, Recovery};
use branchdag::config::ConfigFile;
use branchdag::dag::DepSlice;
use branchdag::errors::BranchdagError;
use branchdag::value::{Payload, Value};
use branchdag_test_utils::builders::{ConfigFileBuilder, TargetConfigBuilder};
use branchdag_test_utils::fixtures::{run_identity, session_for, session_with_cache};
use common::init_tracing;
use serde_json::json;

fn map_over_w(items: &[&str]) -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .with_target("w", TargetConfigBuilder::new().values(items.to_vec()).build())
        .with_target(
            "y",
            TargetConfigBuilder::new().map(&["w"]).trace(&["w"]).build(),
        )
}

fn seq(items: &[&str]) -> Payload {
    Payload::Seq(items.iter().map(|s| json!(s)).collect())
}

#[test]
fn registration_adds_subtargets_to_graph_layout_and_queue() {
    init_tracing();
    let cfg = map_over_w(&["A", "B"]).build();
    let (session, _cache) = session_for(&cfg);

    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.subtargets.len(), 2);
    assert_eq!(reg.to_build, reg.subtargets);
    assert!(reg.parent_queued);
    assert!(session.is_registered("y"));

    session.with_graph(|g| {
        for sub in &reg.subtargets {
            assert!(g.contains_edge(sub, "y"), "missing edge {sub} -> y");
        }
    });

    for (ordinal, sub) in reg.subtargets.iter().enumerate() {
        let layout = session.layout_of(sub).unwrap();
        assert!(layout.is_subtarget);
        assert_eq!(layout.subtarget_parent.as_deref(), Some("y"));
        assert_eq!(layout.subtarget_index, Some(ordinal));
        assert_eq!(layout.slices["w"], DepSlice::Positions(vec![ordinal]));
    }
    assert_eq!(session.subtargets("y").unwrap(), reg.subtargets);

    session.with_queue(|q| {
        for sub in &reg.subtargets {
            assert_eq!(q.outstanding_of(sub), Some(0));
        }
        assert_eq!(q.outstanding_of("y"), Some(2));
    });
    assert_eq!(session.remaining(), 3);
}

#[test]
fn repeated_registration_does_not_inflate_remaining_work() {
    let cfg = map_over_w(&["A", "B"])
        .with_target("z", TargetConfigBuilder::new().after("y").build())
        .build();
    let (session, _cache) = session_for(&cfg);
    session.with_queue(|q| q.push(&["z".to_string()], 1));

    let first = session.register_subtargets("y").unwrap();
    assert_eq!(session.remaining(), 3);
    assert_eq!(session.with_queue(|q| q.outstanding_of("z")), Some(2));

    let second = session.register_subtargets("y").unwrap();
    assert_eq!(second.subtargets, first.subtargets);
    assert_eq!(session.remaining(), 3);
    session.with_queue(|q| {
        assert_eq!(q.len(), 4);
        assert_eq!(q.outstanding_of("y"), Some(2));
        assert_eq!(q.outstanding_of("z"), Some(2));
    });
}

#[test]
fn subtarget_inputs_are_the_resolved_slices() {
    let cfg = map_over_w(&["A", "B"]).build();
    let (session, _cache) = session_for(&cfg);
    let reg = session.register_subtargets("y").unwrap();

    let inputs = session.subtarget_inputs(&reg.subtargets[1]).unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs["w"], seq(&["B"]));
}

#[test]
fn inputs_of_a_declared_target_are_rejected() {
    let cfg = map_over_w(&["A"]).build();
    let (session, _cache) = session_for(&cfg);
    let err = session.subtarget_inputs("y").unwrap_err();
    assert!(matches!(err, BranchdagError::InvalidDynamic(_)));
}

#[test]
fn cross_subtarget_inputs_follow_mixed_radix_order() {
    let cfg = ConfigFileBuilder::new()
        .with_target("a", TargetConfigBuilder::new().values(["A", "B"]).build())
        .with_target("b", TargetConfigBuilder::new().values([1, 2, 3]).build())
        .with_target("y", TargetConfigBuilder::new().cross(&["a", "b"]).build())
        .build();
    let (session, _cache) = session_for(&cfg);

    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.subtargets.len(), 6);

    let inputs = session.subtarget_inputs(&reg.subtargets[4]).unwrap();
    assert_eq!(inputs["a"], seq(&["B"]));
    assert_eq!(inputs["b"], Payload::Seq(vec![json!(2)]));
}

#[test]
fn grouped_combine_subtargets_receive_whole_groups() {
    let cfg = ConfigFileBuilder::new()
        .with_target("x", TargetConfigBuilder::new().values([1, 2, 3]).build())
        .with_target("g", TargetConfigBuilder::new().values(["a", "a", "b"]).build())
        .with_target(
            "y",
            TargetConfigBuilder::new().combine(&["x"]).by("g").build(),
        )
        .build();
    let (session, _cache) = session_for(&cfg);

    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.subtargets.len(), 2);

    let first = session.subtarget_inputs(&reg.subtargets[0]).unwrap();
    assert_eq!(first["x"], Payload::Seq(vec![json!(1), json!(2)]));
    assert_eq!(first["g"], seq(&["a", "a"]));

    let second = session.subtarget_inputs(&reg.subtargets[1]).unwrap();
    assert_eq!(second["x"], Payload::Seq(vec![json!(3)]));
}

#[test]
fn table_dependencies_are_split_by_row() {
    let cfg = ConfigFileBuilder::new()
        .with_target(
            "t",
            TargetConfigBuilder::new()
                .table(
                    &["id", "name"],
                    vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
                )
                .build(),
        )
        .with_target("y", TargetConfigBuilder::new().map(&["t"]).build())
        .build();
    let (session, _cache) = session_for(&cfg);
    let reg = session.register_subtargets("y").unwrap();

    let inputs = session.subtarget_inputs(&reg.subtargets[1]).unwrap();
    let Payload::Table(t) = &inputs["t"] else {
        panic!("expected a table slice");
    };
    assert_eq!(t.rows, vec![vec![json!(2), json!("b")]]);
}

#[test]
fn max_expand_limits_registration() {
    let cfg = map_over_w(&["A", "B", "C", "D"]).with_max_expand(2).build();
    let (session, _cache) = session_for(&cfg);
    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.subtargets.len(), 2);
    assert_eq!(session.subtarget_names("y").unwrap(), reg.subtargets);
}

#[test]
fn arity_mismatch_fails_but_still_marks_registered() {
    let cfg = ConfigFileBuilder::new()
        .with_target("x", TargetConfigBuilder::new().values([1, 2]).build())
        .with_target("z", TargetConfigBuilder::new().values([1, 2, 3]).build())
        .with_target("y", TargetConfigBuilder::new().map(&["x", "z"]).build())
        .build();
    let (session, _cache) = session_for(&cfg);

    let err = session.register_subtargets("y").unwrap_err();
    assert!(matches!(err, BranchdagError::ArityMismatch { .. }));
    assert!(session.is_registered("y"));
    assert_eq!(session.remaining(), 0);
}

#[test]
fn precheck_skips_cached_subtargets() {
    let cfg = map_over_w(&["A", "B"]).build();
    let (session, cache) = session_for(&cfg);
    let names = session.subtarget_names("y").unwrap();
    cache.put(&names[0], Value::seq(["A"])).unwrap();

    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.to_build, vec![names[1].clone()]);
    assert!(reg.parent_queued);
}

#[test]
fn precheck_disabled_builds_everything() {
    let cfg = map_over_w(&["A", "B"]).with_precheck(false).build();
    let (session, cache) = session_for(&cfg);
    let names = session.subtarget_names("y").unwrap();
    cache.put(&names[0], Value::seq(["A"])).unwrap();

    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.to_build, names);
}

#[test]
fn recovered_subtargets_are_not_built() {
    let cfg = map_over_w(&["A", "B"]).with_recover(true).build();
    let (session, cache) = session_for(&cfg);
    let names = session.subtarget_names("y").unwrap();

    let archive = ArchiveRecovery::new();
    archive.archive(names[1].clone(), Value::seq(["B"]));
    let session = session.with_recovery(Arc::new(archive));

    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.to_build, vec![names[0].clone()]);
    assert!(cache.exists(&names[1]));
}

struct BrokenRecovery;

impl Recovery for BrokenRecovery {
    fn recover(&self, _name: &str, _cache: &dyn Cache) -> anyhow::Result<bool> {
        Err(anyhow!("archive unreachable"))
    }
}

#[test]
fn recovery_errors_mean_not_recovered() {
    init_tracing();
    let cfg = map_over_w(&["A", "B"]).with_recover(true).build();
    let (session, _cache) = session_for(&cfg);
    let session = session.with_recovery(Arc::new(BrokenRecovery));

    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.to_build.len(), 2);
}

#[test]
fn recovery_is_ignored_unless_enabled() {
    let cfg = map_over_w(&["A"]).build();
    let (session, _cache) = session_for(&cfg);
    let names = session.subtarget_names("y").unwrap();
    let archive = ArchiveRecovery::new();
    archive.archive(names[0].clone(), Value::seq(["A"]));
    let session = session.with_recovery(Arc::new(archive));

    let reg = session.register_subtargets("y").unwrap();
    assert_eq!(reg.to_build, names);
}

fn two_independent_maps() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_target("v", TargetConfigBuilder::new().values([1, 2, 3]).build())
        .with_target("w", TargetConfigBuilder::new().values(["A", "B"]).build())
        .with_target("y1", TargetConfigBuilder::new().map(&["v"]).build())
        .with_target("y2", TargetConfigBuilder::new().map(&["w"]).build())
        .with_hash_workers(2)
        .build()
}

#[test]
fn concurrent_registration_of_independent_targets() {
    init_tracing();
    let cfg = two_independent_maps();
    let (session, _cache) = session_for(&cfg);

    let (r1, r2) = std::thread::scope(|s| {
        let h1 = s.spawn(|| session.register_subtargets("y1"));
        let h2 = s.spawn(|| session.register_subtargets("y2"));
        (h1.join().unwrap(), h2.join().unwrap())
    });
    let (r1, r2) = (r1.unwrap(), r2.unwrap());
    assert_eq!(r1.subtargets.len(), 3);
    assert_eq!(r2.subtargets.len(), 2);

    session.with_graph(|g| {
        for sub in &r1.subtargets {
            assert!(g.contains_edge(sub, "y1"));
        }
        for sub in &r2.subtargets {
            assert!(g.contains_edge(sub, "y2"));
        }
    });
    session.with_queue(|q| {
        assert_eq!(q.len(), 3 + 2 + 2);
        assert_eq!(q.outstanding_of("y1"), Some(3));
        assert_eq!(q.outstanding_of("y2"), Some(2));
    });
    assert_eq!(session.remaining(), 7);
    assert!(session.is_registered("y1") && session.is_registered("y2"));
}

#[test]
fn subtarget_seeds_are_distinct_and_reproducible() {
    let cfg = map_over_w(&["A", "B"]).build();
    let (first, cache) = session_for(&cfg);
    let reg = first.register_subtargets("y").unwrap();
    let seeds: Vec<u64> = reg
        .subtargets
        .iter()
        .map(|s| first.layout_of(s).unwrap().seed)
        .collect();
    assert_ne!(seeds[0], seeds[1]);

    let second = session_with_cache(&cfg, cache);
    second.register_subtargets("y").unwrap();
    let again: Vec<u64> = reg
        .subtargets
        .iter()
        .map(|s| second.layout_of(s).unwrap().seed)
        .collect();
    assert_eq!(seeds, again);
}

#[test]
fn reset_memo_forgets_registrations_but_keeps_dynamic_targets() {
    let cfg = map_over_w(&["A"]).build();
    let (session, _cache) = session_for(&cfg);
    session.register_subtargets("y").unwrap();
    assert!(!session.memo().sizes.is_empty());

    session.reset_memo();
    assert!(!session.is_registered("y"));
    assert!(session.memo().sizes.is_empty());
    assert!(session.is_dynamic("y"));
    assert!(session.memo().dynamic_deps.exists("w"));
}

#[test]
fn unknown_target_is_reported() {
    let cfg = map_over_w(&["A"]).build();
    let (session, _cache) = session_for(&cfg);
    let err = session.register_subtargets("nope").unwrap_err();
    assert!(matches!(err, BranchdagError::TargetNotFound(name) if name == "nope"));

    let run = run_identity(&session);
    assert_eq!(run.registrations.len(), 1);
}
