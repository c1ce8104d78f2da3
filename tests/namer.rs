mod common;

use branchdag::dynamic::DynamicSpec;
use branchdag::dynamic::namer::{
    DigestLists, SHORT_HASH_LEN, composite_keys, make_unique, short_hash, subtarget_names,
};
use branchdag::errors::BranchdagError;
use common::{init_tracing, seq_digests, strs};
use proptest::prelude::*;

fn map(vars: &[&str]) -> DynamicSpec {
    DynamicSpec::Map {
        vars: strs(vars),
        trace: vec![],
    }
}

fn cross(vars: &[&str]) -> DynamicSpec {
    DynamicSpec::Cross {
        vars: strs(vars),
        trace: vec![],
    }
}

fn digests(entries: &[(&str, Vec<String>)]) -> DigestLists {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn names_are_target_prefixed_short_hashes() {
    init_tracing();
    let d = digests(&[("w", seq_digests(["A", "B"]))]);
    let names = subtarget_names("y", &map(&["w"]), &d, None).unwrap();

    assert_eq!(names.len(), 2);
    for name in &names {
        let suffix = name.strip_prefix("y_").expect("prefixed with target name");
        assert_eq!(suffix.len(), SHORT_HASH_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
    assert_ne!(names[0], names[1]);
}

#[test]
fn names_are_deterministic_across_calls() {
    let d = digests(&[("a", seq_digests([1, 2, 3])), ("b", seq_digests([4, 5, 6]))]);
    let first = subtarget_names("t", &map(&["a", "b"]), &d, None).unwrap();
    let second = subtarget_names("t", &map(&["a", "b"]), &d, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn changing_one_element_renames_only_its_subtarget() {
    let before = digests(&[("w", seq_digests(["A", "B", "C"]))]);
    let after = digests(&[("w", seq_digests(["A", "X", "C"]))]);
    let a = subtarget_names("y", &map(&["w"]), &before, None).unwrap();
    let b = subtarget_names("y", &map(&["w"]), &after, None).unwrap();

    assert_eq!(a[0], b[0]);
    assert_ne!(a[1], b[1]);
    assert_eq!(a[2], b[2]);
}

#[test]
fn map_with_unequal_lengths_is_an_arity_mismatch() {
    let d = digests(&[("x", seq_digests([1, 2])), ("z", seq_digests([1, 2, 3]))]);
    let err = subtarget_names("y", &map(&["x", "z"]), &d, None).unwrap_err();

    match err {
        BranchdagError::ArityMismatch { target, details } => {
            assert_eq!(target, "y");
            assert!(details.contains("x (2)"), "details: {details}");
            assert!(details.contains("z (3)"), "details: {details}");
        }
        other => panic!("expected ArityMismatch, got {other:?}"),
    }
}

#[test]
fn grouped_combine_requires_equal_lengths_including_by() {
    let spec = DynamicSpec::Combine {
        vars: strs(&["x", "g"]),
        by: Some("g".to_string()),
        trace: vec![],
    };
    let d = digests(&[("x", seq_digests([1, 2, 3])), ("g", seq_digests(["a", "b"]))]);
    let err = subtarget_names("y", &spec, &d, None).unwrap_err();
    assert!(matches!(err, BranchdagError::ArityMismatch { .. }));
}

#[test]
fn missing_digests_for_a_variable_is_rejected() {
    let d = digests(&[("x", seq_digests([1]))]);
    let err = subtarget_names("y", &map(&["x", "z"]), &d, None).unwrap_err();
    assert!(matches!(err, BranchdagError::InvalidDynamic(msg) if msg.contains("'z'")));
}

#[test]
fn cross_keys_vary_last_variable_fastest() {
    let d = digests(&[
        ("a", strs(&["a0", "a1"])),
        ("b", strs(&["b0", "b1", "b2"])),
    ]);
    let keys = composite_keys("t", &cross(&["a", "b"]), &d, None).unwrap();
    assert_eq!(
        keys,
        strs(&["a0|b0", "a0|b1", "a0|b2", "a1|b0", "a1|b1", "a1|b2"])
    );
}

#[test]
fn grouped_combine_has_one_key_per_distinct_group() {
    let spec = DynamicSpec::Combine {
        vars: strs(&["x", "g"]),
        by: Some("g".to_string()),
        trace: vec![],
    };
    let d = digests(&[("x", strs(&["x0", "x1", "x2"])), ("g", strs(&["a", "a", "b"]))]);
    let keys = composite_keys("t", &spec, &d, None).unwrap();
    assert_eq!(keys, strs(&["x0|a|x1|a", "x2|b"]));
}

#[test]
fn ungrouped_combine_has_one_key_per_element() {
    let spec = DynamicSpec::Combine {
        vars: strs(&["x", "z"]),
        by: None,
        trace: vec![],
    };
    let d = digests(&[("x", strs(&["x0", "x1"])), ("z", strs(&["z0", "z1"]))]);
    let keys = composite_keys("t", &spec, &d, None).unwrap();
    assert_eq!(keys, strs(&["x0|z0", "x1|z1"]));
}

#[test]
fn max_expand_keeps_a_prefix_of_the_full_list() {
    let d = digests(&[("w", seq_digests(["A", "B", "C", "D"]))]);
    let full = subtarget_names("y", &map(&["w"]), &d, None).unwrap();
    let capped = subtarget_names("y", &map(&["w"]), &d, Some(2)).unwrap();
    assert_eq!(capped, full[..2].to_vec());
}

#[test]
fn duplicate_elements_get_numbered_suffixes() {
    let d = digests(&[("w", seq_digests(["A", "A", "A"]))]);
    let names = subtarget_names("y", &map(&["w"]), &d, None).unwrap();
    let base = format!("y_{}", short_hash(&seq_digests(["A"])[0]));
    assert_eq!(names, vec![base.clone(), format!("{base}_1"), format!("{base}_2")]);
}

#[test]
fn make_unique_leaves_distinct_names_alone() {
    let names = strs(&["a", "b", "a", "c", "a"]);
    assert_eq!(make_unique(names), strs(&["a", "b", "a_1", "c", "a_2"]));
}

#[test]
fn empty_dependency_yields_no_names() {
    let d = digests(&[("w", vec![])]);
    assert!(subtarget_names("y", &map(&["w"]), &d, None).unwrap().is_empty());
}

proptest! {
    #[test]
    fn cross_produces_product_of_sizes_unique_names(
        sizes in proptest::collection::vec(1usize..5, 1..4)
    ) {
        let vars: Vec<String> = (0..sizes.len()).map(|i| format!("v{i}")).collect();
        let d: DigestLists = vars
            .iter()
            .zip(&sizes)
            .map(|(v, &n)| (v.clone(), (0..n).map(|i| format!("{v}-{i}")).collect()))
            .collect();
        let spec = DynamicSpec::Cross { vars: vars.clone(), trace: vec![] };

        let names = subtarget_names("t", &spec, &d, None).unwrap();
        let expected: usize = sizes.iter().product();
        prop_assert_eq!(names.len(), expected);

        let unique: std::collections::HashSet<_> = names.iter().collect();
        prop_assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn names_are_stable_for_any_sequence(items in proptest::collection::vec(0i64..20, 0..30)) {
        let d = digests(&[("w", seq_digests(items.clone()))]);
        let a = subtarget_names("y", &map(&["w"]), &d, None).unwrap();
        let b = subtarget_names("y", &map(&["w"]), &d, None).unwrap();
        prop_assert_eq!(a.len(), items.len());
        prop_assert_eq!(a, b);
    }
}
