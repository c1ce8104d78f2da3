mod common;

use std::collections::BTreeMap;

use branchdag::dynamic::index::{distinct_groups, mixed_radix, product_len, resolve};
use branchdag::dynamic::{DynamicSpec, FanoutShape};
use common::strs;

fn shape(sizes: &[(&str, usize)]) -> FanoutShape {
    FanoutShape {
        sizes: sizes.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        groups: None,
    }
}

fn slices(entries: &[(&str, Vec<usize>)]) -> BTreeMap<String, Vec<usize>> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn cross_two_by_three_enumerates_last_variable_fastest() {
    let spec = DynamicSpec::Cross {
        vars: strs(&["a", "b"]),
        trace: vec![],
    };
    let shape = shape(&[("a", 2), ("b", 3)]);

    let got: Vec<(usize, usize)> = (0..6)
        .map(|ordinal| {
            let s = resolve(&spec, &shape, ordinal).expect("in range");
            (s["a"][0], s["b"][0])
        })
        .collect();
    assert_eq!(got, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    assert_eq!(resolve(&spec, &shape, 6), None);
}

#[test]
fn cross_respects_declared_order_not_name_order() {
    let spec = DynamicSpec::Cross {
        vars: strs(&["b", "a"]),
        trace: vec![],
    };
    let shape = shape(&[("a", 2), ("b", 3)]);
    // b is declared first, so a varies fastest.
    let s = resolve(&spec, &shape, 1).unwrap();
    assert_eq!(s, slices(&[("a", vec![1]), ("b", vec![0])]));
}

#[test]
fn map_uses_the_same_position_for_every_variable() {
    let spec = DynamicSpec::Map {
        vars: strs(&["x", "z"]),
        trace: vec![],
    };
    let shape = shape(&[("x", 3), ("z", 3)]);
    assert_eq!(
        resolve(&spec, &shape, 2),
        Some(slices(&[("x", vec![2]), ("z", vec![2])]))
    );
    assert_eq!(resolve(&spec, &shape, 3), None);
}

#[test]
fn grouped_combine_selects_every_position_of_the_group() {
    let spec = DynamicSpec::Combine {
        vars: strs(&["x", "g"]),
        by: Some("g".to_string()),
        trace: vec![],
    };
    let mut shape = shape(&[("x", 3), ("g", 3)]);
    shape.groups = Some(distinct_groups(&["a", "a", "b"]));

    assert_eq!(
        resolve(&spec, &shape, 0),
        Some(slices(&[("x", vec![0, 1]), ("g", vec![0, 1])]))
    );
    assert_eq!(
        resolve(&spec, &shape, 1),
        Some(slices(&[("x", vec![2]), ("g", vec![2])]))
    );
    assert_eq!(resolve(&spec, &shape, 2), None);
}

#[test]
fn ungrouped_combine_behaves_like_map() {
    let spec = DynamicSpec::Combine {
        vars: strs(&["x"]),
        by: None,
        trace: vec![],
    };
    let shape = shape(&[("x", 2)]);
    assert_eq!(resolve(&spec, &shape, 1), Some(slices(&[("x", vec![1])])));
}

#[test]
fn distinct_groups_orders_by_first_appearance() {
    assert_eq!(
        distinct_groups(&["b", "a", "b", "c", "a"]),
        vec![vec![0, 2], vec![1, 4], vec![3]]
    );
    assert!(distinct_groups::<&str>(&[]).is_empty());
}

#[test]
fn mixed_radix_handles_edges() {
    assert_eq!(mixed_radix(0, &[2, 3]), Some(vec![0, 0]));
    assert_eq!(mixed_radix(5, &[2, 3]), Some(vec![1, 2]));
    assert_eq!(mixed_radix(6, &[2, 3]), None);
    assert_eq!(mixed_radix(0, &[2, 0]), None);
    assert_eq!(product_len(&[usize::MAX, 2]), usize::MAX);
}
