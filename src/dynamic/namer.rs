// src/dynamic/namer.rs

//! Deterministic sub-target names.
//!
//! Names are derived purely from the per-element digests of the variables a
//! dynamic target fans out over, so unchanged inputs reproduce the same
//! names (and therefore the same cache entries).

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::dynamic::DynamicSpec;
use crate::dynamic::index::{distinct_groups, mixed_radix, product_len};
use crate::errors::{BranchdagError, Result};

/// Number of hex characters kept from a composite key's digest.
pub const SHORT_HASH_LEN: usize = 8;

const KEY_SEPARATOR: &str = "|";

/// Per-variable element digests, keyed by variable name.
pub type DigestLists = BTreeMap<String, Vec<String>>;

/// Compute the ordered sub-target names of `target`.
///
/// `digests` must hold an entry for every variable in `spec.all_vars()`.
/// With `max_expand`, only the first `max_expand` names are produced.
pub fn subtarget_names(
    target: &str,
    spec: &DynamicSpec,
    digests: &DigestLists,
    max_expand: Option<usize>,
) -> Result<Vec<String>> {
    let keys = composite_keys(target, spec, digests, max_expand)?;
    let names = keys
        .iter()
        .map(|key| format!("{target}_{}", short_hash(key)))
        .collect();
    let names = make_unique(names);
    debug!(
        name = %target,
        spec = %spec,
        count = names.len(),
        "computed sub-target names"
    );
    Ok(names)
}

/// Build one composite key per sub-target by combining element digests as
/// `spec` prescribes.
pub fn composite_keys(
    target: &str,
    spec: &DynamicSpec,
    digests: &DigestLists,
    max_expand: Option<usize>,
) -> Result<Vec<String>> {
    let vars = spec.which_vars();
    let lists = lists_for(target, &vars, digests)?;
    let cap = max_expand.unwrap_or(usize::MAX);

    let keys = match spec {
        DynamicSpec::Map { .. } => {
            let len = equal_length(target, &vars, &lists)?;
            zip_keys(&lists, len.min(cap))
        }
        DynamicSpec::Cross { .. } => {
            let radices: Vec<usize> = lists.iter().map(|l| l.len()).collect();
            let total = product_len(&radices).min(cap);
            (0..total)
                .filter_map(|ordinal| mixed_radix(ordinal, &radices))
                .map(|digits| {
                    lists
                        .iter()
                        .zip(digits)
                        .map(|(list, d)| list[d].as_str())
                        .collect::<Vec<_>>()
                        .join(KEY_SEPARATOR)
                })
                .collect()
        }
        DynamicSpec::Combine { .. } => match spec.which_by() {
            None => {
                let len = equal_length(target, &vars, &lists)?;
                zip_keys(&lists, len.min(cap))
            }
            Some(by) => {
                let by_list = lists_for(target, &[by], digests)?.remove(0);
                let mut all_vars = vars.clone();
                all_vars.push(by);
                let mut all_lists = lists.clone();
                all_lists.push(by_list);
                equal_length(target, &all_vars, &all_lists)?;

                distinct_groups(by_list)
                    .into_iter()
                    .take(cap)
                    .map(|positions| {
                        positions
                            .iter()
                            .flat_map(|&p| all_lists.iter().map(move |l| l[p].as_str()))
                            .collect::<Vec<_>>()
                            .join(KEY_SEPARATOR)
                    })
                    .collect()
            }
        },
    };
    Ok(keys)
}

/// Shortened digest of a composite key.
pub fn short_hash(key: &str) -> String {
    let hex = blake3::hash(key.as_bytes()).to_hex();
    hex.as_str()[..SHORT_HASH_LEN].to_string()
}

/// Make names unique by suffixing later duplicates with `_1`, `_2`, ...
///
/// A name's final form only depends on the names before it, so truncating
/// the input truncates the output the same way.
pub fn make_unique(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 0;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{name}_{n}");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn lists_for<'a>(
    target: &str,
    vars: &[&str],
    digests: &'a DigestLists,
) -> Result<Vec<&'a [String]>> {
    vars.iter()
        .map(|v| {
            digests.get(*v).map(|l| l.as_slice()).ok_or_else(|| {
                BranchdagError::InvalidDynamic(format!(
                    "no element digests for variable '{v}' of target '{target}'"
                ))
            })
        })
        .collect()
}

fn equal_length(target: &str, vars: &[&str], lists: &[&[String]]) -> Result<usize> {
    let first = lists.first().map(|l| l.len()).unwrap_or(0);
    if lists.iter().all(|l| l.len() == first) {
        return Ok(first);
    }
    let details = vars
        .iter()
        .zip(lists)
        .map(|(v, l)| format!("{v} ({})", l.len()))
        .collect::<Vec<_>>()
        .join(", ");
    Err(BranchdagError::ArityMismatch {
        target: target.to_string(),
        details,
    })
}

fn zip_keys(lists: &[&[String]], len: usize) -> Vec<String> {
    (0..len)
        .map(|i| {
            lists
                .iter()
                .map(|l| l[i].as_str())
                .collect::<Vec<_>>()
                .join(KEY_SEPARATOR)
        })
        .collect()
}
