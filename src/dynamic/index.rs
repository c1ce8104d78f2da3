// src/dynamic/index.rs

//! Mapping a sub-target's ordinal back to the elements it consumes.
//!
//! Ordinals and positions are 0-based.

use std::collections::{BTreeMap, HashMap};

use crate::dynamic::DynamicSpec;

/// Element positions per variable consumed by one sub-target.
pub type Slices = BTreeMap<String, Vec<usize>>;

/// What the resolver needs to know about a dynamic target's dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutShape {
    /// Element count of every variable in `DynamicSpec::all_vars`.
    pub sizes: BTreeMap<String, usize>,
    /// For a grouped `Combine`: element positions of each distinct grouping
    /// value, in order of first appearance.
    pub groups: Option<Vec<Vec<usize>>>,
}

impl FanoutShape {
    pub fn size_of(&self, var: &str) -> usize {
        self.sizes.get(var).copied().unwrap_or(0)
    }

    /// Sizes of `vars`, in the given order.
    pub fn radices(&self, vars: &[&str]) -> Vec<usize> {
        vars.iter().map(|v| self.size_of(v)).collect()
    }
}

/// Decompose `ordinal` into one digit per radix, last radix varying fastest.
///
/// Returns `None` if `ordinal` lies past the end of the product.
pub fn mixed_radix(ordinal: usize, radices: &[usize]) -> Option<Vec<usize>> {
    if ordinal >= product_len(radices) {
        return None;
    }
    let mut rest = ordinal;
    let mut digits = vec![0; radices.len()];
    for (slot, &radix) in digits.iter_mut().zip(radices).rev() {
        *slot = rest % radix;
        rest /= radix;
    }
    Some(digits)
}

/// Number of rows in the Cartesian product (saturating).
pub fn product_len(radices: &[usize]) -> usize {
    radices
        .iter()
        .try_fold(1usize, |acc, &r| acc.checked_mul(r))
        .unwrap_or(usize::MAX)
}

/// Group element positions by equal keys, groups ordered by first appearance.
pub fn distinct_groups<K: AsRef<str>>(keys: &[K]) -> Vec<Vec<usize>> {
    let mut order: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (pos, key) in keys.iter().enumerate() {
        let slot = *order.entry(key.as_ref()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(pos);
    }
    groups
}

/// Resolve the element positions each variable contributes to sub-target
/// `ordinal`.
///
/// Both `ordinal` and the returned positions are 0-based: the first
/// sub-target is ordinal 0 and consumes position 0 of a mapped variable.
/// Callers numbering sub-targets from 1 subtract one before resolving.
/// For `cross` over `a` (2 elements) and `b` (3 elements), ordinal 4 yields
/// `a -> [1]`, `b -> [1]`.
///
/// Returns `None` if the ordinal is out of range for the shape.
pub fn resolve(spec: &DynamicSpec, shape: &FanoutShape, ordinal: usize) -> Option<Slices> {
    let vars = spec.which_vars();
    match spec {
        DynamicSpec::Map { .. } => {
            if vars.iter().any(|v| ordinal >= shape.size_of(v)) {
                return None;
            }
            Some(same_position(&vars, ordinal))
        }
        DynamicSpec::Cross { .. } => {
            let digits = mixed_radix(ordinal, &shape.radices(&vars))?;
            Some(
                vars.iter()
                    .zip(digits)
                    .map(|(v, d)| (v.to_string(), vec![d]))
                    .collect(),
            )
        }
        DynamicSpec::Combine { .. } => match (&shape.groups, spec.which_by()) {
            (Some(groups), Some(by)) => {
                let positions = groups.get(ordinal)?;
                Some(
                    vars.iter()
                        .chain(std::iter::once(&by))
                        .map(|v| (v.to_string(), positions.clone()))
                        .collect(),
                )
            }
            _ => {
                if vars.iter().any(|v| ordinal >= shape.size_of(v)) {
                    return None;
                }
                Some(same_position(&vars, ordinal))
            }
        },
    }
}

fn same_position(vars: &[&str], ordinal: usize) -> Slices {
    vars.iter().map(|v| (v.to_string(), vec![ordinal])).collect()
}
