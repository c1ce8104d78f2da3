// src/value/subset.rs

//! Slicing a payload by element positions.

use tracing::trace;

use super::{Array, Payload, Table};

/// Return the sub-payload made of the elements at `positions` (0-based, in
/// the given order).
///
/// - tables keep their columns and select rows
/// - arrays keep their trailing dimensions and select along the leading one
/// - sequences and dynamic payloads select elements
///
/// Positions past the end are skipped.
pub fn subset(payload: &Payload, positions: &[usize]) -> Payload {
    trace!(kind = payload.kind(), n = positions.len(), "subsetting payload");

    match payload {
        Payload::Table(t) => Payload::Table(Table {
            columns: t.columns.clone(),
            rows: pick(&t.rows, positions),
        }),
        Payload::Array(a) => {
            let kept: Vec<usize> = positions
                .iter()
                .copied()
                .filter(|&i| i < a.leading())
                .collect();
            let mut shape = a.shape().to_vec();
            shape[0] = kept.len();
            let data = kept.iter().flat_map(|&i| a.row(i).iter().cloned()).collect();
            Payload::Array(Array { shape, data })
        }
        Payload::Seq(items) => Payload::Seq(pick(items, positions)),
        Payload::Dynamic(parts) => Payload::Dynamic(pick(parts, positions)),
    }
}

fn pick<T: Clone>(items: &[T], positions: &[usize]) -> Vec<T> {
    positions
        .iter()
        .filter_map(|&i| items.get(i).cloned())
        .collect()
}

