// src/value/mod.rs

//! Target values.
//!
//! A [`Value`] is a [`Payload`] plus an optional [`Trace`]. Payloads come in
//! a closed set of shapes:
//!
//! - [`Payload::Table`]: row-oriented table, one element per row.
//! - [`Payload::Array`]: row-major n-d array, one element per leading index.
//! - [`Payload::Seq`]: flat sequence of JSON elements.
//! - [`Payload::Dynamic`]: the aggregated values of a dynamic target's
//!   sub-targets, one element per sub-target.
//!
//! Everything the naming code needs from a payload goes through the
//! [`Elements`] capability (element count + per-element digest).

pub mod subset;

use std::collections::BTreeMap;

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::errors::{BranchdagError, Result};

/// Row-oriented table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Json>>,
}

/// Row-major array; `shape[0]` is the leading (fan-out) dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArrayParts")]
pub struct Array {
    shape: Vec<usize>,
    data: Vec<Json>,
}

/// Unchecked serialized form of an [`Array`].
#[derive(Deserialize)]
struct ArrayParts {
    shape: Vec<usize>,
    data: Vec<Json>,
}

impl TryFrom<ArrayParts> for Array {
    type Error = BranchdagError;

    fn try_from(parts: ArrayParts) -> Result<Self> {
        Array::new(parts.shape, parts.data)
    }
}

impl Array {
    pub fn new(shape: Vec<usize>, data: Vec<Json>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(BranchdagError::ConfigError(format!(
                "array shape {:?} does not match {} data elements",
                shape,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[Json] {
        &self.data
    }

    /// Number of data elements under one leading index.
    pub fn row_stride(&self) -> usize {
        self.shape[1..].iter().product()
    }

    pub fn leading(&self) -> usize {
        self.shape[0]
    }

    /// Data of the `i`-th slice along the leading dimension.
    pub fn row(&self, i: usize) -> &[Json] {
        let stride = self.row_stride();
        &self.data[i * stride..(i + 1) * stride]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Payload {
    Table(Table),
    Array(Array),
    Seq(Vec<Json>),
    Dynamic(Vec<Payload>),
}

/// Provenance attached to an aggregated value: trace variable name mapped to
/// one grouping value per sub-target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace(BTreeMap<String, Vec<Json>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Json>) {
        self.0.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[Json]> {
        self.0.get(name).map(|v| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A computed target value with optional trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Trace>,
}

impl Value {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            trace: None,
        }
    }

    pub fn with_trace(payload: Payload, trace: Option<Trace>) -> Self {
        Self { payload, trace }
    }

    pub fn seq<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Json>,
    {
        Self::new(Payload::Seq(items.into_iter().map(Into::into).collect()))
    }

    /// Trace entries recorded under `name`, if any.
    pub fn trace_of(&self, name: &str) -> Option<&[Json]> {
        self.trace.as_ref()?.get(name)
    }
}

/// Element count and per-element content digest.
///
/// The naming and trace code only relies on this capability, never on a
/// concrete payload shape.
pub trait Elements {
    fn element_count(&self) -> usize;
    fn element_digest(&self, i: usize) -> String;

    fn element_digests(&self) -> Vec<String> {
        (0..self.element_count())
            .map(|i| self.element_digest(i))
            .collect()
    }
}

impl Elements for Payload {
    fn element_count(&self) -> usize {
        match self {
            Payload::Table(t) => t.rows.len(),
            Payload::Array(a) => a.leading(),
            Payload::Seq(items) => items.len(),
            Payload::Dynamic(parts) => parts.len(),
        }
    }

    fn element_digest(&self, i: usize) -> String {
        let mut hasher = Hasher::new();
        match self {
            Payload::Table(t) => {
                for col in &t.columns {
                    hasher.update(col.as_bytes());
                    hasher.update(b"\0");
                }
                hash_json_slice(&mut hasher, &t.rows[i]);
            }
            Payload::Array(a) => {
                for dim in &a.shape()[1..] {
                    hasher.update(&dim.to_le_bytes());
                }
                hash_json_slice(&mut hasher, a.row(i));
            }
            Payload::Seq(items) => {
                hasher.update(items[i].to_string().as_bytes());
            }
            Payload::Dynamic(parts) => {
                hasher.update(parts[i].digest().as_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Digest of a set of named inputs, used to tell whether a cached static
/// target was built from the current content of its dependencies.
pub fn inputs_digest(inputs: &BTreeMap<String, Payload>) -> String {
    let mut hasher = Hasher::new();
    for (name, payload) in inputs {
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(payload.digest().as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn hash_json_slice(hasher: &mut Hasher, items: &[Json]) {
    for item in items {
        hasher.update(item.to_string().as_bytes());
        hasher.update(b"\x1f");
    }
}

impl Payload {
    /// Short shape name used in logs and digests.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Table(_) => "table",
            Payload::Array(_) => "array",
            Payload::Seq(_) => "seq",
            Payload::Dynamic(_) => "dynamic",
        }
    }

    /// Content digest of the whole payload.
    pub fn digest(&self) -> String {
        let mut hasher = Hasher::new();
        hasher.update(self.kind().as_bytes());
        if let Payload::Array(a) = self {
            for dim in a.shape() {
                hasher.update(&dim.to_le_bytes());
            }
        }
        for d in self.element_digests() {
            hasher.update(d.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Reassemble a `Dynamic` payload into a single value of its parts' shape.
    ///
    /// Non-dynamic payloads are returned unchanged.
    pub fn flatten(&self) -> Payload {
        let parts = match self {
            Payload::Dynamic(parts) => parts,
            other => return other.clone(),
        };
        let parts: Vec<Payload> = parts.iter().map(Payload::flatten).collect();

        if parts.iter().all(|p| matches!(p, Payload::Seq(_))) {
            let items = parts
                .into_iter()
                .flat_map(|p| match p {
                    Payload::Seq(items) => items,
                    _ => Vec::new(),
                })
                .collect();
            return Payload::Seq(items);
        }

        if let Some(table) = concat_tables(&parts) {
            return Payload::Table(table);
        }
        if let Some(array) = concat_arrays(&parts) {
            return Payload::Array(array);
        }

        Payload::Seq(parts.iter().flat_map(Payload::elements_as_json).collect())
    }

    /// Each element rendered as a JSON value (rows as objects, array slices
    /// as JSON arrays). Dynamic payloads are flattened first.
    pub fn elements_as_json(&self) -> Vec<Json> {
        match self {
            Payload::Seq(items) => items.clone(),
            Payload::Table(t) => t
                .rows
                .iter()
                .map(|row| {
                    let obj = t
                        .columns
                        .iter()
                        .cloned()
                        .zip(row.iter().cloned())
                        .collect::<serde_json::Map<_, _>>();
                    Json::Object(obj)
                })
                .collect(),
            Payload::Array(a) => {
                if a.row_stride() == 1 {
                    a.data().to_vec()
                } else {
                    (0..a.leading())
                        .map(|i| Json::Array(a.row(i).to_vec()))
                        .collect()
                }
            }
            // `flatten` never yields another `Dynamic`.
            Payload::Dynamic(_) => self.flatten().elements_as_json(),
        }
    }
}

fn concat_tables(parts: &[Payload]) -> Option<Table> {
    let mut columns: Option<&Vec<String>> = None;
    let mut rows = Vec::new();
    for part in parts {
        let Payload::Table(t) = part else {
            return None;
        };
        match columns {
            Some(cols) if cols != &t.columns => return None,
            Some(_) => {}
            None => columns = Some(&t.columns),
        }
        rows.extend(t.rows.iter().cloned());
    }
    Some(Table {
        columns: columns?.clone(),
        rows,
    })
}

fn concat_arrays(parts: &[Payload]) -> Option<Array> {
    let mut trailing: Option<&[usize]> = None;
    let mut leading = 0;
    let mut data = Vec::new();
    for part in parts {
        let Payload::Array(a) = part else {
            return None;
        };
        match trailing {
            Some(t) if t != &a.shape()[1..] => return None,
            Some(_) => {}
            None => trailing = Some(&a.shape()[1..]),
        }
        leading += a.leading();
        data.extend(a.data().iter().cloned());
    }
    let mut shape = vec![leading];
    shape.extend_from_slice(trailing?);
    Some(Array { shape, data })
}
