//! Field identifiers and per-snapshot field catalogs.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between namespace and name in textual field references
/// (e.g. "gas:density").
pub const NAMESPACE_SEPARATOR: char = ':';

/// A field identified by (namespace, name), e.g. ("gas", "density").
///
/// The namespace distinguishes on-disk fields ("boxlib") from derived or
/// particle fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldKey {
    pub namespace: String,
    pub name: String,
}

impl FieldKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse "namespace:name", falling back to `default_namespace` when the
    /// reference carries no separator. Both parts are trimmed.
    pub fn parse(raw: &str, default_namespace: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once(NAMESPACE_SEPARATOR) {
            Some((namespace, name)) => Self::new(namespace.trim(), name.trim()),
            None => Self::new(default_namespace, raw),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, NAMESPACE_SEPARATOR, self.name)
    }
}

/// Ordered, duplicate-free set of fields available in a snapshot, plus the
/// particle types stored alongside it.
///
/// Built once at load time and never mutated.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<FieldKey>,
    index: HashSet<FieldKey>,
    particle_types: Vec<String>,
}

impl FieldCatalog {
    /// Build a catalog, keeping the first occurrence of each field.
    pub fn new<I, P>(fields: I, particle_types: P) -> Self
    where
        I: IntoIterator<Item = FieldKey>,
        P: IntoIterator<Item = String>,
    {
        let mut ordered = Vec::new();
        let mut index = HashSet::new();
        for field in fields {
            if index.insert(field.clone()) {
                ordered.push(field);
            }
        }

        let mut unique: Vec<String> = Vec::new();
        for ptype in particle_types {
            if !unique.contains(&ptype) {
                unique.push(ptype);
            }
        }

        Self {
            fields: ordered,
            index,
            particle_types: unique,
        }
    }

    pub fn contains(&self, field: &FieldKey) -> bool {
        self.index.contains(field)
    }

    pub fn fields(&self) -> &[FieldKey] {
        &self.fields
    }

    pub fn first(&self) -> Option<&FieldKey> {
        self.fields.first()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn particle_types(&self) -> &[String] {
        &self.particle_types
    }

    pub fn has_particle_type(&self, ptype: &str) -> bool {
        self.particle_types.iter().any(|p| p == ptype)
    }
}
