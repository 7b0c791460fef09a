//! Mapping Chain: ordered hops composed into one old→new function.
//!
//! Each hop looks up the name produced by the previous hop. A hop that has no
//! entry for the current owner (or member) makes the whole lookup
//! `Unresolved`; it never falls back to the original name.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::table::{MappingTable, NamespaceId};
use super::MappingError;

/// Outcome of resolving one symbol through the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Resolution {
    /// Every hop resolved and the final name differs from the original.
    Renamed(String),
    /// Every hop resolved and the final name equals the original.
    Unchanged,
    /// Some hop had no entry.
    Unresolved,
}

impl Resolution {
    fn from_walk(original: &str, result: Option<String>) -> Resolution {
        match result {
            Some(name) if name == original => Resolution::Unchanged,
            Some(name) => Resolution::Renamed(name),
            None => Resolution::Unresolved,
        }
    }

    /// The new name, only when renamed.
    pub fn new_name(&self) -> Option<&str> {
        match self {
            Resolution::Renamed(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved)
    }

    /// The name to use: the new name when renamed, otherwise `original`.
    pub fn name_or<'a>(&'a self, original: &'a str) -> &'a str {
        self.new_name().unwrap_or(original)
    }
}

/// One hop: a table keyed by its source namespace and the destination
/// namespace to read.
#[derive(Debug, Clone)]
pub struct Hop {
    table: Arc<MappingTable>,
    dest: NamespaceId,
}

impl Hop {
    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn source_namespace(&self) -> &str {
        self.table.source_namespace()
    }

    pub fn dest_namespace(&self) -> &str {
        self.table
            .namespaces()
            .get(self.dest.0)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingChain {
    hops: Vec<Hop>,
}

impl MappingChain {
    pub fn new() -> Self {
        MappingChain::default()
    }

    /// Append a hop reading `table` from namespace `from` to namespace `to`.
    ///
    /// If `from` is not the table's source namespace the table is re-keyed.
    pub fn push(&mut self, table: &MappingTable, from: &str, to: &str) -> Result<(), MappingError> {
        let from_id = table.namespace_id(from)?;
        let to_id = table.namespace_id(to)?;
        let (table, dest) = if from_id == NamespaceId::SOURCE {
            (table.clone(), to_id)
        } else {
            // Swapping `from` into slot 0 moves the old source into `from`'s slot.
            let dest = if to_id == NamespaceId::SOURCE {
                from_id
            } else {
                to_id
            };
            (table.with_source(from_id)?, dest)
        };
        if let Some(prev) = self.hops.last() {
            if prev.dest_namespace() != table.source_namespace() {
                debug!(
                    prev = prev.dest_namespace(),
                    next = table.source_namespace(),
                    "chain hop namespaces do not line up"
                );
            }
        }
        self.hops.push(Hop {
            table: Arc::new(table),
            dest,
        });
        Ok(())
    }

    /// Builder form of [`MappingChain::push`].
    pub fn with_hop(mut self, table: &MappingTable, from: &str, to: &str) -> Result<Self, MappingError> {
        self.push(table, from, to)?;
        Ok(self)
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Namespace the chain ends in, if it has any hops.
    pub fn final_namespace(&self) -> Option<&str> {
        self.hops.last().map(Hop::dest_namespace)
    }

    pub fn resolve_class(&self, old: &str) -> Resolution {
        Resolution::from_walk(old, self.walk_class(old))
    }

    pub fn resolve_field(&self, old_class: &str, old_field: &str) -> Resolution {
        self.resolve_typed_field(old_class, old_field, None)
    }

    /// Like [`resolve_field`](Self::resolve_field), but a field entry that
    /// lists a descriptor must match `desc` at every hop.
    pub fn resolve_typed_field(&self, old_class: &str, old_field: &str, desc: Option<&str>) -> Resolution {
        let mut class = old_class.to_string();
        let mut field = old_field.to_string();
        let mut desc = desc.map(str::to_string);
        for hop in &self.hops {
            let Some(entry) = hop.table.get_class(&class) else {
                return Resolution::Unresolved;
            };
            let Some(f) = entry.field(&field, desc.as_deref()) else {
                return Resolution::Unresolved;
            };
            field = f.name(hop.dest).unwrap_or_default().to_string();
            desc = desc.map(|d| hop.table.map_desc(&d, hop.dest));
            class = entry.name(hop.dest).unwrap_or_default().to_string();
        }
        Resolution::from_walk(old_field, Some(field))
    }

    pub fn resolve_method(&self, old_class: &str, old_name: &str, desc: &str) -> Resolution {
        let mut class = old_class.to_string();
        let mut name = old_name.to_string();
        let mut desc = desc.to_string();
        for hop in &self.hops {
            let Some(entry) = hop.table.get_class(&class) else {
                return Resolution::Unresolved;
            };
            let Some(m) = entry.method(&name, &desc) else {
                return Resolution::Unresolved;
            };
            name = m.name(hop.dest).unwrap_or_default().to_string();
            desc = hop.table.map_desc(&desc, hop.dest);
            class = entry.name(hop.dest).unwrap_or_default().to_string();
        }
        Resolution::from_walk(old_name, Some(name))
    }

    /// Whether the first hop knows the class at all.
    pub fn knows_class(&self, old: &str) -> bool {
        self.hops
            .first()
            .is_some_and(|hop| hop.table.get_class(old).is_some())
    }

    /// Whether the first hop has a field entry of that name.
    pub fn knows_field(&self, old_class: &str, old_field: &str) -> bool {
        self.hops.first().is_some_and(|hop| {
            hop.table
                .get_class(old_class)
                .is_some_and(|c| c.field(old_field, None).is_some())
        })
    }

    /// Every overload the first hop lists under `old_name`, each resolved
    /// through the whole chain.
    pub fn method_overloads(&self, old_class: &str, old_name: &str) -> Vec<(String, Resolution)> {
        let Some(entry) = self.hops.first().and_then(|h| h.table.get_class(old_class)) else {
            return Vec::new();
        };
        entry
            .methods_named(old_name)
            .map(|m| {
                (
                    m.desc.clone(),
                    self.resolve_method(old_class, old_name, &m.desc),
                )
            })
            .collect()
    }

    fn walk_class(&self, old: &str) -> Option<String> {
        let mut current = old.to_string();
        for hop in &self.hops {
            current = hop.table.get_class(&current)?.name(hop.dest)?.to_string();
        }
        Some(current)
    }
}
