//! Mapping Table: one rename table with a source namespace and one or more
//! destination namespaces.
//!
//! Class names are internal JVM names (`net/example/Outer$Inner`). Each entry
//! stores one name per namespace, source first. An empty destination name
//! means "same as the source name".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::descriptor::remap_descriptor;
use super::MappingError;

/// Index of a namespace within a table (0 is the source namespace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceId(pub usize);

impl NamespaceId {
    pub const SOURCE: NamespaceId = NamespaceId(0);
}

fn name_in(names: &[String], ns: NamespaceId) -> Option<&str> {
    match names.get(ns.0) {
        Some(n) if !n.is_empty() => Some(n),
        _ => names.first().map(String::as_str),
    }
}

/// A field entry. The descriptor is in the source namespace, if known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub names: Vec<String>,
    pub desc: Option<String>,
}

impl FieldEntry {
    pub fn src_name(&self) -> &str {
        name_in(&self.names, NamespaceId::SOURCE).unwrap_or_default()
    }

    pub fn name(&self, ns: NamespaceId) -> Option<&str> {
        name_in(&self.names, ns)
    }
}

/// A method entry. The descriptor is in the source namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodEntry {
    pub names: Vec<String>,
    pub desc: String,
}

impl MethodEntry {
    pub fn src_name(&self) -> &str {
        name_in(&self.names, NamespaceId::SOURCE).unwrap_or_default()
    }

    pub fn name(&self, ns: NamespaceId) -> Option<&str> {
        name_in(&self.names, ns)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub names: Vec<String>,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MethodEntry>,
}

impl ClassEntry {
    pub fn new(names: Vec<String>) -> Self {
        ClassEntry {
            names,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn src_name(&self) -> &str {
        name_in(&self.names, NamespaceId::SOURCE).unwrap_or_default()
    }

    /// Name in `ns`, falling back to the source name when unset.
    pub fn name(&self, ns: NamespaceId) -> Option<&str> {
        name_in(&self.names, ns)
    }

    /// Field by source name; the descriptor narrows the match when both sides
    /// have one.
    pub fn field(&self, name: &str, desc: Option<&str>) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| {
            f.src_name() == name
                && match (desc, f.desc.as_deref()) {
                    (Some(want), Some(have)) => want == have,
                    _ => true,
                }
        })
    }

    /// Method by source name and exact source descriptor.
    pub fn method(&self, name: &str, desc: &str) -> Option<&MethodEntry> {
        self.methods
            .iter()
            .find(|m| m.src_name() == name && m.desc == desc)
    }

    /// All overloads with the given source name.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodEntry> + 'a {
        self.methods.iter().filter(move |m| m.src_name() == name)
    }
}

/// One parsed mapping file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTable {
    namespaces: Vec<String>,
    classes: BTreeMap<String, ClassEntry>,
}

impl MappingTable {
    /// Create an empty table. The first namespace is the source.
    pub fn new(namespaces: Vec<String>) -> Result<Self, MappingError> {
        if namespaces.len() < 2 {
            return Err(MappingError::TooFewNamespaces {
                found: namespaces.len(),
            });
        }
        Ok(MappingTable {
            namespaces,
            classes: BTreeMap::new(),
        })
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn source_namespace(&self) -> &str {
        self.namespaces.first().map(String::as_str).unwrap_or_default()
    }

    pub fn namespace_id(&self, name: &str) -> Result<NamespaceId, MappingError> {
        self.namespaces
            .iter()
            .position(|n| n == name)
            .map(NamespaceId)
            .ok_or_else(|| MappingError::UnknownNamespace {
                namespace: name.to_string(),
                available: self.namespaces.clone(),
            })
    }

    /// Insert or replace a class entry keyed by its source name.
    pub fn insert_class(&mut self, entry: ClassEntry) {
        self.classes.insert(entry.src_name().to_string(), entry);
    }

    /// Mutable access for loaders that add members after the class line.
    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassEntry> {
        self.classes.get_mut(name)
    }

    pub fn get_class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes.values()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// A copy of this table keyed by `ns` instead of the source namespace.
    ///
    /// Names are reordered so `ns` comes first and descriptors are translated
    /// into `ns`.
    pub fn with_source(&self, ns: NamespaceId) -> Result<MappingTable, MappingError> {
        if ns.0 >= self.namespaces.len() {
            return Err(MappingError::UnknownNamespace {
                namespace: format!("#{}", ns.0),
                available: self.namespaces.clone(),
            });
        }
        if ns == NamespaceId::SOURCE {
            return Ok(self.clone());
        }
        let reorder = |names: &[String]| -> Vec<String> {
            let mut out: Vec<String> = (0..self.namespaces.len())
                .map(|i| name_in(names, NamespaceId(i)).unwrap_or_default().to_string())
                .collect();
            out.swap(0, ns.0);
            out
        };
        let mut namespaces = self.namespaces.clone();
        namespaces.swap(0, ns.0);
        let mut table = MappingTable::new(namespaces)?;
        for class in self.classes.values() {
            let mut entry = ClassEntry::new(reorder(&class.names));
            entry.fields = class
                .fields
                .iter()
                .map(|f| FieldEntry {
                    names: reorder(&f.names),
                    desc: f.desc.as_deref().map(|d| self.map_desc(d, ns)),
                })
                .collect();
            entry.methods = class
                .methods
                .iter()
                .map(|m| MethodEntry {
                    names: reorder(&m.names),
                    desc: self.map_desc(&m.desc, ns),
                })
                .collect();
            table.insert_class(entry);
        }
        Ok(table)
    }

    /// Translate a source-namespace descriptor into `ns` using this table's
    /// class entries. Unparseable descriptors are returned unchanged.
    pub fn map_desc(&self, desc: &str, ns: NamespaceId) -> String {
        remap_descriptor(desc, |class| {
            self.get_class(class)
                .and_then(|c| c.name(ns))
                .map(str::to_string)
        })
        .unwrap_or_else(|_| desc.to_string())
    }
}
