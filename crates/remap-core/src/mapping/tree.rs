//! Mutable Mapping Tree: a memoized per-class view of a [`MappingChain`]
//! plus layers of facts synthesized by earlier rounds.
//!
//! A tree is immutable for the duration of a round. Stages that discover new
//! facts push them into a [`DeltaTree`]; the coordinator turns a non-empty
//! delta into a new [`FactLayer`] and builds a fresh tree on top of it for the
//! next round. Lookups consult layers newest-first, then the chain.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tracing::debug;

use super::chain::{MappingChain, Resolution};
use super::descriptor::remap_descriptor;

// ============================================================================
// Facts
// ============================================================================

/// Identity of a synthesized fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactKey {
    Class { name: String },
    Field { owner: String, name: String },
    Method { owner: String, name: String, desc: String },
}

/// A synthesized rename, keyed by original names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fact {
    pub key: FactKey,
    pub new_name: String,
}

impl Fact {
    pub fn class(name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Fact {
            key: FactKey::Class { name: name.into() },
            new_name: new_name.into(),
        }
    }

    pub fn field(owner: impl Into<String>, name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Fact {
            key: FactKey::Field {
                owner: owner.into(),
                name: name.into(),
            },
            new_name: new_name.into(),
        }
    }

    pub fn method(
        owner: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Fact {
            key: FactKey::Method {
                owner: owner.into(),
                name: name.into(),
                desc: desc.into(),
            },
            new_name: new_name.into(),
        }
    }
}

/// Read-only facts from one completed round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FactLayer {
    facts: BTreeMap<FactKey, String>,
}

impl FactLayer {
    pub fn get(&self, key: &FactKey) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FactKey, &str)> {
        self.facts.iter().map(|(k, v)| (k, v.as_str()))
    }
}

impl FromIterator<Fact> for FactLayer {
    fn from_iter<I: IntoIterator<Item = Fact>>(iter: I) -> Self {
        FactLayer {
            facts: iter.into_iter().map(|f| (f.key, f.new_name)).collect(),
        }
    }
}

/// Two or more values proposed for the same fact in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactConflict {
    pub key: FactKey,
    pub values: Vec<String>,
}

/// Pending facts for the next round.
///
/// Append-only and safe to share across worker threads; the result does not
/// depend on push order.
#[derive(Debug, Default)]
pub struct DeltaTree {
    pending: Mutex<BTreeMap<FactKey, BTreeSet<String>>>,
}

impl DeltaTree {
    pub fn new() -> Self {
        DeltaTree::default()
    }

    pub fn push(&self, fact: Fact) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.entry(fact.key).or_default().insert(fact.new_name);
    }

    pub fn is_empty(&self) -> bool {
        match self.pending.lock() {
            Ok(guard) => guard.is_empty(),
            Err(poisoned) => poisoned.into_inner().is_empty(),
        }
    }

    /// Split into a layer of agreed facts and the keys with conflicting values.
    pub fn finish(self) -> (FactLayer, Vec<FactConflict>) {
        let pending = match self.pending.into_inner() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut layer = FactLayer::default();
        let mut conflicts = Vec::new();
        for (key, values) in pending {
            if values.len() == 1 {
                if let Some(value) = values.into_iter().next() {
                    layer.facts.insert(key, value);
                }
            } else {
                conflicts.push(FactConflict {
                    key,
                    values: values.into_iter().collect(),
                });
            }
        }
        (layer, conflicts)
    }
}

// ============================================================================
// MappingTree
// ============================================================================

/// Memoized lookups for one original class.
#[derive(Debug)]
pub struct ClassRecord {
    pub old_name: String,
    pub resolution: Resolution,
    fields: RwLock<HashMap<String, Resolution>>,
    methods: RwLock<HashMap<(String, String), Resolution>>,
}

impl ClassRecord {
    pub fn new_name(&self) -> Option<&str> {
        self.resolution.new_name()
    }
}

fn cached<K, F>(cache: &RwLock<HashMap<K, Resolution>>, key: K, compute: F) -> Resolution
where
    K: std::hash::Hash + Eq,
    F: FnOnce() -> Resolution,
{
    if let Ok(read) = cache.read() {
        if let Some(hit) = read.get(&key) {
            return hit.clone();
        }
    }
    let value = compute();
    if let Ok(mut write) = cache.write() {
        write.entry(key).or_insert_with(|| value.clone());
    }
    value
}

/// Per-run mapping context shared by every stage in a round.
#[derive(Debug)]
pub struct MappingTree {
    chain: Arc<MappingChain>,
    layers: Vec<Arc<FactLayer>>,
    classes: RwLock<HashMap<String, Arc<ClassRecord>>>,
}

impl MappingTree {
    pub fn new(chain: Arc<MappingChain>) -> Self {
        MappingTree {
            chain,
            layers: Vec::new(),
            classes: RwLock::new(HashMap::new()),
        }
    }

    /// A fresh tree with `layer` on top of this tree's layers.
    pub fn layered(&self, layer: FactLayer) -> MappingTree {
        let mut layers = self.layers.clone();
        layers.push(Arc::new(layer));
        debug!(depth = layers.len(), "stacked fact layer");
        MappingTree {
            chain: Arc::clone(&self.chain),
            layers,
            classes: RwLock::new(HashMap::new()),
        }
    }

    pub fn chain(&self) -> &MappingChain {
        &self.chain
    }

    pub fn layers(&self) -> &[Arc<FactLayer>] {
        &self.layers
    }

    fn layered_fact(&self, key: &FactKey) -> Option<&str> {
        self.layers.iter().rev().find_map(|layer| layer.get(key))
    }

    /// Memoized record for an original class name.
    pub fn class(&self, old: &str) -> Arc<ClassRecord> {
        if let Ok(read) = self.classes.read() {
            if let Some(record) = read.get(old) {
                return Arc::clone(record);
            }
        }
        let resolution = match self.layered_fact(&FactKey::Class {
            name: old.to_string(),
        }) {
            Some(name) if name == old => Resolution::Unchanged,
            Some(name) => Resolution::Renamed(name.to_string()),
            None => self.chain.resolve_class(old),
        };
        let record = Arc::new(ClassRecord {
            old_name: old.to_string(),
            resolution,
            fields: RwLock::new(HashMap::new()),
            methods: RwLock::new(HashMap::new()),
        });
        match self.classes.write() {
            Ok(mut write) => Arc::clone(write.entry(old.to_string()).or_insert(record)),
            Err(_) => record,
        }
    }

    pub fn class_resolution(&self, old: &str) -> Resolution {
        self.class(old).resolution.clone()
    }

    pub fn new_class_name(&self, old: &str) -> Option<String> {
        self.class(old).new_name().map(str::to_string)
    }

    /// Whether the mapping input knows this class at all.
    pub fn is_mapped_class(&self, old: &str) -> bool {
        self.chain.knows_class(old)
            || self
                .layered_fact(&FactKey::Class {
                    name: old.to_string(),
                })
                .is_some()
    }

    pub fn field_resolution(&self, owner: &str, name: &str) -> Resolution {
        let record = self.class(owner);
        cached(&record.fields, name.to_string(), || {
            let key = FactKey::Field {
                owner: owner.to_string(),
                name: name.to_string(),
            };
            match self.layered_fact(&key) {
                Some(new) if new == name => Resolution::Unchanged,
                Some(new) => Resolution::Renamed(new.to_string()),
                None => self.chain.resolve_field(owner, name),
            }
        })
    }

    /// Field resolution that also checks the descriptor against mapping
    /// entries that list one.
    pub fn typed_field_resolution(&self, owner: &str, name: &str, desc: &str) -> Resolution {
        let key = FactKey::Field {
            owner: owner.to_string(),
            name: name.to_string(),
        };
        match self.layered_fact(&key) {
            Some(new) if new == name => Resolution::Unchanged,
            Some(new) => Resolution::Renamed(new.to_string()),
            None => self.chain.resolve_typed_field(owner, name, Some(desc)),
        }
    }

    pub fn new_field_name(&self, owner: &str, name: &str) -> Option<String> {
        self.field_resolution(owner, name).new_name().map(str::to_string)
    }

    pub fn has_field(&self, owner: &str, name: &str) -> bool {
        self.chain.knows_field(owner, name)
            || self
                .layered_fact(&FactKey::Field {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
                .is_some()
    }

    pub fn method_resolution(&self, owner: &str, name: &str, desc: &str) -> Resolution {
        let record = self.class(owner);
        cached(&record.methods, (name.to_string(), desc.to_string()), || {
            let key = FactKey::Method {
                owner: owner.to_string(),
                name: name.to_string(),
                desc: desc.to_string(),
            };
            match self.layered_fact(&key) {
                Some(new) if new == name => Resolution::Unchanged,
                Some(new) => Resolution::Renamed(new.to_string()),
                None => self.chain.resolve_method(owner, name, desc),
            }
        })
    }

    pub fn new_method_name(&self, owner: &str, name: &str, desc: &str) -> Option<String> {
        self.method_resolution(owner, name, desc)
            .new_name()
            .map(str::to_string)
    }

    /// Every known overload of `owner.name`, from the chain and the layers.
    pub fn method_overloads(&self, owner: &str, name: &str) -> Vec<(String, Resolution)> {
        let mut descs: BTreeSet<String> = self
            .chain
            .method_overloads(owner, name)
            .into_iter()
            .map(|(desc, _)| desc)
            .collect();
        for layer in &self.layers {
            for (key, _) in layer.iter() {
                if let FactKey::Method {
                    owner: o,
                    name: n,
                    desc,
                } = key
                {
                    if o == owner && n == name {
                        descs.insert(desc.clone());
                    }
                }
            }
        }
        descs
            .into_iter()
            .map(|desc| {
                let resolution = self.method_resolution(owner, name, &desc);
                (desc, resolution)
            })
            .collect()
    }

    /// Rewrite every class in a descriptor to its new name. Unparseable
    /// descriptors are returned unchanged.
    pub fn remap_desc(&self, desc: &str) -> String {
        remap_descriptor(desc, |class| self.new_class_name(class)).unwrap_or_else(|_| desc.to_string())
    }

    /// Whether `fact` already holds in this tree, so pushing it again would
    /// not change the next round.
    pub fn holds(&self, fact: &Fact) -> bool {
        let current = match &fact.key {
            FactKey::Class { name } => self.class_resolution(name),
            FactKey::Field { owner, name } => self.field_resolution(owner, name),
            FactKey::Method { owner, name, desc } => self.method_resolution(owner, name, desc),
        };
        let original = match &fact.key {
            FactKey::Class { name } | FactKey::Field { name, .. } | FactKey::Method { name, .. } => name,
        };
        current.name_or(original) == fact.new_name && current.is_resolved()
    }
}
