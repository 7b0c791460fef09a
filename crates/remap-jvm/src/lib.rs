//! JVM artifact adapters for remap.
//!
//! This crate provides:
//! - The source model a host supplies and the reference resolver over it
//! - Structured member target parsing and resolution
//! - Adapters for Java and Kotlin sources, Mixin annotations, class tweakers,
//!   `fabric.mod.json` and mixin configs

pub mod class_tweaker;
pub mod java;
pub mod json;
pub mod kotlin;
pub mod mixin;
pub mod mixin_config;
pub mod mod_json;
pub mod model;
pub mod resolver;
pub mod target;

use std::sync::Arc;

use remap_core::stage::Adapter;

pub use class_tweaker::ClassTweakerAdapter;
pub use java::JavaAdapter;
pub use kotlin::KotlinAdapter;
pub use mixin::MixinAdapter;
pub use mixin_config::MixinConfigAdapter;
pub use mod_json::ModJsonAdapter;
pub use model::SourceIndex;
pub use resolver::{ReferenceResolver, SymbolTable};

/// Every JVM adapter, in the order they run on an artifact.
///
/// Java runs before Mixin on the same file so declaration renames land
/// first and Mixin string edits never overlap them.
pub fn default_adapters(resolver: Arc<dyn ReferenceResolver>) -> Vec<Arc<dyn Adapter>> {
    vec![
        Arc::new(JavaAdapter::new(resolver.clone())),
        Arc::new(KotlinAdapter::new(resolver.clone())),
        Arc::new(MixinAdapter::new(resolver)),
        Arc::new(ClassTweakerAdapter::new()),
        Arc::new(ModJsonAdapter::new()),
        Arc::new(MixinConfigAdapter::new()),
    ]
}
