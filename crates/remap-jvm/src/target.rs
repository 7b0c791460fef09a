//! Structured member targets: `[L<owner>;]<name>[(<params>)<ret> | :<desc>]`.
//!
//! These strings appear in Mixin injector selectors and `@At` targets. A
//! parsed [`Target`] keeps the original spelling so that `to_string()`
//! reproduces the input byte-for-byte when nothing is renamed.

use std::fmt;

use thiserror::Error;
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::prelude::*;
use winnow::token::{rest, take_till};
use winnow::ModalResult;

use remap_core::ambiguity::{Candidates, Decision};
use remap_core::diagnostic::Candidate;
use remap_core::mapping::descriptor::parse_descriptor;
use remap_core::mapping::tree::MappingTree;

/// Member names that are never renamed.
pub const SPECIAL_METHODS: &[&str] = &["<init>", "<clinit>"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("unsupported target '{target}': {reason}")]
    Unsupported { target: String, reason: String },

    #[error("invalid target '{target}': {message}")]
    Invalid { target: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDesc {
    /// `(params)ret`, stored with its parentheses.
    Method(String),
    /// Field descriptor after the `:`.
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Internal owner name when written as `L<owner>;`.
    pub owner: Option<String>,
    pub name: String,
    pub desc: Option<TargetDesc>,
}

/// What kind of member a target may denote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Field,
    /// Methods and fields (entrypoint-style references).
    Any,
}

/// Outcome of [`Target::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    Resolved(Target),
    Ambiguous(Vec<Candidate>),
    /// No explicit owner and no owner from context.
    NoOwner,
}

impl Target {
    pub fn parse(input: &str) -> Result<Target, TargetError> {
        let unsupported = |reason: &str| TargetError::Unsupported {
            target: input.to_string(),
            reason: reason.to_string(),
        };
        if input.contains('*') {
            return Err(unsupported("wildcard targets are not supported"));
        }
        if input.starts_with('/') {
            return Err(unsupported("regex targets are not supported"));
        }
        if input.chars().any(char::is_whitespace) {
            return Err(unsupported("targets with whitespace are not supported"));
        }

        let target = target.parse(input).map_err(|e| TargetError::Invalid {
            target: input.to_string(),
            message: format!("{:?}", e),
        })?;
        if let Some(desc) = &target.desc {
            parse_descriptor(desc.as_str()).map_err(|e| TargetError::Invalid {
                target: input.to_string(),
                message: e.message,
            })?;
        }
        Ok(target)
    }

    pub fn is_special(&self) -> bool {
        SPECIAL_METHODS.contains(&self.name.as_str())
    }

    fn kind(&self, default: MemberKind) -> MemberKind {
        match self.desc {
            Some(TargetDesc::Method(_)) => MemberKind::Method,
            Some(TargetDesc::Field(_)) => MemberKind::Field,
            None => default,
        }
    }

    /// Rewrite owner, member name and descriptor classes.
    ///
    /// `context_owners` are the owners to try when the target omits one.
    /// Every owner proposes a name and the ambiguity rule decides.
    pub fn resolve(&self, tree: &MappingTree, context_owners: &[String], default_kind: MemberKind) -> TargetResolution {
        let owners: Vec<&str> = match &self.owner {
            Some(owner) => vec![owner.as_str()],
            None => context_owners.iter().map(String::as_str).collect(),
        };
        if owners.is_empty() {
            return TargetResolution::NoOwner;
        }

        let name = if self.is_special() {
            self.name.clone()
        } else {
            let candidates = self.member_candidates(tree, &owners, default_kind);
            match candidates.decide(&self.name) {
                Decision::Keep => self.name.clone(),
                Decision::Rename(name) => name,
                Decision::Ambiguous(list) => return TargetResolution::Ambiguous(list),
            }
        };

        TargetResolution::Resolved(Target {
            owner: self
                .owner
                .as_ref()
                .map(|o| tree.new_class_name(o).unwrap_or_else(|| o.clone())),
            name,
            desc: self.desc.as_ref().map(|d| match d {
                TargetDesc::Method(m) => TargetDesc::Method(tree.remap_desc(m)),
                TargetDesc::Field(f) => TargetDesc::Field(tree.remap_desc(f)),
            }),
        })
    }

    fn member_candidates(&self, tree: &MappingTree, owners: &[&str], default_kind: MemberKind) -> Candidates {
        let mut candidates = Candidates::new();
        let name = self.name.as_str();
        let kind = self.kind(default_kind);
        for owner in owners {
            match &self.desc {
                Some(TargetDesc::Method(desc)) => {
                    let resolution = tree.method_resolution(owner, name, desc);
                    if resolution.is_resolved() {
                        candidates.push(format!("{}.{}{}", owner, name, desc), resolution.name_or(name));
                    }
                }
                Some(TargetDesc::Field(desc)) => {
                    let resolution = tree.typed_field_resolution(owner, name, desc);
                    if resolution.is_resolved() {
                        candidates.push(format!("{}.{}:{}", owner, name, desc), resolution.name_or(name));
                    }
                }
                _ => {
                    if kind != MemberKind::Field {
                        for (desc, resolution) in tree.method_overloads(owner, name) {
                            if resolution.is_resolved() {
                                candidates.push(format!("{}.{}{}", owner, name, desc), resolution.name_or(name));
                            }
                        }
                    }
                    if kind != MemberKind::Method && tree.has_field(owner, name) {
                        let resolution = tree.field_resolution(owner, name);
                        if resolution.is_resolved() {
                            candidates.push(format!("{}.{}", owner, name), resolution.name_or(name));
                        }
                    }
                }
            }
        }
        candidates
    }
}

impl TargetDesc {
    pub fn as_str(&self) -> &str {
        match self {
            TargetDesc::Method(d) | TargetDesc::Field(d) => d,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "L{};", owner)?;
        }
        write!(f, "{}", self.name)?;
        match &self.desc {
            Some(TargetDesc::Method(d)) => write!(f, "{}", d),
            Some(TargetDesc::Field(d)) => write!(f, ":{}", d),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn owner(input: &mut &str) -> ModalResult<String> {
    delimited('L', take_till(1.., |c| c == ';' || c == '(' || c == ':'), ';')
        .map(str::to_string)
        .parse_next(input)
}

fn member_desc(input: &mut &str) -> ModalResult<TargetDesc> {
    alt((
        preceded(':', rest).map(|d: &str| TargetDesc::Field(d.to_string())),
        ('(', rest).take().map(|d: &str| TargetDesc::Method(d.to_string())),
    ))
    .parse_next(input)
}

fn target(input: &mut &str) -> ModalResult<Target> {
    let owner = opt(owner).parse_next(input)?;
    let name = take_till(1.., |c| c == '(' || c == ':').parse_next(input)?;
    let desc = opt(member_desc).parse_next(input)?;
    Ok(Target {
        owner,
        name: name.to_string(),
        desc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_core::mapping::chain::MappingChain;
    use remap_core::mapping::table::{ClassEntry, FieldEntry, MappingTable, MethodEntry};
    use std::sync::Arc;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn tree() -> MappingTree {
        let mut t = MappingTable::new(names(&["old", "new"])).unwrap();
        let mut owner = ClassEntry::new(names(&["old/Owner", "new/Owner"]));
        owner.methods.push(MethodEntry {
            names: names(&["method", "renamed"]),
            desc: "(Lold/Arg;)V".to_string(),
        });
        owner.methods.push(MethodEntry {
            names: names(&["tick", "update"]),
            desc: "()V".to_string(),
        });
        owner.methods.push(MethodEntry {
            names: names(&["tick", "tickOnce"]),
            desc: "(I)V".to_string(),
        });
        owner.fields.push(FieldEntry {
            names: names(&["count", "size"]),
            desc: Some("I".to_string()),
        });
        t.insert_class(owner);
        t.insert_class(ClassEntry::new(names(&["old/Arg", "new/Arg"])));
        let chain = MappingChain::new().with_hop(&t, "old", "new").unwrap();
        MappingTree::new(Arc::new(chain))
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn every_form_round_trips() {
            for input in [
                "Lold/Owner;method(Lold/Arg;)V",
                "method(Lold/Arg;)V",
                "Lold/Owner;count:I",
                "count:I",
                "tick",
                "Lold/Owner;tick",
                "<init>(I)V",
                "LOGGER:Lorg/slf4j/Logger;",
            ] {
                let target = Target::parse(input).unwrap();
                assert_eq!(target.to_string(), input);
            }
        }

        #[test]
        fn field_named_like_owner_is_not_an_owner() {
            let target = Target::parse("LOGGER:Lorg/slf4j/Logger;").unwrap();
            assert_eq!(target.owner, None);
            assert_eq!(target.name, "LOGGER");
        }

        #[test]
        fn wildcards_and_regex_are_unsupported() {
            for input in ["tick*", "/tick.*/", "tick ()V"] {
                assert!(matches!(
                    Target::parse(input),
                    Err(TargetError::Unsupported { .. })
                ));
            }
        }

        #[test]
        fn bad_descriptor_is_invalid() {
            assert!(matches!(
                Target::parse("tick(Q)V"),
                Err(TargetError::Invalid { .. })
            ));
        }
    }

    mod resolve_tests {
        use super::*;

        fn resolve(input: &str, owners: &[&str]) -> TargetResolution {
            let owners: Vec<String> = owners.iter().map(|s| s.to_string()).collect();
            Target::parse(input)
                .unwrap()
                .resolve(&tree(), &owners, MemberKind::Method)
        }

        fn resolved(input: &str, owners: &[&str]) -> String {
            match resolve(input, owners) {
                TargetResolution::Resolved(t) => t.to_string(),
                other => panic!("expected resolution, got {:?}", other),
            }
        }

        #[test]
        fn owner_member_and_descriptor_are_rewritten() {
            assert_eq!(
                resolved("Lold/Owner;method(Lold/Arg;)V", &[]),
                "Lnew/Owner;renamed(Lnew/Arg;)V"
            );
        }

        #[test]
        fn omitted_owner_comes_from_context_and_stays_omitted() {
            assert_eq!(resolved("method(Lold/Arg;)V", &["old/Owner"]), "renamed(Lnew/Arg;)V");
            assert_eq!(resolve("method(Lold/Arg;)V", &[]), TargetResolution::NoOwner);
        }

        #[test]
        fn descriptor_classes_are_rewritten_for_unmapped_members() {
            assert_eq!(resolved("Lx/Y;other(Lold/Arg;)V", &[]), "Lx/Y;other(Lnew/Arg;)V");
        }

        #[test]
        fn descriptorless_overloads_with_different_names_are_ambiguous() {
            match resolve("tick", &["old/Owner"]) {
                TargetResolution::Ambiguous(candidates) => assert_eq!(candidates.len(), 2),
                other => panic!("expected ambiguity, got {:?}", other),
            }
        }

        #[test]
        fn field_targets_use_field_names() {
            assert_eq!(resolved("Lold/Owner;count:I", &[]), "Lnew/Owner;size:I");
        }

        #[test]
        fn field_target_with_another_descriptor_is_not_renamed() {
            assert_eq!(resolved("Lold/Owner;count:J", &[]), "Lnew/Owner;count:J");
            assert_eq!(resolved("count:I", &["old/Owner"]), "size:I");
        }

        #[test]
        fn constructors_keep_their_name() {
            assert_eq!(resolved("Lold/Owner;<init>(Lold/Arg;)V", &[]), "Lnew/Owner;<init>(Lnew/Arg;)V");
        }

        #[test]
        fn unchanged_mapping_round_trips_exactly() {
            let input = "Lx/Unknown;thing(ILx/Other;)[J";
            assert_eq!(resolved(input, &[]), input);
        }
    }
}
