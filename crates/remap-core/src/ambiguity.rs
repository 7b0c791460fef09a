//! The single rule for references that could mean more than one declaration.
//!
//! Every plausible originating declaration proposes a new name. The set of
//! distinct proposals decides the outcome: none means keep, one means rename,
//! more than one means report every candidate and leave the text alone.

use std::collections::BTreeSet;

use crate::diagnostic::Candidate;

/// Outcome of [`Candidates::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No rename needed.
    Keep,
    Rename(String),
    Ambiguous(Vec<Candidate>),
}

#[derive(Debug, Clone, Default)]
pub struct Candidates {
    entries: Vec<Candidate>,
}

impl Candidates {
    pub fn new() -> Self {
        Candidates::default()
    }

    /// Record that `label` would rename the reference to `new_name`.
    ///
    /// Declarations that keep their name propose their current name.
    pub fn push(&mut self, label: impl Into<String>, new_name: impl Into<String>) {
        self.entries.push(Candidate {
            label: label.into(),
            new_name: new_name.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn distinct_names(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|c| c.new_name.as_str()).collect()
    }

    /// Apply the rule against the name currently in the source.
    pub fn decide(self, current: &str) -> Decision {
        let distinct: Vec<String> = self
            .distinct_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        match distinct.len() {
            0 => Decision::Keep,
            1 => match distinct.into_iter().next() {
                Some(name) if name != current => Decision::Rename(name),
                _ => Decision::Keep,
            },
            _ => {
                let mut entries = self.entries;
                entries.sort();
                entries.dedup();
                Decision::Ambiguous(entries)
            }
        }
    }
}

impl FromIterator<(String, String)> for Candidates {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut candidates = Candidates::new();
        for (label, name) in iter {
            candidates.push(label, name);
        }
        candidates
    }
}
