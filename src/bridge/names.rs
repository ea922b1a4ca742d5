//! Record name allocation
//!
//! Nested record (and fixed) types emitted into one schema document share a
//! single name space. Names are derived from the field path
//! (`parent + "_" + field`), which is deterministic but not collision-free on
//! its own: a field `a_b` and a field `b` nested under `a` both derive
//! `parent_a_b`. The allocator tracks every name handed out during one
//! conversion and disambiguates repeats with a numeric suffix, in traversal
//! order, so the same input always yields the same names.

use std::collections::HashSet;

/// Hands out unique type names for a single schema document
#[derive(Debug, Default)]
pub struct NameAllocator {
    /// Names already claimed in this document
    taken: HashSet<String>,
    /// How many names had to be disambiguated
    disambiguated: usize,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name derived for a field nested under `parent`
    pub fn child_name(parent: &str, field: &str) -> String {
        format!("{}_{}", parent, field)
    }

    /// Claim `candidate`, or the first free `candidate_N` (N >= 2) when the
    /// candidate was already handed out
    pub fn claim(&mut self, candidate: &str) -> String {
        if self.taken.insert(candidate.to_string()) {
            return candidate.to_string();
        }
        self.disambiguated += 1;
        let mut suffix = 2usize;
        loop {
            let name = format!("{}_{}", candidate, suffix);
            if self.taken.insert(name.clone()) {
                return name;
            }
            suffix += 1;
        }
    }

    pub fn disambiguated(&self) -> usize {
        self.disambiguated
    }
}
