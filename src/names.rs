//! Player name normalization and lookup.
//!
//! Names arrive as free text in two places: the "wants to play with" field
//! of a player and the member list of a historical group. Both are resolved
//! against the roster here and nowhere else.
//!
//! Matching is two-stage: first on the normalized form (trimmed, lowercase,
//! single spaces), then on the compact form (lowercase, all whitespace
//! removed) so that "Van Dijk" and "VanDijk" still meet.

use std::collections::HashMap;

use crate::schedule::types::PlayerId;

/// Trims, lowercases and collapses runs of whitespace to one space.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercases and drops every whitespace character.
pub fn compact_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Splits a comma-separated name list, stripping quotes and empty entries.
pub fn split_name_list(raw: &str) -> Vec<String> {
    raw.replace('"', "")
        .split(',')
        .map(normalize_name)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Lookup table from player full name to player id.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    exact: HashMap<String, PlayerId>,
    compact: HashMap<String, PlayerId>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a full name. The first registration of a name wins.
    pub fn insert(&mut self, full_name: &str, id: &PlayerId) {
        let normalized = normalize_name(full_name);
        if normalized.is_empty() {
            return;
        }
        self.exact.entry(normalized).or_insert_with(|| id.clone());
        self.compact
            .entry(compact_name(full_name))
            .or_insert_with(|| id.clone());
    }

    /// Resolves a name: exact normalized match first, then whitespace-insensitive.
    pub fn resolve(&self, name: &str) -> Option<&PlayerId> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return None;
        }
        self.exact
            .get(&normalized)
            .or_else(|| self.compact.get(&compact_name(name)))
    }
}
