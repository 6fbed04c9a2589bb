//! Group-key normalization.
//!
//! The broker is inconsistent about how it spells group paths: forward or
//! backward slashes, arbitrary casing, and commercial group names nested
//! one level under a `Bbook` namespace. A trade's group and a rule's group
//! therefore rarely compare equal as strings. This module derives a
//! canonical set of candidate keys from a raw group path; a trade matches
//! a rule when any candidate key on either side intersects.
//!
//! This is the only place such keys are derived. Ingestion and every
//! aggregation path go through here — a second, slightly different
//! normalizer is exactly the kind of silent commission discrepancy this
//! module exists to prevent.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::models::{GroupAssignment, IbPartner};

/// Candidate lookup keys for a raw group path, in resolution priority
/// order: full normalized string, forward-slash variant, backslash
/// variant, the segment after a `bbook` namespace, and the last path
/// segment. Duplicates removed, order preserved.
pub fn candidate_keys(raw: &str) -> Vec<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut keys: Vec<String> = Vec::with_capacity(5);
    let mut push = |k: String| {
        if !k.is_empty() && !keys.contains(&k) {
            keys.push(k);
        }
    };

    push(normalized.clone());
    push(normalized.replace('\\', "/"));
    push(normalized.replace('/', "\\"));

    let segments: Vec<&str> = normalized
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();

    for (i, seg) in segments.iter().enumerate() {
        if *seg == "bbook" {
            if let Some(next) = segments.get(i + 1) {
                push((*next).to_string());
            }
        }
    }

    if let Some(last) = segments.last() {
        push((*last).to_string());
    }

    keys
}

/// Set view of [`candidate_keys`].
pub fn derive_keys(raw: &str) -> HashSet<String> {
    candidate_keys(raw).into_iter().collect()
}

/// Demo/paper groups and accounts never accrue commission or count toward
/// balances. Shared predicate so every call site agrees.
pub fn is_demo_group(raw: &str) -> bool {
    raw.to_lowercase().contains("demo")
}

/// Commission terms resolved for a group.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTerms {
    pub usd_per_lot: Decimal,
    pub spread_share_percentage: Decimal,
    /// Display name of the rule's group, for breakdown bucketing.
    pub group_label: String,
}

/// One partner's approved rules, keyed by every candidate key of each
/// rule's `group_id` and `group_name`.
///
/// When a partner has no explicit assignments, a wildcard rule built from
/// the partner's legacy default rates applies to any group.
#[derive(Debug, Clone, Default)]
pub struct RuleMap {
    entries: HashMap<String, RuleTerms>,
    wildcard: Option<RuleTerms>,
}

impl RuleMap {
    pub fn from_assignments(assignments: &[GroupAssignment]) -> Self {
        let mut entries = HashMap::new();
        for a in assignments {
            let terms = RuleTerms {
                usd_per_lot: a.usd_per_lot,
                spread_share_percentage: a.spread_share_percentage,
                group_label: a
                    .group_name
                    .clone()
                    .unwrap_or_else(|| a.group_id.clone()),
            };
            for key in candidate_keys(&a.group_id) {
                entries.insert(key, terms.clone());
            }
            if let Some(name) = &a.group_name {
                for key in candidate_keys(name) {
                    entries.entry(key).or_insert_with(|| terms.clone());
                }
            }
        }
        Self {
            entries,
            wildcard: None,
        }
    }

    /// Build the map for a partner: explicit assignments when present,
    /// otherwise the legacy single-rate wildcard.
    pub fn for_partner(partner: &IbPartner, assignments: &[GroupAssignment]) -> Self {
        if assignments.is_empty() {
            return Self {
                entries: HashMap::new(),
                wildcard: Some(RuleTerms {
                    usd_per_lot: partner.usd_per_lot,
                    spread_share_percentage: partner.spread_percentage_per_lot,
                    group_label: "default".into(),
                }),
            };
        }
        Self::from_assignments(assignments)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.wildcard.is_none()
    }

    /// Resolve the terms for a raw group path. Candidate keys are tried in
    /// priority order so the result is deterministic even when several
    /// keys would match. Returns `None` on a miss — a miss is a valid
    /// outcome (the trade is excluded), never an error and never a
    /// guessed default rate.
    pub fn resolve(&self, raw_group: &str) -> Option<&RuleTerms> {
        if self.entries.is_empty() {
            return self.wildcard.as_ref();
        }
        for key in candidate_keys(raw_group) {
            if let Some(terms) = self.entries.get(&key) {
                return Some(terms);
            }
        }
        None
    }
}
