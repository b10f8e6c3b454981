//! Combination rules and the activation graph.
//!
//! A combination rule derives one pattern's activation from others:
//! `R.active := AND(P₁.active … Pₙ.active)`.  The graph keeps the rules in
//! one owning table plus a reverse index from each prerequisite name to the
//! rules it feeds, so a single activation change touches only the rules
//! that can possibly care.
//!
//! Derived patterns are not allowed to be prerequisites of further rules;
//! propagation is deliberately single-step and such configurations are
//! rejected at load time.

use std::collections::HashMap;

use log::warn;

use crate::config::{KeyFile, KEY_COMBINATION_RULES, KEY_PATTERN_GROUP, LED_SECTION};
use crate::patterns::PatternRepository;

/// One derived-activation rule.
#[derive(Debug, Clone)]
pub struct CombinationRule {
    /// Pattern whose `active` bit is derived.
    pub derived: String,
    /// Patterns that must all be active.
    pub prereqs: Vec<String>,
}

/// Rule table plus reverse index (prereq name → rule indices).
pub struct ActivationGraph {
    rules: Vec<CombinationRule>,
    by_prereq: HashMap<String, Vec<usize>>,
}

impl ActivationGraph {
    pub fn new() -> Self {
        Self { rules: Vec::new(), by_prereq: HashMap::new() }
    }

    /// Insert one rule and update the reverse index.
    ///
    /// Rules that would require transitive propagation (a derived pattern
    /// used as a prerequisite, in either direction) are rejected.
    pub fn add_rule(&mut self, derived: String, prereqs: Vec<String>) {
        if prereqs.is_empty() {
            warn!("combination rule for {derived} has no prerequisites, ignoring");
            return;
        }
        if prereqs.iter().any(|p| self.rules.iter().any(|r| r.derived == *p)) {
            warn!("combination rule for {derived} uses a derived pattern as prerequisite, ignoring");
            return;
        }
        if self.rules.iter().any(|r| r.prereqs.contains(&derived)) {
            warn!("combination rule for {derived} would make a prerequisite derived, ignoring");
            return;
        }

        let idx = self.rules.len();
        for p in &prereqs {
            self.by_prereq.entry(p.clone()).or_default().push(idx);
        }
        self.rules.push(CombinationRule { derived, prereqs });
    }

    /// Read the rule list named by the keyfile and resolve each entry
    /// against the repository.  Rules naming unknown patterns are skipped.
    pub fn from_config(keyfile: &KeyFile, repo: &PatternRepository) -> Self {
        let mut graph = Self::new();
        let Some(group) = keyfile.get(LED_SECTION, KEY_PATTERN_GROUP) else {
            return graph;
        };

        for rule_key in keyfile.get_list(LED_SECTION, KEY_COMBINATION_RULES) {
            let names = keyfile.get_list(group, &rule_key);
            let Some((derived, prereqs)) = names.split_first() else {
                warn!("combination rule {rule_key} is empty, ignoring");
                continue;
            };
            if repo.find(derived).is_none() {
                warn!("combination rule {rule_key}: derived pattern {derived} unknown, ignoring");
                continue;
            }
            if let Some(missing) = prereqs.iter().find(|p| repo.find(p).is_none()) {
                warn!("combination rule {rule_key}: prerequisite {missing} unknown, ignoring");
                continue;
            }
            graph.add_rule(derived.clone(), prereqs.to_vec());
        }
        graph
    }

    /// Rules that depend on this pattern.
    pub fn affected_by(&self, name: &str) -> &[usize] {
        self.by_prereq.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn rule(&self, idx: usize) -> &CombinationRule {
        &self.rules[idx]
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
