//! FIRST and FOLLOW sets, computed once by fixpoint iteration.
//!
//! For a terminal `t`, `FIRST(t) = {t}`; only non-terminal sets are
//! stored. `FOLLOW` is defined for non-terminals and seeds the start
//! symbol with `END`. Nullable symbols are tracked so epsilon
//! productions extend FIRST through nullable prefixes, although the
//! usual grammars here have none.

use crate::grammar::Rule;
use crate::lexer::symbols;
use smartstring::alias::String;
use std::collections::{BTreeSet, HashMap, HashSet};

pub(crate) struct FirstFollow {
    firsts: HashMap<String, BTreeSet<String>>,
    follows: HashMap<String, BTreeSet<String>>,
    nullable: HashSet<String>,
}

impl FirstFollow {
    pub fn compute<V>(rules: &[Rule<V>], is_terminal: &dyn Fn(&str) -> bool) -> Self {
        let mut firsts: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut nullable: HashSet<String> = HashSet::new();
        for rule in rules {
            firsts.entry(rule.lhs.clone()).or_default();
        }

        let mut changed = true;
        while changed {
            changed = false;
            for rule in rules {
                if rule.rhs.is_empty() {
                    if nullable.insert(rule.lhs.clone()) {
                        changed = true;
                    }
                    continue;
                }
                let (add, all_nullable) =
                    first_of_sequence(&rule.rhs, &firsts, &nullable, is_terminal);
                let entry = firsts.entry(rule.lhs.clone()).or_default();
                for t in add {
                    if entry.insert(t) {
                        changed = true;
                    }
                }
                if all_nullable && nullable.insert(rule.lhs.clone()) {
                    changed = true;
                }
            }
        }

        let mut follows: HashMap<String, BTreeSet<String>> = HashMap::new();
        for rule in rules {
            follows.entry(rule.lhs.clone()).or_default();
        }
        if let Some(start) = rules.first() {
            follows
                .entry(start.lhs.clone())
                .or_default()
                .insert(symbols::END.into());
        }

        let mut changed = true;
        while changed {
            changed = false;
            for rule in rules {
                for (i, symbol) in rule.rhs.iter().enumerate() {
                    if is_terminal(symbol) {
                        continue;
                    }
                    let (mut add, tail_nullable) =
                        first_of_sequence(&rule.rhs[i + 1..], &firsts, &nullable, is_terminal);
                    if tail_nullable {
                        if let Some(of_lhs) = follows.get(rule.lhs.as_str()) {
                            add.extend(of_lhs.iter().cloned());
                        }
                    }
                    let entry = follows.entry(symbol.clone()).or_default();
                    for t in add {
                        if entry.insert(t) {
                            changed = true;
                        }
                    }
                }
            }
        }

        Self {
            firsts,
            follows,
            nullable,
        }
    }

    /// FIRST of a non-terminal; terminals are their own singleton set and
    /// are not stored.
    pub fn first(&self, symbol: &str) -> Option<&BTreeSet<String>> {
        self.firsts.get(symbol)
    }

    pub fn follow(&self, symbol: &str) -> Option<&BTreeSet<String>> {
        self.follows.get(symbol)
    }

    #[cfg(test)]
    fn is_nullable(&self, symbol: &str) -> bool {
        self.nullable.contains(symbol)
    }
}

// FIRST of a symbol sequence plus whether the whole sequence is nullable.
fn first_of_sequence(
    seq: &[String],
    firsts: &HashMap<String, BTreeSet<String>>,
    nullable: &HashSet<String>,
    is_terminal: &dyn Fn(&str) -> bool,
) -> (BTreeSet<String>, bool) {
    let mut add = BTreeSet::new();
    for symbol in seq {
        if is_terminal(symbol) {
            add.insert(symbol.clone());
            return (add, false);
        }
        if let Some(set) = firsts.get(symbol.as_str()) {
            add.extend(set.iter().cloned());
        }
        if !nullable.contains(symbol.as_str()) {
            return (add, false);
        }
    }
    (add, true)
}
