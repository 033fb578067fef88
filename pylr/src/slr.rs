//! LR(0) item machinery: closures, goto moves, and the canonical
//! collection of item sets.
//!
//! An [`Item`] marks parser progress through one production with a dot
//! position. Item sets are ordered sets, which makes their equality and
//! hashing independent of insertion order, and the canonical collection
//! is an insertion-ordered set whose indices are the DFA state numbers.

use crate::grammar::Rule;
use indexmap::IndexSet;
use smartstring::alias::String;
use std::collections::{BTreeSet, HashMap};

/// An LR(0) item: a rule index and a dot position `0..=rhs.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Item {
    pub rule: usize,
    pub dot: usize,
}

/// A set of LR(0) items; one DFA state.
pub(crate) type ItemSet = BTreeSet<Item>;

/// Computes the closure of `items`: every item with the dot before a
/// non-terminal contributes that non-terminal's rules with the dot at 0,
/// until the set stops growing.
pub(crate) fn closure<V>(
    items: &ItemSet,
    rules: &[Rule<V>],
    by_lhs: &HashMap<&str, Vec<usize>>,
) -> ItemSet {
    let mut closed = items.clone();
    let mut changed = true;
    while changed {
        changed = false;
        for item in closed.clone() {
            let rhs = &rules[item.rule].rhs;
            if let Some(next) = rhs.get(item.dot) {
                if let Some(indices) = by_lhs.get(next.as_str()) {
                    for &rule in indices {
                        if closed.insert(Item { rule, dot: 0 }) {
                            changed = true;
                        }
                    }
                }
            }
        }
    }
    closed
}

/// Advances the dot over `symbol` across all items of a set and closes
/// the result. Empty when no item has the dot before `symbol`.
pub(crate) fn goto_over<V>(
    items: &ItemSet,
    symbol: &str,
    rules: &[Rule<V>],
    by_lhs: &HashMap<&str, Vec<usize>>,
) -> ItemSet {
    let mut moved = ItemSet::new();
    for item in items {
        let rhs = &rules[item.rule].rhs;
        if rhs.get(item.dot).map(|s| s.as_str()) == Some(symbol) {
            moved.insert(Item {
                rule: item.rule,
                dot: item.dot + 1,
            });
        }
    }
    if moved.is_empty() {
        moved
    } else {
        closure(&moved, rules, by_lhs)
    }
}

/// Builds the canonical collection, seeded with the closure of the start
/// rule's initial item. States are indexed in discovery order; the seed
/// is state 0.
pub(crate) fn canonical_collection<V>(
    rules: &[Rule<V>],
    by_lhs: &HashMap<&str, Vec<usize>>,
) -> IndexSet<ItemSet> {
    let mut states: IndexSet<ItemSet> = IndexSet::new();
    let seed = closure(&ItemSet::from([Item { rule: 0, dot: 0 }]), rules, by_lhs);
    states.insert(seed);

    let mut i = 0;
    while i < states.len() {
        let Some(state) = states.get_index(i) else {
            break;
        };
        let state = state.clone();
        let mut nexts: BTreeSet<String> = BTreeSet::new();
        for item in &state {
            if let Some(symbol) = rules[item.rule].rhs.get(item.dot) {
                nexts.insert(symbol.clone());
            }
        }
        for symbol in &nexts {
            let target = goto_over(&state, symbol, rules, by_lhs);
            if !target.is_empty() {
                states.insert(target);
            }
        }
        i += 1;
    }
    states
}
