//! Production rules, reducers, and the operator precedence table.

use crate::error::GrammarError;
use crate::lexer::{symbols, IndentLexer};
use smartstring::alias::String;
use std::collections::{HashMap, HashSet};

/// Builds one semantic value out of the values of a rule's right-hand
/// side, passed in rhs order.
pub type Reducer<V> = Box<dyn Fn(Vec<V>) -> V>;

/// A production rule. The first rule handed to the parser is the start
/// rule. Rules are referred to by their position in the rule list, so
/// two rules with the same head and body are simply two reduction
/// opportunities.
pub struct Rule<V> {
    pub lhs: String,
    pub rhs: Vec<String>,
    pub reducer: Option<Reducer<V>>,
}

impl<V> Rule<V> {
    pub fn new(lhs: &str, rhs: &[&str], reducer: impl Fn(Vec<V>) -> V + 'static) -> Self {
        Self {
            lhs: lhs.into(),
            rhs: rhs.iter().map(|s| (*s).into()).collect(),
            reducer: Some(Box::new(reducer)),
        }
    }

    /// A rule without a reducer; reduction passes its first value through.
    pub fn passthrough(lhs: &str, rhs: &[&str]) -> Self {
        Self {
            lhs: lhs.into(),
            rhs: rhs.iter().map(|s| (*s).into()).collect(),
            reducer: None,
        }
    }
}

impl<V> std::fmt::Debug for Rule<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.lhs, self.rhs.join(" "))
    }
}

/// Operator associativity within one precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// Ordered precedence levels, from loosest to tightest binding. The
/// level index is the precedence value.
#[derive(Debug, Clone, Default)]
pub struct Precedence {
    levels: Vec<(Assoc, Vec<String>)>,
}

impl Precedence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one level binding tighter than all previous ones.
    pub fn level(mut self, assoc: Assoc, terminals: &[&str]) -> Self {
        self.levels
            .push((assoc, terminals.iter().map(|s| (*s).into()).collect()));
        self
    }

    /// The derived terminal -> (level, associativity) map.
    pub(crate) fn resolve(&self) -> HashMap<String, (usize, Assoc)> {
        let mut map = HashMap::new();
        for (value, (assoc, terminals)) in self.levels.iter().enumerate() {
            for terminal in terminals {
                map.insert(terminal.clone(), (value, *assoc));
            }
        }
        map
    }
}

/// Checks that every rhs symbol is either a terminal of `lexer` or the
/// head of some rule, and that the grammar is not empty.
pub(crate) fn validate<V>(rules: &[Rule<V>], lexer: &IndentLexer) -> Result<(), GrammarError> {
    if rules.is_empty() {
        return Err(GrammarError::Empty);
    }
    let heads: HashSet<&str> = rules.iter().map(|r| r.lhs.as_str()).collect();
    for (i, rule) in rules.iter().enumerate() {
        for symbol in &rule.rhs {
            if !lexer.is_terminal(symbol) && !heads.contains(symbol.as_str()) {
                return Err(GrammarError::UnknownSymbol {
                    symbol: symbol.clone(),
                    rule: i,
                });
            }
        }
    }
    Ok(())
}

/// Drops the `EMPTY` marker so that an epsilon production ends up with an
/// empty rhs.
pub(crate) fn normalize<V>(mut rules: Vec<Rule<V>>) -> Vec<Rule<V>> {
    for rule in &mut rules {
        rule.rhs.retain(|s| s != symbols::EMPTY);
    }
    rules
}

/// Rule indices grouped by head symbol, for closure computation.
pub(crate) fn index_by_lhs<V>(rules: &[Rule<V>]) -> HashMap<&str, Vec<usize>> {
    let mut map: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, rule) in rules.iter().enumerate() {
        map.entry(rule.lhs.as_str()).or_default().push(i);
    }
    map
}
