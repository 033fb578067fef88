//! The parser facade: table construction at `new`, a shift/reduce drive
//! loop over (symbol, value, state) triples, and the grammar dump.

use crate::error::{GrammarError, SyntaxError};
use crate::first_follow::FirstFollow;
use crate::grammar::{self, Precedence, Rule};
use crate::lexer::{IndentLexer, LexToken};
use crate::slr::{self, Item, ItemSet};
use crate::table::{self, Conflict, ParseInstr, ParseTable};
use indexmap::IndexSet;
use smartstring::alias::String;
use std::collections::BTreeSet;
use std::io::{self, Write};

/// A table-driven shift/reduce parser.
///
/// Construction computes first/follow sets, the canonical collection of
/// item sets, and the action/goto table; collisions the precedence table
/// cannot settle are kept in [`conflicts`](Parser::conflicts). One
/// instance is built, then used; the grammar is not mutated afterwards.
pub struct Parser<V> {
    lexer: IndentLexer,
    rules: Vec<Rule<V>>,
    first_follow: FirstFollow,
    states: IndexSet<ItemSet>,
    table: ParseTable,
    conflicts: Vec<Conflict>,
}

impl<V: From<LexToken>> Parser<V> {
    /// Builds the parse table for `rules` over the terminals of `lexer`.
    /// The first rule is the start rule.
    pub fn new(
        lexer: IndentLexer,
        rules: Vec<Rule<V>>,
        precedence: Precedence,
    ) -> Result<Self, GrammarError> {
        grammar::validate(&rules, &lexer)?;
        let rules = grammar::normalize(rules);

        let is_terminal = |symbol: &str| lexer.is_terminal(symbol);
        let by_lhs = grammar::index_by_lhs(&rules);
        let first_follow = FirstFollow::compute(&rules, &is_terminal);
        let states = slr::canonical_collection(&rules, &by_lhs);
        let (table, conflicts) = table::build_table(
            &rules,
            &by_lhs,
            &states,
            &first_follow,
            &precedence.resolve(),
            &is_terminal,
        );
        log::debug!(
            "built parse table: {} rules, {} states, {} conflicts",
            rules.len(),
            states.len(),
            conflicts.len()
        );

        Ok(Self {
            lexer,
            rules,
            first_follow,
            states,
            table,
            conflicts,
        })
    }

    /// Collisions precedence could not resolve. Whether these are fatal
    /// is the caller's policy; the table itself stays well-defined.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// FIRST set of a non-terminal.
    pub fn firsts(&self, symbol: &str) -> Option<&BTreeSet<String>> {
        self.first_follow.first(symbol)
    }

    /// FOLLOW set of a non-terminal.
    pub fn follows(&self, symbol: &str) -> Option<&BTreeSet<String>> {
        self.first_follow.follow(symbol)
    }

    /// Parses `source` to completion and returns the semantic value of
    /// the start rule.
    pub fn parse(&mut self, source: &str) -> Result<V, SyntaxError> {
        self.lexer.input(source);
        let mut stack: Vec<(String, V, usize)> = Vec::new();
        let mut state = 0usize;

        loop {
            let lookahead = self.lexer.peek()?;
            let Some(instr) = self.table.action(state, &lookahead.symbol) else {
                return Err(self.parse_failure(state, &lookahead));
            };
            match instr {
                ParseInstr::Shift(next) => {
                    let token = self.lexer.token()?;
                    log::trace!("shift {} and go to state {}", token.symbol, next);
                    stack.push((token.symbol.clone(), V::from(token), next));
                    state = next;
                }
                ParseInstr::Reduce(rule) => {
                    let value = self.apply_rule(rule, &mut stack)?;
                    let lhs = self.rules[rule].lhs.clone();
                    let exposed = stack.last().map(|(_, _, s)| *s).unwrap_or(0);
                    match self.table.action(exposed, &lhs) {
                        Some(ParseInstr::Goto(next)) => {
                            stack.push((lhs, value, next));
                            state = next;
                        }
                        _ => return Err(SyntaxError::Internal("no goto after reduce")),
                    }
                }
                ParseInstr::Accept => {
                    log::trace!("accept");
                    // Take the END sentinel so the stream is consumed to
                    // completion, then run the start rule's reduction.
                    let _ = self.lexer.token()?;
                    return self.apply_rule(0, &mut stack);
                }
                ParseInstr::Goto(_) => {
                    return Err(SyntaxError::Internal("goto dispatched on a terminal"));
                }
            }
        }
    }

    // Pops |rhs| values and runs the rule's reducer over them, in rhs
    // order. A reducerless rule passes its first value through.
    fn apply_rule(&self, rule: usize, stack: &mut Vec<(String, V, usize)>) -> Result<V, SyntaxError> {
        let Rule { lhs, rhs, reducer } = &self.rules[rule];
        let count = rhs.len();
        if stack.len() < count {
            return Err(SyntaxError::Internal("value stack underflow"));
        }
        log::trace!("reduce using rule {}: {} -> {}", rule, lhs, rhs.join(" "));
        let values: Vec<V> = stack
            .drain(stack.len() - count..)
            .map(|(_, value, _)| value)
            .collect();
        match reducer {
            Some(reduce) => Ok(reduce(values)),
            None => values
                .into_iter()
                .next()
                .ok_or(SyntaxError::Internal("reducerless rule with empty rhs")),
        }
    }

    fn parse_failure(&self, state: usize, lookahead: &LexToken) -> SyntaxError {
        let mut dump = Vec::new();
        let _ = self.dump_state(state, &mut dump);
        SyntaxError::Parse {
            state,
            lookahead: lookahead.symbol.clone(),
            dump: std::string::String::from_utf8_lossy(&dump).into_owned(),
        }
    }

    /// Writes the numbered rule list, every state with its kernel items
    /// and non-goto actions, and the conflict list.
    pub fn dump_grammar<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "Grammar")?;
        writeln!(w)?;
        for (i, rule) in self.rules.iter().enumerate() {
            writeln!(w, "Rule {}: {} -> {}", i, rule.lhs, rule.rhs.join(" "))?;
        }
        writeln!(w)?;

        for state in 0..self.states.len() {
            self.dump_state(state, w)?;
        }
        writeln!(w)?;

        writeln!(w, "Conflicts ({})", self.conflicts.len())?;
        writeln!(w)?;
        for conflict in &self.conflicts {
            writeln!(
                w,
                "{}/{} conflict (defaulting to {})",
                conflict.chosen.tag(),
                conflict.other.tag(),
                conflict.chosen.tag()
            )?;
            writeln!(w, "- {}", self.describe(conflict.chosen, &conflict.lookahead))?;
            writeln!(w, "- {}", self.describe(conflict.other, &conflict.lookahead))?;
        }
        Ok(())
    }

    /// Writes one state: its kernel items, then its shift/reduce/accept
    /// rows.
    pub fn dump_state<W: Write>(&self, state: usize, w: &mut W) -> io::Result<()> {
        writeln!(w, "state {}", state)?;
        writeln!(w)?;
        if let Some(items) = self.states.get_index(state) {
            for item in items {
                if item.dot == 0 && item.rule != 0 {
                    continue;
                }
                writeln!(w, "    {}", self.item_str(item))?;
            }
        }
        writeln!(w)?;
        if let Some(row) = self.table.rows.get(state) {
            for (symbol, instr) in row {
                match instr {
                    ParseInstr::Shift(next) => {
                        writeln!(w, "    {:<12} shift and go to state {}", symbol, next)?
                    }
                    ParseInstr::Reduce(rule) => {
                        writeln!(w, "    {:<12} reduce using rule {}", symbol, rule)?
                    }
                    ParseInstr::Accept => writeln!(w, "    {:<12} accept", symbol)?,
                    ParseInstr::Goto(_) => {}
                }
            }
        }
        writeln!(w)
    }

    // "lhs -> alpha . beta" with the dot marking parser progress.
    fn item_str(&self, item: &Item) -> std::string::String {
        let rule = &self.rules[item.rule];
        let mut out = std::string::String::new();
        out.push_str(&rule.lhs);
        out.push_str(" ->");
        for (i, symbol) in rule.rhs.iter().enumerate() {
            if i == item.dot {
                out.push_str(" .");
            }
            out.push(' ');
            out.push_str(symbol);
        }
        if item.dot == rule.rhs.len() {
            out.push_str(" .");
        }
        out
    }

    fn describe(&self, instr: ParseInstr, lookahead: &str) -> std::string::String {
        match instr {
            ParseInstr::Shift(state) => {
                format!("shift and go to state {} on lookahead {}", state, lookahead)
            }
            ParseInstr::Reduce(rule) => {
                let terminal = table::rightmost_terminal(&self.rules[rule].rhs, &|s| {
                    self.lexer.is_terminal(s)
                })
                .unwrap_or("<none>");
                format!("reduce using rule {} on terminal {}", rule, terminal)
            }
            ParseInstr::Goto(state) => format!("go to state {}", state),
            ParseInstr::Accept => "accept".to_owned(),
        }
    }
}
