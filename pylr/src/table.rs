//! The action/goto table and precedence-directed conflict resolution.
//!
//! Each state maps symbols to one [`ParseInstr`]: terminals to
//! shift/reduce/accept, non-terminals to goto. When two intended actions
//! collide on one cell, operator precedence arbitrates; collisions that
//! precedence cannot settle keep the first-inserted instruction and are
//! recorded in the conflict list in encounter order.

use crate::first_follow::FirstFollow;
use crate::grammar::{Assoc, Rule};
use crate::lexer::symbols;
use crate::slr::{goto_over, ItemSet};
use indexmap::IndexSet;
use smartstring::alias::String;
use std::collections::{BTreeMap, HashMap};

/// One parse table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseInstr {
    Shift(usize),
    Reduce(usize),
    Goto(usize),
    Accept,
}

impl ParseInstr {
    /// The conventional upper-case tag, used in conflict reports.
    pub fn tag(&self) -> &'static str {
        match self {
            ParseInstr::Shift(_) => "SHIFT",
            ParseInstr::Reduce(_) => "REDUCE",
            ParseInstr::Goto(_) => "GOTO",
            ParseInstr::Accept => "ACCEPT",
        }
    }
}

/// A collision precedence could not settle. The first-inserted
/// instruction stays in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub chosen: ParseInstr,
    pub other: ParseInstr,
    pub lookahead: String,
}

/// The finished action/goto table. Rows are states; each row is sorted
/// by symbol so dumps and conflict detection are deterministic.
pub(crate) struct ParseTable {
    pub rows: Vec<BTreeMap<String, ParseInstr>>,
}

impl ParseTable {
    pub fn action(&self, state: usize, symbol: &str) -> Option<ParseInstr> {
        self.rows.get(state).and_then(|row| row.get(symbol)).copied()
    }
}

pub(crate) fn build_table<V>(
    rules: &[Rule<V>],
    by_lhs: &HashMap<&str, Vec<usize>>,
    states: &IndexSet<ItemSet>,
    ff: &FirstFollow,
    precedence: &HashMap<String, (usize, Assoc)>,
    is_terminal: &dyn Fn(&str) -> bool,
) -> (ParseTable, Vec<Conflict>) {
    let mut rows: Vec<BTreeMap<String, ParseInstr>> = vec![BTreeMap::new(); states.len()];
    let mut conflicts = Vec::new();

    for (i, state) in states.iter().enumerate() {
        for item in state {
            let rule = &rules[item.rule];
            if let Some(next) = rule.rhs.get(item.dot) {
                let target = goto_over(state, next, rules, by_lhs);
                let Some(j) = states.get_index_of(&target) else {
                    continue;
                };
                let instr = if is_terminal(next) {
                    ParseInstr::Shift(j)
                } else {
                    ParseInstr::Goto(j)
                };
                insert_action(
                    &mut rows[i],
                    next.clone(),
                    instr,
                    rules,
                    precedence,
                    is_terminal,
                    &mut conflicts,
                );
            } else if item.rule == 0 {
                // Completed start rule: accept on end of input.
                rows[i].insert(symbols::END.into(), ParseInstr::Accept);
            } else {
                let instr = ParseInstr::Reduce(item.rule);
                for terminal in ff.follow(&rule.lhs).into_iter().flatten() {
                    insert_action(
                        &mut rows[i],
                        terminal.clone(),
                        instr,
                        rules,
                        precedence,
                        is_terminal,
                        &mut conflicts,
                    );
                }
            }
        }
    }

    (ParseTable { rows }, conflicts)
}

fn insert_action<V>(
    row: &mut BTreeMap<String, ParseInstr>,
    lookahead: String,
    candidate: ParseInstr,
    rules: &[Rule<V>],
    precedence: &HashMap<String, (usize, Assoc)>,
    is_terminal: &dyn Fn(&str) -> bool,
    conflicts: &mut Vec<Conflict>,
) {
    match row.get(lookahead.as_str()).copied() {
        None => {
            row.insert(lookahead, candidate);
        }
        // The same instruction proposed by several items is not a
        // collision.
        Some(existing) if existing == candidate => {}
        Some(existing) => {
            resolve(
                row, lookahead, existing, candidate, rules, precedence, is_terminal, conflicts,
            );
        }
    }
}

// The precedence key of an instruction: the lookahead for a shift, the
// rightmost terminal of the reduced production for a reduce.
fn instr_key<'r, V>(
    instr: ParseInstr,
    lookahead: &'r str,
    rules: &'r [Rule<V>],
    is_terminal: &dyn Fn(&str) -> bool,
) -> Option<&'r str> {
    match instr {
        ParseInstr::Reduce(rule) => rightmost_terminal(&rules[rule].rhs, is_terminal),
        _ => Some(lookahead),
    }
}

pub(crate) fn rightmost_terminal<'r>(
    rhs: &'r [String],
    is_terminal: &dyn Fn(&str) -> bool,
) -> Option<&'r str> {
    rhs.iter()
        .rev()
        .find(|symbol| is_terminal(symbol))
        .map(|symbol| symbol.as_str())
}

#[allow(clippy::too_many_arguments)]
fn resolve<V>(
    row: &mut BTreeMap<String, ParseInstr>,
    lookahead: String,
    existing: ParseInstr,
    candidate: ParseInstr,
    rules: &[Rule<V>],
    precedence: &HashMap<String, (usize, Assoc)>,
    is_terminal: &dyn Fn(&str) -> bool,
    conflicts: &mut Vec<Conflict>,
) {
    let of_existing = instr_key(existing, &lookahead, rules, is_terminal)
        .and_then(|key| precedence.get(key))
        .copied();
    let of_candidate = instr_key(candidate, &lookahead, rules, is_terminal)
        .and_then(|key| precedence.get(key))
        .copied();

    match (of_existing, of_candidate) {
        (Some((existing_level, _)), Some((candidate_level, assoc))) => {
            if candidate_level > existing_level {
                row.insert(lookahead, candidate);
            } else if candidate_level == existing_level {
                match (existing, candidate) {
                    (ParseInstr::Shift(_), ParseInstr::Reduce(_)) => {
                        let winner = match assoc {
                            Assoc::Left => candidate,
                            Assoc::Right => existing,
                        };
                        row.insert(lookahead, winner);
                    }
                    (ParseInstr::Reduce(_), ParseInstr::Shift(_)) => {
                        let winner = match assoc {
                            Assoc::Left => existing,
                            Assoc::Right => candidate,
                        };
                        row.insert(lookahead, winner);
                    }
                    // Two reduces at one level cannot be arbitrated.
                    _ => conflicts.push(Conflict {
                        chosen: existing,
                        other: candidate,
                        lookahead,
                    }),
                }
            }
            // A lower candidate level keeps the existing entry.
        }
        _ => conflicts.push(Conflict {
            chosen: existing,
            other: candidate,
            lookahead,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::first_follow::FirstFollow;
    use crate::grammar::{index_by_lhs, Precedence, Rule};
    use crate::slr::canonical_collection;

    fn is_terminal(symbol: &str) -> bool {
        matches!(symbol, "INT" | "ADD" | "MUL" | "END")
    }

    fn build(
        rules: &[Rule<i64>],
        precedence: &Precedence,
    ) -> (ParseTable, Vec<Conflict>) {
        let by_lhs = index_by_lhs(rules);
        let ff = FirstFollow::compute(rules, &|s| is_terminal(s));
        let states = canonical_collection(rules, &by_lhs);
        build_table(
            rules,
            &by_lhs,
            &states,
            &ff,
            &precedence.resolve(),
            &|s| is_terminal(s),
        )
    }

    // start -> sum; sum -> sum ADD INT; sum -> INT
    // State layout is fixed by discovery order:
    //   0 seed, 1 on INT, 2 on sum, 3 on sum ADD, 4 on sum ADD INT.
    #[test]
    fn unambiguous_grammar_builds_a_clean_table() {
        let rules: Vec<Rule<i64>> = vec![
            Rule::passthrough("start", &["sum"]),
            Rule::passthrough("sum", &["sum", "ADD", "INT"]),
            Rule::passthrough("sum", &["INT"]),
        ];
        let (table, conflicts) = build(&rules, &Precedence::new());
        assert!(conflicts.is_empty());

        assert_eq!(table.action(0, "INT"), Some(ParseInstr::Shift(1)));
        assert_eq!(table.action(0, "sum"), Some(ParseInstr::Goto(2)));
        assert_eq!(table.action(1, "END"), Some(ParseInstr::Reduce(2)));
        assert_eq!(table.action(1, "ADD"), Some(ParseInstr::Reduce(2)));
        assert_eq!(table.action(2, "END"), Some(ParseInstr::Accept));
        assert_eq!(table.action(2, "ADD"), Some(ParseInstr::Shift(3)));
        assert_eq!(table.action(3, "INT"), Some(ParseInstr::Shift(4)));
        assert_eq!(table.action(4, "ADD"), Some(ParseInstr::Reduce(1)));
        assert_eq!(table.action(4, "END"), Some(ParseInstr::Reduce(1)));
        assert_eq!(table.action(0, "MUL"), None);
    }

    fn ambiguous_rules() -> Vec<Rule<i64>> {
        vec![
            Rule::passthrough("start", &["expr"]),
            Rule::passthrough("expr", &["expr", "ADD", "expr"]),
            Rule::passthrough("expr", &["expr", "MUL", "expr"]),
            Rule::passthrough("expr", &["INT"]),
        ]
    }

    #[test]
    fn without_precedence_collisions_are_recorded_first_wins() {
        let (table, conflicts) = build(&ambiguous_rules(), &Precedence::new());
        // One shift/reduce collision per operator in each of the two
        // "expr OP expr" states.
        assert_eq!(conflicts.len(), 4);
        for conflict in &conflicts {
            let tags = (conflict.chosen.tag(), conflict.other.tag());
            assert!(tags == ("SHIFT", "REDUCE") || tags == ("REDUCE", "SHIFT"));
        }
        // Whichever instruction landed first is still in the table.
        for row in &table.rows {
            for conflict in &conflicts {
                if let Some(instr) = row.get(conflict.lookahead.as_str()) {
                    assert_ne!(instr.tag(), "GOTO");
                }
            }
        }
        // The reduce for "expr ADD expr" is proposed after the shift on
        // ADD but before the shift on MUL, so both orders occur.
        assert!(conflicts.iter().any(|c| c.chosen.tag() == "SHIFT"));
        assert!(conflicts.iter().any(|c| c.chosen.tag() == "REDUCE"));
    }

    #[test]
    fn conflict_lists_are_deterministic() {
        let (_, first) = build(&ambiguous_rules(), &Precedence::new());
        let (_, second) = build(&ambiguous_rules(), &Precedence::new());
        assert_eq!(first, second);
    }

    #[test]
    fn precedence_levels_pick_the_tighter_operator() {
        let precedence = Precedence::new()
            .level(Assoc::Left, &["ADD"])
            .level(Assoc::Right, &["MUL"]);
        let (table, conflicts) = build(&ambiguous_rules(), &precedence);
        assert!(conflicts.is_empty());

        // After expr ADD expr, MUL binds tighter: shift. After
        // expr MUL expr, ADD is looser: reduce.
        let mut saw_shift_mul = false;
        let mut saw_reduce_add = false;
        for row in &table.rows {
            if row.get("ADD") == Some(&ParseInstr::Reduce(1)) {
                assert!(matches!(row.get("MUL"), Some(ParseInstr::Shift(_))));
                saw_shift_mul = true;
            }
            if row.get("ADD") == Some(&ParseInstr::Reduce(2)) {
                assert!(matches!(row.get("MUL"), Some(ParseInstr::Shift(_))));
                saw_reduce_add = true;
            }
        }
        assert!(saw_shift_mul);
        assert!(saw_reduce_add);
    }

    #[test]
    fn swapping_levels_flips_the_resolution() {
        let low_mul = Precedence::new()
            .level(Assoc::Left, &["MUL"])
            .level(Assoc::Left, &["ADD"]);
        let (table, conflicts) = build(&ambiguous_rules(), &low_mul);
        assert!(conflicts.is_empty());
        // Now ADD binds tighter than MUL: after expr MUL expr the
        // lookahead ADD shifts.
        let mut saw = false;
        for row in &table.rows {
            if row.get("MUL") == Some(&ParseInstr::Reduce(2)) {
                assert!(matches!(row.get("ADD"), Some(ParseInstr::Shift(_))));
                saw = true;
            }
        }
        assert!(saw);
    }

    #[test]
    fn same_level_associativity_decides_shift_or_reduce() {
        let left = Precedence::new().level(Assoc::Left, &["ADD", "MUL"]);
        let (table, conflicts) = build(&ambiguous_rules(), &left);
        assert!(conflicts.is_empty());
        for row in &table.rows {
            if row.values().any(|i| *i == ParseInstr::Reduce(1)) {
                // Left associativity reduces on the same level.
                assert_eq!(row.get("ADD"), Some(&ParseInstr::Reduce(1)));
            }
        }

        let right = Precedence::new().level(Assoc::Right, &["ADD", "MUL"]);
        let (table, conflicts) = build(&ambiguous_rules(), &right);
        assert!(conflicts.is_empty());
        let mut saw = false;
        for row in &table.rows {
            // Right associativity keeps the shift on the same level; the
            // reduce survives only on END.
            if row.values().any(|i| *i == ParseInstr::Reduce(1)) {
                assert_eq!(row.get("ADD").map(ParseInstr::tag), Some("SHIFT"));
                assert_eq!(row.get("MUL").map(ParseInstr::tag), Some("SHIFT"));
                saw = true;
            }
        }
        assert!(saw);
    }

    #[test]
    fn rightmost_terminal_scans_from_the_end() {
        let rhs: Vec<String> = ["expr", "ADD", "expr"].iter().map(|s| (*s).into()).collect();
        assert_eq!(rightmost_terminal(&rhs, &|s| is_terminal(s)), Some("ADD"));
        let none: Vec<String> = ["expr"].iter().map(|s| (*s).into()).collect();
        assert_eq!(rightmost_terminal(&none, &|s| is_terminal(s)), None);
    }
}
