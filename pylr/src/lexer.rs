//! The indentation-aware lexer.
//!
//! Token patterns are supplied at runtime as an ordered map of regular
//! expressions. All patterns are compiled into one anchored dense DFA and
//! stepped byte-by-byte against the remaining input, keeping the longest
//! match; ties go to the pattern defined first. Synthetic `INDENT` /
//! `DEDENT` tokens are derived from the column of the first real token on
//! each line, against a stack of open indentation levels.

use crate::error::{GrammarError, SyntaxError};
use indexmap::IndexMap;
use regex_automata::dfa::{dense, Automaton, StartKind};
use regex_automata::{Anchored, Input, MatchKind};
use smartstring::alias::String;
use std::collections::VecDeque;

/// Reserved terminal names. Only `NEWLINE` needs a pattern in the token
/// map; the others are synthesised or stand for the empty production.
pub mod symbols {
    pub const END: &str = "END";
    pub const NEWLINE: &str = "NEWLINE";
    pub const INDENT: &str = "INDENT";
    pub const DEDENT: &str = "DEDENT";
    pub const EMPTY: &str = "EMPTY";
}

/// Is `symbol` one of the reserved terminal names?
pub fn is_reserved(symbol: &str) -> bool {
    matches!(
        symbol,
        symbols::END | symbols::NEWLINE | symbols::INDENT | symbols::DEDENT | symbols::EMPTY
    )
}

/// A single lexed token. Positions are 1-based; `pos` is the byte offset
/// of the first character in the source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexToken {
    pub symbol: String,
    pub value: String,
    pub pos: usize,
    pub lineno: usize,
    pub colno: usize,
}

/// Post-match hook; may replace the token's symbol (e.g. reclassify a
/// matched name into a reserved-word terminal).
pub type TokenRewrite = fn(&IndentLexer, LexToken) -> LexToken;

/// A terminal definition: the pattern to match and an optional rewrite.
#[derive(Clone)]
pub struct TokenDef {
    pub pattern: String,
    pub rewrite: Option<TokenRewrite>,
}

impl TokenDef {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.into(),
            rewrite: None,
        }
    }

    pub fn with_rewrite(pattern: &str, rewrite: TokenRewrite) -> Self {
        Self {
            pattern: pattern.into(),
            rewrite: Some(rewrite),
        }
    }
}

/// Ordered token definitions; insertion order is the match tie-break order.
pub type TokenDefs = IndexMap<String, TokenDef>;

fn synthetic(symbol: &str, at: &LexToken) -> LexToken {
    LexToken {
        symbol: symbol.into(),
        value: "".into(),
        pos: at.pos,
        lineno: at.lineno,
        colno: 1,
    }
}

pub struct IndentLexer {
    defs: TokenDefs,
    dfa: dense::DFA<Vec<u32>>,
    // pattern index -> terminal name, in definition order
    pattern_symbols: Vec<String>,

    src: std::string::String,
    off: usize,
    lineno: usize,
    colno: usize,

    // Open indentation levels; always starts with column 1.
    levels: Vec<usize>,
    pending: VecDeque<LexToken>,
}

impl IndentLexer {
    /// Compiles the token patterns. Reserved symbols other than `NEWLINE`
    /// are synthesised and need no pattern, even if present in `defs`.
    pub fn new(defs: TokenDefs) -> Result<Self, GrammarError> {
        let mut patterns: Vec<&str> = Vec::new();
        let mut pattern_symbols = Vec::new();
        for (symbol, def) in &defs {
            if is_reserved(symbol) && symbol != symbols::NEWLINE {
                continue;
            }
            patterns.push(def.pattern.as_str());
            pattern_symbols.push(symbol.clone());
        }
        let dfa = dense::Builder::new()
            .configure(
                dense::Config::new()
                    .match_kind(MatchKind::All)
                    .start_kind(StartKind::Anchored),
            )
            .build_many(&patterns)
            .map_err(|e| GrammarError::Pattern(e.to_string()))?;
        Ok(Self {
            defs,
            dfa,
            pattern_symbols,
            src: Default::default(),
            off: 0,
            lineno: 1,
            colno: 1,
            levels: vec![1],
            pending: VecDeque::new(),
        })
    }

    /// Resets the lexer to the start of a new source string.
    pub fn input(&mut self, source: &str) {
        self.src.clear();
        self.src.push_str(source);
        self.off = 0;
        self.lineno = 1;
        self.colno = 1;
        self.levels.clear();
        self.levels.push(1);
        self.pending.clear();
    }

    /// Is `symbol` defined in the token map?
    pub fn defines(&self, symbol: &str) -> bool {
        self.defs.contains_key(symbol)
    }

    /// A symbol is a terminal iff it is defined in the token map or is
    /// one of the reserved names.
    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.defines(symbol) || is_reserved(symbol)
    }

    /// Returns the next token. After the input is exhausted this keeps
    /// returning the `END` sentinel.
    pub fn token(&mut self) -> Result<LexToken, SyntaxError> {
        loop {
            if let Some(tok) = self.pending.pop_front() {
                log::trace!(
                    "token {} {:?} at {}:{}",
                    tok.symbol,
                    tok.value,
                    tok.lineno,
                    tok.colno
                );
                return Ok(tok);
            }
            self.fill_pending()?;
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<LexToken, SyntaxError> {
        loop {
            if let Some(tok) = self.pending.front() {
                return Ok(tok.clone());
            }
            self.fill_pending()?;
        }
    }

    fn top_level(&self) -> usize {
        self.levels.last().copied().unwrap_or(1)
    }

    // Scans at least one more token into the pending queue, weaving in
    // synthetic INDENT/DEDENT tokens after each run of newlines.
    fn fill_pending(&mut self) -> Result<(), SyntaxError> {
        let tok = self.scan_raw()?;
        if tok.symbol == symbols::END {
            self.close_blocks(&tok);
            self.pending.push_back(tok);
            return Ok(());
        }
        let was_newline = tok.symbol == symbols::NEWLINE;
        self.pending.push_back(tok);
        if !was_newline {
            return Ok(());
        }

        // The first token of the next line decides whether blocks open
        // or close. Blank lines in between carry no indentation.
        let mut next = self.scan_raw()?;
        while next.symbol == symbols::NEWLINE {
            self.pending.push_back(next);
            next = self.scan_raw()?;
        }
        if next.symbol == symbols::END {
            self.close_blocks(&next);
            self.pending.push_back(next);
            return Ok(());
        }

        let col = next.colno;
        let top = self.top_level();
        if col > top {
            self.levels.push(col);
            self.pending.push_back(synthetic(symbols::INDENT, &next));
        } else if col < top {
            let mut pops = 0;
            while self.top_level() > col {
                self.levels.pop();
                pops += 1;
            }
            if self.top_level() != col {
                return Err(SyntaxError::Indentation {
                    lineno: next.lineno,
                });
            }
            for _ in 0..pops {
                self.pending.push_back(synthetic(symbols::DEDENT, &next));
            }
        }
        self.pending.push_back(next);
        Ok(())
    }

    // Emits one DEDENT per block still open at end of input.
    fn close_blocks(&mut self, at: &LexToken) {
        while self.levels.len() > 1 {
            self.levels.pop();
            self.pending.push_back(synthetic(symbols::DEDENT, at));
        }
    }

    // Scans one real token at the current position, skipping blanks.
    // Returns the END sentinel once the input is exhausted.
    fn scan_raw(&mut self) -> Result<LexToken, SyntaxError> {
        self.skip_blanks();
        if self.off >= self.src.len() {
            return Ok(LexToken {
                symbol: symbols::END.into(),
                value: "".into(),
                pos: self.off + 1,
                lineno: self.lineno,
                colno: self.colno,
            });
        }

        let (pattern, len) = self.longest_match()?;
        let start = self.off;
        let (lineno, colno) = (self.lineno, self.colno);
        let value: String = self.src[start..start + len].into();
        self.consume(len);

        let mut tok = LexToken {
            symbol: self.pattern_symbols[pattern].clone(),
            value,
            pos: start + 1,
            lineno,
            colno,
        };
        if let Some(rewrite) = self.defs.get(tok.symbol.as_str()).and_then(|d| d.rewrite) {
            tok = rewrite(self, tok);
        }
        Ok(tok)
    }

    fn skip_blanks(&mut self) {
        let bytes = self.src.as_bytes();
        while let Some(&b) = bytes.get(self.off) {
            if b != b' ' && b != b'\t' {
                break;
            }
            self.off += 1;
            self.colno += 1;
        }
    }

    fn consume(&mut self, len: usize) {
        for &b in &self.src.as_bytes()[self.off..self.off + len] {
            if b == b'\n' {
                self.lineno += 1;
                self.colno = 1;
            } else {
                self.colno += 1;
            }
        }
        self.off += len;
    }

    // Steps the DFA over the remaining input and keeps the last match:
    // the longest one, with ties resolved to the lowest pattern index.
    // Match states lag the input by one byte, so a match seen after
    // feeding byte `i` covers exactly the first `i` bytes.
    fn longest_match(&self) -> Result<(usize, usize), SyntaxError> {
        let rest = &self.src.as_bytes()[self.off..];
        let input = Input::new(rest).anchored(Anchored::Yes);
        let Ok(mut state) = self.dfa.start_state_forward(&input) else {
            return Err(self.lexical_error());
        };

        let mut best: Option<(usize, usize)> = None;
        let mut ended_early = false;
        for (i, &b) in rest.iter().enumerate() {
            state = self.dfa.next_state(state, b);
            if self.dfa.is_special_state(state) {
                if self.dfa.is_match_state(state) {
                    best = Some((self.dfa.match_pattern(state, 0).as_usize(), i));
                } else if self.dfa.is_dead_state(state) || self.dfa.is_quit_state(state) {
                    ended_early = true;
                    break;
                }
            }
        }
        if !ended_early {
            state = self.dfa.next_eoi_state(state);
            if self.dfa.is_match_state(state) {
                best = Some((self.dfa.match_pattern(state, 0).as_usize(), rest.len()));
            }
        }

        match best {
            Some((pattern, len)) if len > 0 => Ok((pattern, len)),
            _ => Err(self.lexical_error()),
        }
    }

    fn lexical_error(&self) -> SyntaxError {
        SyntaxError::Lexical {
            lineno: self.lineno,
            colno: self.colno,
            found: self.src[self.off..].chars().next().unwrap_or('\0'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn defs() -> TokenDefs {
        let mut defs = TokenDefs::new();
        defs.insert("INT".into(), TokenDef::new(r"\d+"));
        defs.insert(
            "NAME".into(),
            TokenDef::with_rewrite(r"[a-zA-Z_][a-zA-Z0-9_]*", promote_def),
        );
        defs.insert("ADD".into(), TokenDef::new(r"\+"));
        defs.insert("SUB".into(), TokenDef::new(r"-"));
        defs.insert("DEF".into(), TokenDef::new(r"def"));
        defs.insert("NEWLINE".into(), TokenDef::new(r"\n+"));
        defs
    }

    fn promote_def(_lexer: &IndentLexer, mut tok: LexToken) -> LexToken {
        if tok.value == "def" {
            tok.symbol = "DEF".into();
        }
        tok
    }

    fn lexer() -> IndentLexer {
        IndentLexer::new(defs()).unwrap()
    }

    #[track_caller]
    fn expect(lex: &mut IndentLexer, symbol: &str, value: &str, lineno: usize, colno: usize) {
        let tok = lex.token().unwrap();
        assert_eq!(tok.symbol, symbol);
        assert_eq!(tok.value, value);
        assert_eq!(tok.lineno, lineno, "lineno of {:?}", tok);
        assert_eq!(tok.colno, colno, "colno of {:?}", tok);
    }

    #[test]
    fn fresh_lexer_yields_end_forever() {
        init_logger();
        let mut lex = lexer();
        for _ in 0..3 {
            let tok = lex.token().unwrap();
            assert_eq!(tok.symbol, symbols::END);
            assert_eq!(tok.value, "");
            assert_eq!(tok.lineno, 1);
            assert_eq!(tok.colno, 1);
        }
    }

    #[test]
    fn basic_input_positions() {
        init_logger();
        let mut lex = lexer();
        lex.input("x + y\n4-3");
        expect(&mut lex, "NAME", "x", 1, 1);
        expect(&mut lex, "ADD", "+", 1, 3);
        expect(&mut lex, "NAME", "y", 1, 5);
        expect(&mut lex, "NEWLINE", "\n", 1, 6);
        expect(&mut lex, "INT", "4", 2, 1);
        expect(&mut lex, "SUB", "-", 2, 2);
        expect(&mut lex, "INT", "3", 2, 3);
        expect(&mut lex, "END", "", 2, 4);
    }

    #[test]
    fn byte_positions_are_one_based() {
        let mut lex = lexer();
        lex.input("ab 12");
        assert_eq!(lex.token().unwrap().pos, 1);
        assert_eq!(lex.token().unwrap().pos, 4);
        assert_eq!(lex.token().unwrap().pos, 6);
    }

    #[test]
    fn longest_match_beats_keyword_and_rewrite_restores_it() {
        let mut lex = lexer();
        lex.input("define def");
        // "define" is longer than the DEF pattern, so NAME wins.
        expect(&mut lex, "NAME", "define", 1, 1);
        // Bare "def" ties at length 3; NAME is defined first and its
        // rewrite promotes the lexeme to the keyword terminal.
        expect(&mut lex, "DEF", "def", 1, 8);
    }

    #[test]
    fn input_resets_everything() {
        let mut lex = lexer();
        lex.input("_x");
        expect(&mut lex, "NAME", "_x", 1, 1);
        lex.input("_92");
        let tok = lex.peek().unwrap();
        assert_eq!(tok.value, "_92");
        assert_eq!(tok.colno, 1);
        expect(&mut lex, "NAME", "_92", 1, 1);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lex = lexer();
        lex.input("a b");
        assert_eq!(lex.peek().unwrap().value, "a");
        assert_eq!(lex.peek().unwrap().value, "a");
        assert_eq!(lex.token().unwrap().value, "a");
        assert_eq!(lex.peek().unwrap().value, "b");
    }

    #[test]
    fn indentation_ladder() {
        init_logger();
        let mut lex = lexer();
        lex.input("x\n\n    a\n      b\n\n    d\n\n    e\n6\n7");

        expect(&mut lex, "NAME", "x", 1, 1);
        expect(&mut lex, "NEWLINE", "\n\n", 1, 2);
        expect(&mut lex, "INDENT", "", 3, 1);
        expect(&mut lex, "NAME", "a", 3, 5);
        expect(&mut lex, "NEWLINE", "\n", 3, 6);
        expect(&mut lex, "INDENT", "", 4, 1);
        expect(&mut lex, "NAME", "b", 4, 7);
        expect(&mut lex, "NEWLINE", "\n\n", 4, 8);
        expect(&mut lex, "DEDENT", "", 6, 1);
        expect(&mut lex, "NAME", "d", 6, 5);
        expect(&mut lex, "NEWLINE", "\n\n", 6, 6);
        expect(&mut lex, "NAME", "e", 8, 5);
        expect(&mut lex, "NEWLINE", "\n", 8, 6);
        expect(&mut lex, "DEDENT", "", 9, 1);
        expect(&mut lex, "INT", "6", 9, 1);
        expect(&mut lex, "NEWLINE", "\n", 9, 2);
        expect(&mut lex, "INT", "7", 10, 1);
        expect(&mut lex, "END", "", 10, 2);
    }

    #[test]
    fn misaligned_dedent_is_an_error() {
        let mut lex = lexer();
        lex.input("x\n  y\n z\n");
        expect(&mut lex, "NAME", "x", 1, 1);
        expect(&mut lex, "NEWLINE", "\n", 1, 2);
        expect(&mut lex, "INDENT", "", 2, 1);
        expect(&mut lex, "NAME", "y", 2, 3);
        match lex.token() {
            Err(SyntaxError::Indentation { lineno }) => assert_eq!(lineno, 3),
            other => panic!("expected indentation error, got {:?}", other),
        }
    }

    #[test]
    fn newline_only_source_has_no_indents() {
        let mut lex = lexer();
        lex.input("\n\n\n");
        expect(&mut lex, "NEWLINE", "\n\n\n", 1, 1);
        expect(&mut lex, "END", "", 4, 1);
    }

    #[test]
    fn open_blocks_close_at_end_of_input() {
        let mut lex = lexer();
        lex.input("a\n    b\n        c\n");
        let mut indents = 0;
        let mut dedents = 0;
        loop {
            let tok = lex.token().unwrap();
            match tok.symbol.as_str() {
                symbols::INDENT => indents += 1,
                symbols::DEDENT => dedents += 1,
                symbols::END => break,
                _ => {}
            }
        }
        assert_eq!(indents, 2);
        assert_eq!(indents, dedents);
    }

    #[test]
    fn unmatched_character_is_a_lexical_error() {
        let mut lex = lexer();
        lex.input("@\n");
        match lex.token() {
            Err(SyntaxError::Lexical {
                lineno,
                colno,
                found,
            }) => {
                assert_eq!((lineno, colno), (1, 1));
                assert_eq!(found, '@');
            }
            other => panic!("expected lexical error, got {:?}", other),
        }
    }
}
