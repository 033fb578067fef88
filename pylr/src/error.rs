//! Error types for grammar construction and for lexing/parsing source text.
//!
//! Construction-time problems (a production mentioning a symbol nobody
//! defines, a token pattern that does not compile) surface as
//! [`GrammarError`]. Everything that can go wrong while consuming source
//! text surfaces as [`SyntaxError`].

use smartstring::alias::String;
use thiserror::Error;

/// A failure while turning source text into tokens or a parse tree.
#[derive(Debug, Clone, Error)]
pub enum SyntaxError {
    /// No token pattern matches at the current position.
    #[error("no token matches {found:?} at line {lineno}, column {colno}")]
    Lexical {
        lineno: usize,
        colno: usize,
        found: char,
    },

    /// A dedent landed on a column that closes no open block.
    #[error("unindent does not match any outer indentation level on line {lineno}")]
    Indentation { lineno: usize },

    /// The action table has no entry for the current state and lookahead.
    /// Carries the dump of the offending state.
    #[error("unable to handle lookahead {lookahead:?} in state {state}\n\n{dump}")]
    Parse {
        state: usize,
        lookahead: String,
        dump: std::string::String,
    },

    /// The driver hit a situation only a table-builder bug can produce.
    #[error("parser internal error: {0}")]
    Internal(&'static str),
}

/// A construction-time problem with the supplied grammar or token set.
#[derive(Debug, Clone, Error)]
pub enum GrammarError {
    #[error("grammar has no rules")]
    Empty,

    /// A right-hand-side symbol is neither a terminal nor the head of
    /// any rule.
    #[error("symbol {symbol:?} in rule {rule} is neither a terminal nor a rule head")]
    UnknownSymbol { symbol: String, rule: usize },

    /// A token pattern failed to compile.
    #[error("token pattern error: {0}")]
    Pattern(std::string::String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_error_trait_obj(e: &dyn std::error::Error) -> &dyn std::error::Error {
        e
    }

    #[test]
    fn lexical_error_display() {
        let err = SyntaxError::Lexical {
            lineno: 1,
            colno: 1,
            found: '@',
        };
        let _ = _assert_error_trait_obj(&err);
        let msg = err.to_string();
        assert!(msg.contains("'@'"));
        assert!(msg.contains("line 1"));
    }

    #[test]
    fn indentation_error_display() {
        let err = SyntaxError::Indentation { lineno: 3 };
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn parse_error_carries_state_dump() {
        let err = SyntaxError::Parse {
            state: 7,
            lookahead: "ADD".into(),
            dump: "state 7\n".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"ADD\""));
        assert!(msg.contains("state 7"));
    }

    #[test]
    fn grammar_error_names_the_rule() {
        let err = GrammarError::UnknownSymbol {
            symbol: "wat".into(),
            rule: 4,
        };
        assert!(err.to_string().contains("rule 4"));
    }

    fn _assert_send_sync_static<T: Send + Sync + 'static>() {}
    #[test]
    fn errors_are_send_sync_static() {
        _assert_send_sync_static::<SyntaxError>();
        _assert_send_sync_static::<GrammarError>();
    }
}
