//! Runtime SLR(1) parser construction driven by an indentation-aware
//! lexer.
//!
//! A [`Parser`] is built at runtime from three plain data structures: an
//! ordered token-definition map (regular expressions plus optional
//! rewrite hooks), an ordered list of production rules with reduction
//! callbacks, and an operator precedence table. Construction derives
//! first/follow sets, the canonical LR(0) item-set collection, and an
//! action/goto table whose shift/reduce collisions are settled by
//! precedence; parsing then drives the table over the token stream,
//! invoking the reducers bottom-up to build the caller's semantic
//! values.
//!
//! The lexer understands layout: runs of newlines fold into one
//! `NEWLINE` token, and changes in leading indentation synthesise
//! `INDENT`/`DEDENT` tokens with proper stack discipline, the way
//! Python-like surface syntax expects.

mod first_follow;
mod slr;
mod table;

pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;

pub use crate::error::{GrammarError, SyntaxError};
pub use crate::grammar::{Assoc, Precedence, Reducer, Rule};
pub use crate::lexer::{
    is_reserved, symbols, IndentLexer, LexToken, TokenDef, TokenDefs, TokenRewrite,
};
pub use crate::parser::Parser;
pub use crate::table::{Conflict, ParseInstr};
