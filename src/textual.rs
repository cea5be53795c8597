//! # The surface syntax
//!
//! A small Datalog dialect for loading policies and asking questions:
//!
//! ```text
//! % facts and rules are asserted with '.'
//! parent(john, douglas).
//! ancestor(A, B) :- parent(A, B).
//! ancestor(A, B) :- parent(A, C), ancestor(C, B).
//!
//! % queries end with '?'
//! ancestor(ebbon, X)?
//! ```
//!
//! Unquoted identifiers starting with an uppercase letter are variables;
//! everything else is a constant. `'Quoted'` identifiers are constants
//! regardless of case. `!` negates a body literal, `X in [a, b, c]` is
//! shorthand for membership in a stored ground set, and `~` marks a
//! retraction (parsed, but unsupported by evaluation). `%` starts a line
//! comment.
//!
//! Parsing happens against a [`Database`](crate::database::Database) because
//! identifiers are interned on sight; see
//! [`Database::parse`](crate::database::Database::parse).

mod lexer;
mod parser;
mod pretty;

pub use parser::{ParseError, ParseErrorKind, Parser};
