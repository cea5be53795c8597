//! # Terms, literals and clauses
//!
//! This module defines the core data model of the engine. Terms are either
//! interned constants or variables; literals apply a predicate to a list of
//! terms; clauses derive a head literal from a conjunctive body.
//!
//! All identifiers are numeric. Constants receive non-negative ids from the
//! interner, while freshened variables count downwards from zero, so the two
//! populations can never collide after rewriting (see
//! [`freshen`](crate::env::freshen)).

use std::fmt;

/// A single term position in a literal.
///
/// The payload is an id handed out by the database's symbol table. Constants
/// and variables share the integer type but not (in practice) the id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// An interned ground atom.
    Constant(i64),
    /// A variable, identified by interned name or by a freshened negative id.
    Variable(i64),
}

impl Term {
    /// Returns `true` for [`Term::Constant`].
    #[inline]
    pub fn is_constant(self) -> bool {
        matches!(self, Term::Constant(_))
    }

    /// The raw id, regardless of tag.
    #[inline]
    pub fn value(self) -> i64 {
        match self {
            Term::Constant(v) | Term::Variable(v) => v,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(v) => write!(f, "c{}", v),
            Term::Variable(v) => write!(f, "v{}", v),
        }
    }
}

/// A predicate applied to terms, with an optional negation flag.
///
/// Predicate identity is by name; the arity is implicit in the term count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Literal {
    pub predicate: String,
    pub negated: bool,
    pub terms: Vec<Term>,
}

impl Literal {
    /// Build a positive literal.
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Literal {
        Literal {
            predicate: predicate.into(),
            negated: false,
            terms,
        }
    }

    /// Flip this literal into its negated form.
    pub fn negate(mut self) -> Literal {
        self.negated = true;
        self
    }

    /// A copy of this literal with the negation flag cleared.
    pub(crate) fn positive(&self) -> Literal {
        let mut l = self.clone();
        l.negated = false;
        l
    }

    /// Whether every term is a constant.
    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(|t| t.is_constant())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        write!(f, "{}", self.predicate)?;
        if let Some((first, rest)) = self.terms.split_first() {
            write!(f, "({}", first)?;
            for t in rest {
                write!(f, ", {}", t)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A rule deriving `head` from the conjunction of `body`; a fact when the
/// body is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub head: Literal,
    pub body: Vec<Literal>,
}

impl Clause {
    pub fn new(head: Literal, body: Vec<Literal>) -> Clause {
        Clause { head, body }
    }

    /// A clause with an empty body.
    pub fn fact(head: Literal) -> Clause {
        Clause { head, body: vec![] }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if let Some((first, rest)) = self.body.split_first() {
            write!(f, " :- {}", first)?;
            for l in rest {
                write!(f, ", {}", l)?;
            }
        }
        Ok(())
    }
}

/// A not-yet-interned term used by the programmatic constructors on
/// [`Database`](crate::database::Database).
///
/// Build one with [`var`] or [`atom`]; `Database::literal` interns the text
/// and produces the corresponding [`Term`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermSpec {
    pub(crate) text: String,
    pub(crate) is_var: bool,
}

/// A variable term spec, by name.
pub fn var(name: impl Into<String>) -> TermSpec {
    TermSpec {
        text: name.into(),
        is_var: true,
    }
}

/// A constant term spec. Anything printable works, so enum-like domain
/// values can be passed directly.
pub fn atom(value: impl fmt::Display) -> TermSpec {
    TermSpec {
        text: value.to_string(),
        is_var: false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn literal_display() {
        let l = Literal::new("edge", vec![Term::Constant(3), Term::Variable(-1)]);
        assert_eq!(l.to_string(), "edge(c3, v-1)");
        assert_eq!(l.clone().negate().to_string(), "!edge(c3, v-1)");
    }

    #[test]
    fn zero_arity_display() {
        let l = Literal::new("true", vec![]);
        assert_eq!(l.to_string(), "true");
    }

    #[test]
    fn clause_display() {
        let c = Clause::new(
            Literal::new("p", vec![Term::Variable(1)]),
            vec![
                Literal::new("q", vec![Term::Variable(1)]),
                Literal::new("r", vec![Term::Variable(1)]).negate(),
            ],
        );
        assert_eq!(c.to_string(), "p(v1) :- q(v1), !r(v1)");
    }

    #[test]
    fn groundness() {
        assert!(Literal::new("p", vec![Term::Constant(0)]).is_ground());
        assert!(!Literal::new("p", vec![Term::Variable(0)]).is_ground());
        assert!(Literal::new("p", vec![]).is_ground());
    }
}
