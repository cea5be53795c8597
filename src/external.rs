//! # External relations
//!
//! An external relation materializes tuples on demand instead of storing
//! facts. It carries a head template (predicate plus placeholder variables)
//! and a callable that receives the calling terms and the database's
//! [`Interner`]. The callable must enumerate every tuple consistent with
//! whichever call terms are already constants, and must return constant
//! terms only; the evaluator re-unifies each returned tuple against the
//! calling subgoal, so relations never need to handle repeated-variable
//! calls like `p(X, X)` themselves.

use std::fmt;

use thiserror::Error;

use crate::intern::Interner;
use crate::term::{Literal, Term};

/// An error surfaced by a user-supplied relation callable. The evaluator
/// treats it as fatal for the current query.
#[derive(Debug, Clone, Error)]
#[error("external relation failed: {0}")]
pub struct RelationError(pub String);

/// Tuples produced by one invocation of a relation.
pub type RelationResult = Result<Vec<Vec<Term>>, RelationError>;

type RelationFn = Box<dyn Fn(&dyn Interner, &[Term]) -> RelationResult + Send + Sync>;

/// A user-supplied relation whose tuples are computed by callback.
pub struct ExternalRelation {
    pub(crate) head: Literal,
    pub(crate) run: RelationFn,
}

impl fmt::Debug for ExternalRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalRelation")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Placeholder variables `v0..vn` for relation head templates.
pub(crate) fn make_vars(n: usize) -> Vec<Term> {
    (0..n as i64).map(Term::Variable).collect()
}

impl ExternalRelation {
    /// Build a relation from a predicate name, an arity and a callable.
    pub fn new<F>(predicate: impl Into<String>, arity: usize, run: F) -> ExternalRelation
    where
        F: Fn(&dyn Interner, &[Term]) -> RelationResult + Send + Sync + 'static,
    {
        ExternalRelation {
            head: Literal::new(predicate, make_vars(arity)),
            run: Box::new(run),
        }
    }

    /// The head template this relation answers for.
    pub fn head(&self) -> &Literal {
        &self.head
    }

    /// A relation backed by an in-memory table of string tuples.
    ///
    /// Every invocation interns each cell and returns all rows whose
    /// constant-bound columns match the call. This is the narrow shape a
    /// database-backed adapter would take; swapping the row source for a SQL
    /// query changes nothing on the engine side.
    pub fn table(
        predicate: impl Into<String>,
        arity: usize,
        rows: Vec<Vec<String>>,
    ) -> ExternalRelation {
        ExternalRelation::new(predicate, arity, move |interner, call| {
            let mut tuples = Vec::new();
            for row in &rows {
                let tuple: Vec<Term> = row
                    .iter()
                    .map(|cell| Term::Constant(interner.intern(cell)))
                    .collect();
                let matches = call
                    .iter()
                    .zip(&tuple)
                    .all(|(&c, &t)| !c.is_constant() || c == t);
                if matches {
                    tuples.push(tuple);
                }
            }
            Ok(tuples)
        })
    }
}

/// The `in/2` ground-set membership built-in, registered on every database.
///
/// The second argument must be a stored set handle; the surface syntax
/// guarantees this by restricting set literals to constants.
pub(crate) fn membership_relation() -> ExternalRelation {
    ExternalRelation::new("in", 2, |interner, terms| {
        let set_id = match terms[1] {
            Term::Constant(v) => v,
            Term::Variable(_) => {
                panic!("in/2 requires a ground set argument; the parser guarantees this")
            }
        };
        let set = interner.get_set(set_id);
        match terms[0] {
            Term::Constant(v) => {
                if set.contains(v) {
                    Ok(vec![terms.to_vec()])
                } else {
                    Ok(vec![])
                }
            }
            Term::Variable(_) => Ok(set
                .iter()
                .map(|member| vec![Term::Constant(member), terms[1]])
                .collect()),
        }
    })
}
