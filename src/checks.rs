//! # Static clause checks
//!
//! Every clause passes through here before it enters the store. The checks
//! enforce range restriction (head variables must be derivable from the
//! body) and safe negation (negated literals may only constrain variables a
//! positive literal already grounds). Preprocessing then stably moves
//! negated literals behind the positive ones so the evaluator always solves
//! the grounding literals first.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::intern::Interner;
use crate::term::{Clause, Literal, Term};

/// Rejection reasons for a clause that failed the static checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("clause heads cannot be negated")]
    NegatedHead,
    #[error("variable \"{0}\" appears in the clause head but not in the body; all head variables must be bound by the body")]
    UnboundHeadVariable(String),
    #[error("variable \"{0}\" appears only in negated body literals; negated variables must also be bound by a positive literal")]
    UnsafeNegation(String),
}

fn variables_of(literal: &Literal, into: &mut BTreeSet<i64>) {
    for &t in &literal.terms {
        if let Term::Variable(v) = t {
            into.insert(v);
        }
    }
}

/// Validate a clause against range restriction and safe negation. The
/// interner is only consulted to name the offending variable in errors.
pub(crate) fn check_clause(interner: &dyn Interner, clause: &Clause) -> Result<(), CheckError> {
    if clause.head.negated {
        return Err(CheckError::NegatedHead);
    }

    let mut head_vars = BTreeSet::new();
    let mut positive_vars = BTreeSet::new();
    let mut negative_vars = BTreeSet::new();

    variables_of(&clause.head, &mut head_vars);
    for l in &clause.body {
        if l.negated {
            variables_of(l, &mut negative_vars);
        } else {
            variables_of(l, &mut positive_vars);
        }
    }

    for &v in &head_vars {
        if !positive_vars.contains(&v) && !negative_vars.contains(&v) {
            return Err(CheckError::UnboundHeadVariable(interner.lookup(v)));
        }
    }
    for &v in &negative_vars {
        if !positive_vars.contains(&v) {
            return Err(CheckError::UnsafeNegation(interner.lookup(v)));
        }
    }
    Ok(())
}

/// Stably partition the body so every positive literal precedes every
/// negated one, preserving the original order within each partition.
pub(crate) fn preprocess(mut clause: Clause) -> Clause {
    clause.body.sort_by_key(|l| l.negated);
    clause
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::Database;

    fn v(db: &Database, name: &str) -> Term {
        Term::Variable(Interner::intern(db, name))
    }

    fn c(db: &Database, name: &str) -> Term {
        Term::Constant(Interner::intern(db, name))
    }

    #[test]
    fn rejects_negated_head() {
        let db = Database::new();
        let clause = Clause::fact(Literal::new("p", vec![c(&db, "a")]).negate());
        assert_eq!(check_clause(&db, &clause), Err(CheckError::NegatedHead));
    }

    #[test]
    fn rejects_unbound_head_variable() {
        let db = Database::new();
        let clause = Clause::new(
            Literal::new("p", vec![v(&db, "X")]),
            vec![Literal::new("q", vec![v(&db, "Y")])],
        );
        assert_eq!(
            check_clause(&db, &clause),
            Err(CheckError::UnboundHeadVariable("X".to_owned()))
        );
    }

    #[test]
    fn rejects_variable_only_in_negated_literal() {
        let db = Database::new();
        let clause = Clause::new(
            Literal::new("p", vec![v(&db, "X")]),
            vec![
                Literal::new("q", vec![v(&db, "X")]),
                Literal::new("r", vec![v(&db, "Y")]).negate(),
            ],
        );
        assert_eq!(
            check_clause(&db, &clause),
            Err(CheckError::UnsafeNegation("Y".to_owned()))
        );
    }

    #[test]
    fn accepts_range_restricted_clause_with_safe_negation() {
        let db = Database::new();
        let clause = Clause::new(
            Literal::new("p", vec![v(&db, "X")]),
            vec![
                Literal::new("q", vec![v(&db, "X")]),
                Literal::new("r", vec![v(&db, "X")]).negate(),
            ],
        );
        assert_eq!(check_clause(&db, &clause), Ok(()));
    }

    #[test]
    fn facts_with_constants_pass() {
        let db = Database::new();
        let clause = Clause::fact(Literal::new("p", vec![c(&db, "a")]));
        assert_eq!(check_clause(&db, &clause), Ok(()));
    }

    #[test]
    fn preprocess_moves_negated_literals_last_stably() {
        let db = Database::new();
        let q = Literal::new("q", vec![v(&db, "X")]);
        let r = Literal::new("r", vec![v(&db, "X")]).negate();
        let s = Literal::new("s", vec![v(&db, "X")]);
        let t = Literal::new("t", vec![v(&db, "X")]).negate();
        let clause = Clause::new(
            Literal::new("p", vec![v(&db, "X")]),
            vec![r.clone(), q.clone(), t.clone(), s.clone()],
        );
        let processed = preprocess(clause);
        assert_eq!(processed.body, vec![q, s, r, t]);
    }
}
