//! # Binding environments
//!
//! An [`Env`] is an append-only association from variable ids to terms. All
//! unification in the engine goes through [`Env::bind`], which enforces two
//! invariants: a variable is never bound to itself, and a variable is never
//! re-bound to a different term (re-binding to an equal term is a no-op).
//! Together they keep the binding graph acyclic, so [`Env::chase`] always
//! terminates.
//!
//! The first few bindings live inline; environments this engine builds are
//! almost always tiny, so the inline prefix keeps the hot path off the heap.
//! This is a performance hint, not a correctness contract.

use smallvec::SmallVec;

use crate::term::{Clause, Literal, Term};

/// Number of bindings stored inline before spilling to the heap.
const INLINE_BINDINGS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    key: i64,
    value: Term,
}

/// An append-only variable binding map.
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: SmallVec<[Binding; INLINE_BINDINGS]>,
}

impl Env {
    pub fn new() -> Env {
        Env::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over the bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, Term)> + '_ {
        self.bindings.iter().map(|b| (b.key, b.value))
    }

    fn get(&self, key: i64) -> Option<Term> {
        self.bindings.iter().find(|b| b.key == key).map(|b| b.value)
    }

    /// Bind a variable to a term.
    ///
    /// # Panics
    ///
    /// Panics on self-binding and on re-binding to a different term. Neither
    /// can happen on well-formed input.
    pub fn bind(&mut self, key: i64, value: Term) {
        if let Term::Variable(v) = value {
            if v == key {
                panic!("binding variable v{} to itself", key);
            }
        }
        if let Some(existing) = self.get(key) {
            if existing != value {
                panic!(
                    "cannot rebind variable v{}: old {} new {}",
                    key, existing, value
                );
            }
            return;
        }
        self.bindings.push(Binding { key, value });
    }

    /// Resolve a term through the environment: constants are returned as-is,
    /// variables are followed until a constant or an unbound variable is
    /// reached. Idempotent: `chase(chase(t)) == chase(t)`.
    pub fn chase(&self, term: Term) -> Term {
        let mut t = term;
        loop {
            match t {
                Term::Constant(_) => return t,
                Term::Variable(v) => match self.get(v) {
                    Some(next) => t = next,
                    None => return t,
                },
            }
        }
    }

    /// A copy of `literal` with every term replaced by its chase.
    pub fn rewrite(&self, literal: &Literal) -> Literal {
        Literal {
            predicate: literal.predicate.clone(),
            negated: literal.negated,
            terms: literal.terms.iter().map(|&t| self.chase(t)).collect(),
        }
    }

    /// Rewrite a whole clause, head and body.
    pub fn rewrite_clause(&self, clause: &Clause) -> Clause {
        Clause {
            head: self.rewrite(&clause.head),
            body: clause.body.iter().map(|l| self.rewrite(l)).collect(),
        }
    }

    /// A copy of this environment with every value chased through `chaser`.
    pub fn rewritten_through(&self, chaser: &Env) -> Env {
        Env {
            bindings: self
                .bindings
                .iter()
                .map(|b| Binding {
                    key: b.key,
                    value: chaser.chase(b.value),
                })
                .collect(),
        }
    }

    /// Merge two environments: every value of `self` is chased through
    /// `child`, then `child`'s own bindings are unioned in.
    pub fn merge_rewriting(&self, child: &Env) -> Env {
        let mut merged = self.rewritten_through(child);
        for (k, v) in child.iter() {
            merged.bind(k, v);
        }
        merged
    }
}

/// Unify a single pair of already-chased, unequal terms into `env`.
fn unify_term(a: Term, b: Term, env: &mut Env) -> bool {
    match (a, b) {
        (Term::Constant(_), Term::Constant(_)) => false,
        (Term::Variable(v), Term::Constant(_)) => {
            env.bind(v, b);
            true
        }
        (_, Term::Variable(v)) => {
            env.bind(v, a);
            true
        }
    }
}

/// Unify two literals, accumulating bindings into `env`.
///
/// Requires equal predicate and arity; the negation flags are not compared.
/// Returns `false` (leaving `env` partially extended) when any position
/// resolves to two distinct constants.
pub fn unify(a: &Literal, b: &Literal, env: &mut Env) -> bool {
    if a.predicate != b.predicate || a.terms.len() != b.terms.len() {
        return false;
    }
    for (&at, &bt) in a.terms.iter().zip(&b.terms) {
        let at = env.chase(at);
        let bt = env.chase(bt);
        if at != bt && !unify_term(at, bt, env) {
            return false;
        }
    }
    true
}

/// Copy `literal`, renaming every variable into the fresh (negative) id
/// range. Variables already renamed in `env` are reused, so repeated
/// occurrences stay consistent across one freshening pass.
pub fn freshen(literal: &Literal, counter: &mut i64, env: &mut Env) -> Literal {
    let terms = literal
        .terms
        .iter()
        .map(|&t| match t {
            Term::Constant(_) => t,
            Term::Variable(v) => {
                let chased = env.chase(t);
                if chased != t {
                    chased
                } else {
                    *counter -= 1;
                    let fresh = Term::Variable(*counter);
                    env.bind(v, fresh);
                    fresh
                }
            }
        })
        .collect();
    Literal {
        predicate: literal.predicate.clone(),
        negated: literal.negated,
        terms,
    }
}

/// Freshen a whole clause with one shared renaming, so a variable used in
/// both head and body maps to the same fresh id.
pub fn freshen_clause(clause: &Clause, counter: &mut i64) -> (Clause, Env) {
    let mut env = Env::new();
    let head = freshen(&clause.head, counter, &mut env);
    let body = clause
        .body
        .iter()
        .map(|l| freshen(l, counter, &mut env))
        .collect();
    (Clause { head, body }, env)
}
