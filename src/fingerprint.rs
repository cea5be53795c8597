//! # Structural fingerprints
//!
//! Canonical 128-bit identities for literals, clauses and chains. The engine
//! never compares these structures directly; fingerprints are the equality
//! test for subgoals and chains, and the keys of the shared result cache.
//!
//! Two different encodings are in play:
//!
//! - the *literal* fingerprint renumbers variables to their first-occurrence
//!   index, so alpha-equivalent literals collide. It is the subgoal key and
//!   the invalidation key;
//! - the *clause* fingerprint hashes terms by value, so clauses differing
//!   only in variable names get different fingerprints. It is used purely as
//!   a keyed handle for stored clauses.
//!
//! The 128 bits come from two independently seeded [`ahash`] hashers fed the
//! same byte stream.

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hasher};

use ahash::RandomState;

use crate::env::Env;
use crate::term::{Clause, Literal, Term};

/// A 128-bit structural hash used as canonical identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(u128);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Two seeded 64-bit hashers fed in lockstep.
struct Tagger {
    lo: ahash::AHasher,
    hi: ahash::AHasher,
}

impl Tagger {
    fn new() -> Tagger {
        // Fixed seeds keep fingerprints stable within a process and across
        // processes; these are identity keys, not DoS-hardened hashes.
        Tagger {
            lo: RandomState::with_seeds(
                0x9e37_79b9_7f4a_7c15,
                0xf39c_c060_5ced_c834,
                0x1082_276b_f3a2_7251,
                0x8684_8784_0000_0000,
            )
            .build_hasher(),
            hi: RandomState::with_seeds(
                0x2545_f491_4f6c_dd1d,
                0x9e6c_63d0_876a_46ad,
                0x27d4_eb2f_1656_67c5,
                0x1657_6677_0000_0000,
            )
            .build_hasher(),
        }
    }

    fn write_u8(&mut self, v: u8) {
        self.lo.write_u8(v);
        self.hi.write_u8(v);
    }

    fn write_i64(&mut self, v: i64) {
        self.lo.write_i64(v);
        self.hi.write_i64(v);
    }

    fn write_u128(&mut self, v: u128) {
        self.lo.write_u128(v);
        self.hi.write_u128(v);
    }

    fn write_str(&mut self, s: &str) {
        self.lo.write_usize(s.len());
        self.hi.write_usize(s.len());
        self.lo.write(s.as_bytes());
        self.hi.write(s.as_bytes());
    }

    fn write_term(&mut self, t: Term) {
        match t {
            Term::Constant(v) => {
                self.write_u8(0);
                self.write_i64(v);
            }
            Term::Variable(v) => {
                self.write_u8(1);
                self.write_i64(v);
            }
        }
    }

    fn finish(self) -> Fingerprint {
        Fingerprint(((self.lo.finish() as u128) << 64) | self.hi.finish() as u128)
    }
}

/// Write `literals` with variables renumbered by first occurrence. The
/// renaming map is shared across the slice, so a variable reused between
/// body literals keeps one canonical id.
fn write_structural(tagger: &mut Tagger, literals: &[Literal], renaming: &mut HashMap<i64, i64>) {
    for l in literals {
        tagger.write_u8(l.negated as u8);
        tagger.write_str(&l.predicate);
        for &t in &l.terms {
            match t {
                Term::Constant(_) => tagger.write_term(t),
                Term::Variable(v) => {
                    let next = renaming.len() as i64;
                    let canonical = *renaming.entry(v).or_insert(next);
                    tagger.write_term(Term::Variable(canonical));
                }
            }
        }
    }
}

/// Write an environment canonically: keys sorted, values chased.
fn write_env(tagger: &mut Tagger, env: &Env) {
    let mut keys: Vec<i64> = env.iter().map(|(k, _)| k).collect();
    keys.sort_unstable();
    for k in keys {
        tagger.write_i64(k);
        tagger.write_term(env.chase(Term::Variable(k)));
    }
}

/// Alpha-canonical fingerprint of a literal; the subgoal key.
pub fn literal_fingerprint(literal: &Literal) -> Fingerprint {
    let mut tagger = Tagger::new();
    let mut renaming = HashMap::new();
    write_structural(&mut tagger, std::slice::from_ref(literal), &mut renaming);
    tagger.finish()
}

/// Value fingerprint of a clause. Variable renamings hash differently; this
/// is a handle, not a structural identity.
pub fn clause_fingerprint(clause: &Clause) -> Fingerprint {
    let mut tagger = Tagger::new();
    tagger.write_str(&clause.head.predicate);
    for &t in &clause.head.terms {
        tagger.write_term(t);
    }
    for l in &clause.body {
        tagger.write_u8(l.negated as u8);
        tagger.write_str(&l.predicate);
        tagger.write_i64(l.terms.len() as i64);
        for &t in &l.terms {
            tagger.write_term(t);
        }
    }
    tagger.finish()
}

/// Fingerprint of a chain: the parent clause handle, the canonicalized entry
/// environment and the alpha-canonical body remainder.
pub fn chain_fingerprint(clause: Fingerprint, body: &[Literal], env: &Env) -> Fingerprint {
    let mut tagger = Tagger::new();
    tagger.write_u128(clause.0);
    write_env(&mut tagger, env);
    let mut renaming = HashMap::new();
    write_structural(&mut tagger, body, &mut renaming);
    tagger.finish()
}

impl Literal {
    /// See [`literal_fingerprint`].
    pub fn fingerprint(&self) -> Fingerprint {
        literal_fingerprint(self)
    }
}

impl Clause {
    /// See [`clause_fingerprint`].
    pub fn fingerprint(&self) -> Fingerprint {
        clause_fingerprint(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lit(pred: &str, terms: Vec<Term>) -> Literal {
        Literal::new(pred, terms)
    }

    #[test]
    fn alpha_equivalent_literals_collide() {
        let a = lit("p", vec![Term::Variable(1), Term::Variable(2)]);
        let b = lit("p", vec![Term::Variable(-7), Term::Variable(40)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn repeated_variables_are_structural() {
        let a = lit("p", vec![Term::Variable(1), Term::Variable(1)]);
        let b = lit("p", vec![Term::Variable(1), Term::Variable(2)]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn negation_and_predicate_distinguish() {
        let a = lit("p", vec![Term::Variable(1)]);
        assert_ne!(a.fingerprint(), a.clone().negate().fingerprint());
        assert_ne!(
            a.fingerprint(),
            lit("q", vec![Term::Variable(1)]).fingerprint()
        );
    }

    #[test]
    fn constants_distinguish() {
        let a = lit("p", vec![Term::Constant(1)]);
        let b = lit("p", vec![Term::Constant(2)]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn clause_fingerprint_is_not_alpha_invariant() {
        let a = Clause::new(
            lit("p", vec![Term::Variable(1)]),
            vec![lit("q", vec![Term::Variable(1)])],
        );
        let b = Clause::new(
            lit("p", vec![Term::Variable(2)]),
            vec![lit("q", vec![Term::Variable(2)])],
        );
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
    }

    #[test]
    fn clause_fingerprint_sees_body_negation() {
        let pos = Clause::new(
            lit("p", vec![]),
            vec![lit("q", vec![Term::Variable(1)])],
        );
        let neg = Clause::new(
            lit("p", vec![]),
            vec![lit("q", vec![Term::Variable(1)]).negate()],
        );
        assert_ne!(pos.fingerprint(), neg.fingerprint());
    }

    #[test]
    fn chain_fingerprint_depends_on_environment() {
        let clause = Fingerprint(42);
        let body = vec![lit("q", vec![Term::Variable(1)])];
        let empty = Env::new();
        let mut bound = Env::new();
        bound.bind(1, Term::Constant(3));
        assert_ne!(
            chain_fingerprint(clause, &body, &empty),
            chain_fingerprint(clause, &body, &bound)
        );
        assert_eq!(
            chain_fingerprint(clause, &body, &empty),
            chain_fingerprint(clause, &body, &Env::new())
        );
    }

    #[test]
    fn shared_renaming_across_body_literals() {
        // q(X), r(X) and q(X), r(Y) must not collide.
        let shared = vec![
            lit("q", vec![Term::Variable(1)]),
            lit("r", vec![Term::Variable(1)]),
        ];
        let split = vec![
            lit("q", vec![Term::Variable(1)]),
            lit("r", vec![Term::Variable(2)]),
        ];
        let clause = Fingerprint(7);
        let env = Env::new();
        assert_ne!(
            chain_fingerprint(clause, &shared, &env),
            chain_fingerprint(clause, &split, &env)
        );
    }
}
