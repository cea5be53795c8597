//! # Derivation reconstruction
//!
//! Every promoted result records which clause produced it and under which
//! substitutions. [`Database::proof_string`] walks those records
//! breadth-first and prints one instantiated clause per derived literal.
//! Only the first recorded proof of each literal is used; alternative
//! derivations are not enumerated.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::database::{CommandKind, Database, Proof};
use crate::term::Literal;

/// Failure to reconstruct a derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    #[error("no proof recorded for {0}; it was never derived by a query")]
    Missing(String),
}

impl Database {
    /// The recorded proofs for a literal that was derived by an earlier
    /// query (asked directly, or returned as a result).
    pub fn proof_of(&self, literal: &Literal) -> Option<Vec<Proof>> {
        self.cache
            .read()
            .expect("lock poisoned")
            .proofs
            .get(&literal.fingerprint())
            .cloned()
    }

    /// Render a readable derivation of `literal`.
    ///
    /// External tuples print as `l. % From idb`. Negated body literals hold
    /// by absence and contribute no further steps.
    pub fn proof_string(&self, literal: &Literal) -> Result<String, ProofError> {
        let mut out = String::new();
        let mut explained: HashSet<_> = HashSet::new();
        let mut queue = VecDeque::from([literal.clone()]);

        while let Some(l) = queue.pop_front() {
            if !explained.insert(l.fingerprint()) {
                continue;
            }

            let proofs = self
                .proof_of(&l)
                .ok_or_else(|| ProofError::Missing(self.literal_string(&l)))?;
            let proof = proofs
                .first()
                .ok_or_else(|| ProofError::Missing(self.literal_string(&l)))?;

            match proof.clause {
                None => {
                    // The tuple came from an external relation; there is no
                    // clause to instantiate.
                    out.push_str(&self.literal_string(&l));
                    out.push_str(". % From idb\n");
                }
                Some(clause_id) => {
                    let clause = {
                        let store = self.clauses.read().expect("lock poisoned");
                        store
                            .clauses
                            .get(&clause_id)
                            .expect("proof references a stored clause")
                            .clone()
                    };
                    let substituted = proof.substitutions.rewrite_clause(&clause);
                    out.push_str(&self.clause_string(&substituted, CommandKind::Assert));
                    queue.extend(substituted.body.iter().filter(|b| !b.negated).cloned());
                }
            }
        }
        Ok(out)
    }
}
