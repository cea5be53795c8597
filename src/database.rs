//! # The database
//!
//! A [`Database`] owns the intensional store (clauses and registered
//! external relations), the shared result cache with its invalidation
//! index, and the symbol table. The three live behind separate locks so one
//! writer and many concurrent readers can proceed: a query snapshots
//! matching clauses under the clause lock, consults the cache under the
//! cache lock, and promotes its outputs in one short critical section at the
//! end. Promotion is winner-writes-all per subgoal fingerprint, so at most
//! one query populates any given cache entry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::checks::{check_clause, preprocess, CheckError};
use crate::env::{freshen_clause, Env};
use crate::external::{membership_relation, ExternalRelation};
use crate::fingerprint::Fingerprint;
use crate::intern::{GroundSet, Interner, SymbolTable};
use crate::search::Goal;
use crate::term::{Clause, Literal, Term, TermSpec};

/// One derived answer for a query or subgoal.
///
/// Successful results carry a fully ground literal, the environment that
/// produced it, a proof step, and the set of witness literals whose change
/// would invalidate it. Failure results only carry invalidators; they exist
/// to drive negation as failure and never surface to callers.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub(crate) failure: bool,
    pub(crate) env: Env,
    /// The derived fact; ground whenever `failure` is false.
    pub literal: Literal,
    pub(crate) proof: Option<Proof>,
    pub(crate) invalidators: HashMap<Fingerprint, Literal>,
}

impl QueryResult {
    pub(crate) fn failed(invalidators: HashMap<Fingerprint, Literal>) -> QueryResult {
        QueryResult {
            failure: true,
            env: Env::new(),
            literal: Literal::default(),
            proof: None,
            invalidators,
        }
    }
}

/// One step of a derivation: which clause produced a literal and under which
/// substitutions. A missing clause fingerprint marks a tuple that came from
/// an external relation.
#[derive(Debug, Clone)]
pub struct Proof {
    pub(crate) success: bool,
    pub(crate) clause: Option<Fingerprint>,
    pub(crate) substitutions: Env,
}

/// What to do with a parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Store the clause.
    Assert,
    /// Evaluate the head literal and return its result bag.
    Query,
    /// Parsed but unsupported; applying reports an error.
    Retract,
}

/// A single instruction against a database, as produced by the parser or
/// the programmatic constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub head: Literal,
    pub body: Vec<Literal>,
    pub kind: CommandKind,
}

impl Command {
    /// Assert a fact.
    pub fn assert(head: Literal) -> Command {
        Command {
            head,
            body: vec![],
            kind: CommandKind::Assert,
        }
    }

    /// Assert a rule.
    pub fn rule(head: Literal, body: Vec<Literal>) -> Command {
        Command {
            head,
            body,
            kind: CommandKind::Assert,
        }
    }

    /// Query for all derivations of a literal.
    pub fn query(head: Literal) -> Command {
        Command {
            head,
            body: vec![],
            kind: CommandKind::Query,
        }
    }
}

/// Errors surfaced by [`Database::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error("retraction is not supported")]
    UnsupportedRetract,
    #[error("cannot query a negated literal; negation is only meaningful inside rule bodies")]
    NegatedQuery,
}

/// The intensional store: clauses keyed by their handle fingerprint plus the
/// registered external relations.
#[derive(Debug, Default)]
pub(crate) struct ClauseStore {
    pub(crate) clauses: HashMap<Fingerprint, Clause>,
    pub(crate) relations: Vec<Arc<ExternalRelation>>,
}

/// A witness literal and the cached subgoals whose results depend on it.
#[derive(Debug, Clone)]
pub(crate) struct Invalidation {
    pub(crate) witness: Literal,
    pub(crate) dependents: Vec<Fingerprint>,
}

/// The shared memoization state.
#[derive(Debug, Default)]
pub(crate) struct ResultCache {
    /// Subgoal fingerprint to promoted results. An empty list memoizes
    /// failure.
    pub(crate) results: HashMap<Fingerprint, Vec<QueryResult>>,
    /// Result-literal fingerprint to recorded proof steps.
    pub(crate) proofs: HashMap<Fingerprint, Vec<Proof>>,
    /// Witness fingerprint to dependent subgoals.
    pub(crate) invalidations: HashMap<Fingerprint, Invalidation>,
}

/// An in-memory deductive database with memoized query evaluation.
///
/// See the crate docs for a usage example.
#[derive(Debug)]
pub struct Database {
    pub(crate) clauses: RwLock<ClauseStore>,
    pub(crate) cache: RwLock<ResultCache>,
    pub(crate) symbols: RwLock<SymbolTable>,
}

impl Default for Database {
    fn default() -> Self {
        Database::new()
    }
}

impl Database {
    /// An empty database with the `in/2` membership built-in registered.
    pub fn new() -> Database {
        let db = Database {
            clauses: RwLock::new(ClauseStore::default()),
            cache: RwLock::new(ResultCache::default()),
            symbols: RwLock::new(SymbolTable::default()),
        };
        db.add_external_relations([membership_relation()]);
        db
    }

    /// Register external relations. Relations registered after a predicate
    /// has been cached only apply once the cache entries are invalidated.
    pub fn add_external_relations(
        &self,
        relations: impl IntoIterator<Item = ExternalRelation>,
    ) {
        let mut store = self.clauses.write().expect("lock poisoned");
        store.relations.extend(relations.into_iter().map(Arc::new));
    }

    /// Apply one command: static-check and store an assertion, or evaluate a
    /// query. Asserts return an empty result list.
    pub fn apply(&self, command: Command) -> Result<Vec<QueryResult>, ApplyError> {
        match command.kind {
            CommandKind::Assert => {
                let clause = Clause::new(command.head, command.body);
                check_clause(self, &clause)?;
                self.assert_clause(preprocess(clause));
                Ok(vec![])
            }
            CommandKind::Query => {
                if command.head.negated {
                    return Err(ApplyError::NegatedQuery);
                }
                Ok(self.ask(command.head))
            }
            CommandKind::Retract => Err(ApplyError::UnsupportedRetract),
        }
    }

    /// Store a checked, preprocessed clause. Idempotent: the handle
    /// fingerprint is computed before freshening, so re-asserting an
    /// identical clause is a no-op.
    pub(crate) fn assert_clause(&self, clause: Clause) {
        let id = clause.fingerprint();
        let mut store = self.clauses.write().expect("lock poisoned");
        if store.clauses.contains_key(&id) {
            return;
        }
        let fresh = {
            let mut symbols = self.symbols.write().expect("lock poisoned");
            freshen_clause(&clause, &mut symbols.fresh_var).0
        };
        store.clauses.insert(id, fresh);
    }

    /// Evaluate a query literal and return its result bag. The order of the
    /// returned results is unspecified.
    ///
    /// # Panics
    ///
    /// Panics on a negated query literal; [`Database::apply`] rejects those
    /// with an error instead.
    pub fn ask(&self, query: Literal) -> Vec<QueryResult> {
        let mut goal = Goal::new(self);
        let top = goal.solve(query);
        self.promote(&goal);
        goal.subgoals[&top].results.values().cloned().collect()
    }

    /// Promote a finished query's subgoal outputs into the shared cache.
    fn promote(&self, goal: &Goal<'_>) {
        let mut cache = self.cache.write().expect("lock poisoned");
        for (id, sg) in &goal.subgoals {
            if cache.results.contains_key(id) {
                // Another query got here first; its entry stands.
                continue;
            }
            let results: Vec<QueryResult> = sg.results.values().cloned().collect();
            for r in &results {
                if let Some(p) = &r.proof {
                    cache
                        .proofs
                        .entry(r.literal.fingerprint())
                        .or_default()
                        .push(p.clone());
                }
            }
            cache.results.insert(*id, results);
            for (fp, witness) in &sg.invalidators {
                cache
                    .invalidations
                    .entry(*fp)
                    .or_insert_with(|| Invalidation {
                        witness: witness.clone(),
                        dependents: Vec::new(),
                    })
                    .dependents
                    .push(*id);
            }
        }
    }

    /// Build a literal from a predicate name and term specs, interning as
    /// needed. See [`var`](crate::term::var) and [`atom`](crate::term::atom).
    pub fn literal(
        &self,
        predicate: impl Into<String>,
        terms: impl IntoIterator<Item = TermSpec>,
    ) -> Literal {
        let terms = terms
            .into_iter()
            .map(|spec| {
                let id = Interner::intern(self, &spec.text);
                if spec.is_var {
                    Term::Variable(id)
                } else {
                    Term::Constant(id)
                }
            })
            .collect();
        Literal::new(predicate, terms)
    }

    /// Build an `in/2` membership literal over a freshly stored ground set.
    ///
    /// # Panics
    ///
    /// Panics when a member spec is a variable; sets are ground by
    /// construction.
    pub fn in_set(
        &self,
        item: TermSpec,
        members: impl IntoIterator<Item = TermSpec>,
    ) -> Literal {
        let ids: Vec<i64> = members
            .into_iter()
            .map(|m| {
                assert!(!m.is_var, "ground sets only contain constants, got variable {}", m.text);
                Interner::intern(self, &m.text)
            })
            .collect();
        let set = Interner::store_set(self, ids);
        let item = {
            let id = Interner::intern(self, &item.text);
            if item.is_var {
                Term::Variable(id)
            } else {
                Term::Constant(id)
            }
        };
        Literal::new("in", vec![item, Term::Constant(set)])
    }

    #[cfg(test)]
    pub(crate) fn cached_results_len(&self) -> usize {
        self.cache.read().expect("lock poisoned").results.len()
    }

    #[cfg(test)]
    pub(crate) fn invalidations_len(&self) -> usize {
        self.cache.read().expect("lock poisoned").invalidations.len()
    }
}

impl Interner for Database {
    fn intern(&self, name: &str) -> i64 {
        self.symbols.write().expect("lock poisoned").intern(name)
    }

    fn lookup(&self, id: i64) -> String {
        match self.symbols.read().expect("lock poisoned").lookup(id) {
            Some(name) => name.to_owned(),
            None => format!("Unknown:{}", id),
        }
    }

    fn store_set(&self, items: Vec<i64>) -> i64 {
        self.symbols
            .write()
            .expect("lock poisoned")
            .store_set(GroundSet::new(items))
    }

    fn get_set(&self, id: i64) -> GroundSet {
        self.symbols
            .read()
            .expect("lock poisoned")
            .get_set(id)
            .unwrap_or_else(|| panic!("ground set {} not found; handles only come from store_set", id))
            .clone()
    }
}
