//! # The resolution engine
//!
//! A query expands into a bipartite graph of *subgoals* (disjunctive nodes,
//! one per distinct literal pattern) and *chains* (conjunctive nodes, one
//! per partially-solved rule body). Nodes are hash-consed on their
//! structural fingerprint, so each distinct pattern exists at most once per
//! query; that bound, together with range restriction and per-result
//! fingerprints that short-circuit re-propagation, is what makes cyclic rule
//! sets terminate.
//!
//! Results stream upwards through *dependents*: back-edges carrying the
//! variable translation from a producer's scope into a consumer's. When an
//! existing node is re-entered with a new dependent, its accumulated results
//! are replayed into that dependent (and recursively into every descendant
//! chain), which is what keeps memoization correct under mutual recursion.
//!
//! The graph is private to one query. Surviving results and their
//! invalidator sets are promoted into the shared database cache when the
//! query completes (see [`Database::ask`]).

use std::collections::HashMap;

use log::trace;

use crate::database::{Database, Proof, QueryResult};
use crate::env::{freshen, unify, Env};
use crate::external::ExternalRelation;
use crate::fingerprint::{chain_fingerprint, Fingerprint};
use crate::term::{Literal, Term};

#[cfg(test)]
mod test;

/// A back-edge from a producer node to a consumer node.
///
/// The mapping translates the consumer's variables into terms of the
/// producer's scope; replaying a result chases the mapped terms through the
/// result's environment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Dependent {
    receiver: Fingerprint,
    mapping: HashMap<i64, Term>,
}

impl Dependent {
    fn rewritten(&self, chaser: &Env) -> Dependent {
        Dependent {
            receiver: self.receiver,
            mapping: self
                .mapping
                .iter()
                .map(|(&k, &v)| (k, chaser.chase(v)))
                .collect(),
        }
    }
}

/// A chain result together with the successor chain it spawned, if any.
#[derive(Debug, Clone)]
struct ResultNext {
    result: QueryResult,
    next: Option<Fingerprint>,
}

/// A literal the query is trying to prove; always in positive form.
pub(crate) struct Subgoal {
    pub(crate) literal: Literal,
    /// Results accumulate monotonically, keyed by the result literal's
    /// fingerprint.
    pub(crate) results: HashMap<Fingerprint, QueryResult>,
    dependents: Vec<Dependent>,
    /// Literals whose change would invalidate everything derived here.
    pub(crate) invalidators: HashMap<Fingerprint, Literal>,
}

/// A partially-solved rule body: the parent clause, the remaining literals
/// and the bindings accumulated so far.
struct Chain {
    clause: Fingerprint,
    body: Vec<Literal>,
    env: Env,
    results: HashMap<Fingerprint, ResultNext>,
    dependents: Vec<Dependent>,
    invalidators: HashMap<Fingerprint, Literal>,
}

/// The per-query evaluation context. Owns the subgoal/chain graph and a
/// local freshening counter seeded from the database's.
pub(crate) struct Goal<'db> {
    db: &'db Database,
    var_count: i64,
    pub(crate) subgoals: HashMap<Fingerprint, Subgoal>,
    chains: HashMap<Fingerprint, Chain>,
}

struct FactMatch {
    clause: Fingerprint,
    env: Env,
}

struct RuleMatch {
    clause: Fingerprint,
    body: Vec<Literal>,
    env: Env,
    fresh_env: Env,
}

/// Rebuild a cached result's environment against the local subgoal literal.
///
/// Stored environments are keyed by the promoting query's fresh variable
/// ids, which this query does not share; re-unifying the stored ground
/// literal against the local literal yields the same bindings in local ids.
fn rehydrate(literal: &Literal, stored: QueryResult) -> QueryResult {
    if stored.failure {
        return stored;
    }
    let mut env = Env::new();
    let ok = unify(literal, &stored.literal, &mut env);
    assert!(
        ok,
        "cached result {} does not unify with subgoal {}",
        stored.literal, literal
    );
    QueryResult { env, ..stored }
}

impl<'db> Goal<'db> {
    pub(crate) fn new(db: &'db Database) -> Goal<'db> {
        let var_count = db.symbols.read().expect("lock poisoned").fresh_var;
        Goal {
            db,
            var_count,
            subgoals: HashMap::new(),
            chains: HashMap::new(),
        }
    }

    /// Install the query as a top-level subgoal and derive it to fixpoint.
    /// Returns the top subgoal's id.
    pub(crate) fn solve(&mut self, query: Literal) -> Fingerprint {
        let (top, _) = self.put_subgoal(query, &Env::new(), vec![]);
        self.visit_subgoal(top);
        top
    }

    fn subgoal(&self, id: Fingerprint) -> &Subgoal {
        self.subgoals.get(&id).expect("subgoal id must resolve")
    }

    fn chain(&self, id: Fingerprint) -> &Chain {
        self.chains.get(&id).expect("chain id must resolve")
    }

    /// Hash-cons a subgoal for `literal`. On a hit, the incoming dependents'
    /// mappings are translated into the existing node's variable names and
    /// its accumulated results replayed into them.
    fn put_subgoal(
        &mut self,
        literal: Literal,
        env: &Env,
        dependents: Vec<Dependent>,
    ) -> (Fingerprint, bool) {
        let literal = env.rewrite(&literal);
        let id = literal.fingerprint();

        if let Some(sg) = self.subgoals.get(&id) {
            let mut matcher = Env::new();
            let ok = unify(&sg.literal, &literal, &mut matcher);
            assert!(ok, "alpha-equivalent subgoals must unify");
            let translated: Vec<Dependent> = dependents
                .iter()
                .map(|d| d.rewritten(&matcher))
                .collect();
            self.add_dependents_to_subgoal(id, translated);
            (id, false)
        } else {
            self.subgoals.insert(
                id,
                Subgoal {
                    literal,
                    results: HashMap::new(),
                    dependents,
                    invalidators: HashMap::new(),
                },
            );
            (id, true)
        }
    }

    /// Hash-cons a chain over `body` under `env`. On a hit, dependents are
    /// translated into the existing body's variable names and replayed;
    /// invalidators are unioned.
    fn add_chain(
        &mut self,
        clause: Fingerprint,
        env: Env,
        body: &[Literal],
        dependents: Vec<Dependent>,
        mut invalidators: HashMap<Fingerprint, Literal>,
    ) -> (Fingerprint, bool) {
        let new_body: Vec<Literal> = body.iter().map(|l| env.rewrite(l)).collect();
        let id = chain_fingerprint(clause, &new_body, &env);

        if self.chains.contains_key(&id) {
            let existing_body = self.chain(id).body.clone();
            let mut matcher = Env::new();
            for (old, new) in existing_body.iter().zip(&new_body) {
                let ok = unify(old, new, &mut matcher);
                assert!(ok, "chains with equal fingerprints must have unifiable bodies");
            }
            let translated: Vec<Dependent> = dependents
                .iter()
                .map(|d| d.rewritten(&matcher))
                .collect();
            self.chains
                .get_mut(&id)
                .expect("chain id must resolve")
                .invalidators
                .extend(invalidators);
            self.add_dependents_to_chain(id, translated);
            (id, false)
        } else {
            // The lead literal invalidates this chain; store its positive
            // form, matching the subgoal it will be proven through.
            let lead = new_body[0].positive();
            invalidators.insert(lead.fingerprint(), lead);
            self.chains.insert(
                id,
                Chain {
                    clause,
                    body: new_body,
                    env,
                    results: HashMap::new(),
                    dependents,
                    invalidators,
                },
            );
            (id, true)
        }
    }

    fn add_dependents_to_subgoal(&mut self, id: Fingerprint, dependents: Vec<Dependent>) {
        for d in dependents {
            if self.subgoal(id).dependents.contains(&d) {
                continue;
            }
            self.subgoals
                .get_mut(&id)
                .expect("subgoal id must resolve")
                .dependents
                .push(d.clone());
            // Replay what this node already produced into the late arrival.
            let results: Vec<QueryResult> = self.subgoal(id).results.values().cloned().collect();
            for r in results {
                let induced = self.result_for_dependent_chain(id, &r, &d);
                self.merge_result_into_chain(d.receiver, induced);
            }
        }
    }

    fn add_dependents_to_chain(&mut self, id: Fingerprint, dependents: Vec<Dependent>) {
        for d in dependents {
            if self.chain(id).dependents.contains(&d) {
                continue;
            }
            self.chains
                .get_mut(&id)
                .expect("chain id must resolve")
                .dependents
                .push(d.clone());
            let entries: Vec<ResultNext> = self.chain(id).results.values().cloned().collect();
            for rn in entries {
                let replayed = d.rewritten(&rn.result.env);
                match rn.next {
                    None => {
                        let induced = self.result_for_dependent_subgoal(id, &rn.result, &replayed);
                        self.merge_result_into_subgoal(replayed.receiver, induced);
                    }
                    Some(next) => self.add_dependents_to_chain(next, vec![replayed]),
                }
            }
        }
    }

    /// Translate a subgoal result into the scope of a dependent chain.
    fn result_for_dependent_chain(
        &self,
        subgoal_id: Fingerprint,
        r: &QueryResult,
        d: &Dependent,
    ) -> QueryResult {
        let subgoal = self.subgoal(subgoal_id);
        let chain = self.chain(d.receiver);

        let mut env = Env::new();
        for (&k, &v) in &d.mapping {
            env.bind(k, r.env.chase(v));
        }
        let literal = env.rewrite(&chain.body[0]);
        assert!(
            literal.is_ground(),
            "generated a non-ground result {} for chain lead {}",
            literal,
            chain.body[0]
        );

        let mut invalidators = HashMap::new();
        invalidators.insert(subgoal.literal.fingerprint(), subgoal.literal.clone());
        QueryResult {
            failure: false,
            env,
            literal,
            proof: None,
            invalidators,
        }
    }

    /// Translate a chain's final result into the scope of a dependent
    /// subgoal, resolving polarity against the chain's lead literal.
    fn result_for_dependent_subgoal(
        &self,
        chain_id: Fingerprint,
        r: &QueryResult,
        d: &Dependent,
    ) -> QueryResult {
        let chain = self.chain(chain_id);

        let mut invalidators = chain.invalidators.clone();
        for (k, v) in &r.invalidators {
            invalidators.insert(*k, v.clone());
        }

        let failure = (r.failure && !chain.body[0].negated)
            || (!r.failure && chain.body[0].negated);
        if failure {
            return QueryResult::failed(invalidators);
        }

        let subgoal = self.subgoal(d.receiver);
        let mut env = Env::new();
        for (&k, &v) in &d.mapping {
            env.bind(k, r.env.chase(v));
        }
        let literal = env.rewrite(&subgoal.literal);
        assert!(
            literal.is_ground(),
            "generated a non-ground result {} for subgoal {}",
            literal,
            subgoal.literal
        );

        QueryResult {
            failure: false,
            env,
            literal,
            proof: Some(Proof {
                success: true,
                clause: Some(chain.clause),
                substitutions: r.env.clone(),
            }),
            invalidators,
        }
    }

    fn merge_result_into_chain(&mut self, id: Fingerprint, mut r: QueryResult) {
        let (lead_negated, body_len, clause, dependents, new_env) = {
            let c = self.chain(id);
            let new_env = c.env.merge_rewriting(&r.env);
            (
                c.body[0].negated,
                c.body.len(),
                c.clause,
                c.dependents.clone(),
                new_env,
            )
        };

        if body_len == 1 {
            // Last literal just solved; hand the finished result upwards.
            r.env = new_env;
            let key = r.literal.fingerprint();
            self.chains
                .get_mut(&id)
                .expect("chain id must resolve")
                .results
                .insert(key, ResultNext { result: r.clone(), next: None });
            for d in &dependents {
                let induced = self.result_for_dependent_subgoal(id, &r, d);
                self.merge_result_into_subgoal(d.receiver, induced);
            }
            return;
        }

        let polarity_ok = (!lead_negated && !r.failure) || (lead_negated && r.failure);
        if polarity_ok {
            let translated: Vec<Dependent> =
                dependents.iter().map(|d| d.rewritten(&r.env)).collect();
            let (rest, invalidators) = {
                let c = self.chain(id);
                (c.body[1..].to_vec(), c.invalidators.clone())
            };
            let (next, is_new) = self.add_chain(clause, new_env, &rest, translated, invalidators);
            self.chains
                .get_mut(&id)
                .expect("chain id must resolve")
                .results
                .insert(
                    r.literal.fingerprint(),
                    ResultNext { result: r, next: Some(next) },
                );
            if is_new {
                self.visit_chain(next);
            }
        } else {
            // A required literal failed; the dependents decide for
            // themselves, so the invalidators still travel.
            for d in &dependents {
                self.merge_result_into_subgoal(
                    d.receiver,
                    QueryResult::failed(r.invalidators.clone()),
                );
            }
        }
    }

    fn merge_result_into_subgoal(&mut self, id: Fingerprint, r: QueryResult) {
        trace!("merging {} into {}", r.literal, self.subgoal(id).literal);
        {
            let sg = self.subgoals.get_mut(&id).expect("subgoal id must resolve");
            for (k, v) in &r.invalidators {
                sg.invalidators.insert(*k, v.clone());
            }
            if r.failure {
                return;
            }
            let key = r.literal.fingerprint();
            if sg.results.contains_key(&key) {
                return;
            }
            sg.results.insert(key, r.clone());
        }
        let dependents = self.subgoal(id).dependents.clone();
        for d in &dependents {
            let induced = self.result_for_dependent_chain(id, &r, d);
            self.merge_result_into_chain(d.receiver, induced);
        }
    }

    fn visit_chain(&mut self, id: Fingerprint) {
        let lead = self.chain(id).body[0].clone();

        // The lead's variables map to themselves; the mapping is built
        // directly because an environment would reject self-bindings.
        let mut mapping = HashMap::new();
        for &t in &lead.terms {
            if let Term::Variable(v) = t {
                mapping.insert(v, t);
            }
        }

        let (sub_id, is_new) = self.put_subgoal(
            lead.positive(),
            &Env::new(),
            vec![Dependent { receiver: id, mapping }],
        );
        if is_new {
            self.visit_subgoal(sub_id);
        }

        // No success accumulated: synthesize a failure so a negated lead
        // can succeed and invalidators propagate along failing paths.
        let has_success = self.chain(id).results.values().any(|rn| !rn.result.failure);
        if !has_success {
            self.merge_result_into_chain(id, QueryResult::failed(HashMap::new()));
        }
    }

    fn visit_subgoal(&mut self, id: Fingerprint) {
        let db = self.db;
        let literal = self.subgoal(id).literal.clone();
        trace!("visiting {}", literal);
        assert!(
            !literal.negated,
            "visiting negated subgoal {}; all subgoals are kept in positive form",
            literal
        );

        // The shared cache answers first. An entry may be an empty list,
        // which memoizes failure.
        let cached = {
            let cache = db.cache.read().expect("lock poisoned");
            cache.results.get(&id).cloned()
        };
        if let Some(results) = cached {
            trace!("cache hit for {}", literal);
            for stored in results {
                let r = rehydrate(&literal, stored);
                self.merge_result_into_subgoal(id, r);
            }
            return;
        }

        // External relations whose head template unifies with the call.
        let matching: Vec<std::sync::Arc<ExternalRelation>> = {
            let store = db.clauses.read().expect("lock poisoned");
            store
                .relations
                .iter()
                .filter(|rel| {
                    let mut m = Env::new();
                    unify(&literal, &rel.head, &mut m)
                })
                .cloned()
                .collect()
        };
        for rel in &matching {
            trace!("matched external relation {}", rel.head);
            self.run_external(id, rel);
        }

        // Snapshot matching facts and rules under the read lock, then
        // release it before deriving further.
        let mut facts: Vec<FactMatch> = Vec::new();
        let mut rules: Vec<RuleMatch> = Vec::new();
        {
            let store = db.clauses.read().expect("lock poisoned");
            for (&cid, c) in &store.clauses {
                if c.body.is_empty() {
                    let mut m = Env::new();
                    if unify(&literal, &c.head, &mut m) {
                        facts.push(FactMatch { clause: cid, env: m });
                    }
                    continue;
                }
                // Freshen the call so a clause can be entered twice in one
                // derivation without its variables colliding.
                let mut fresh_env = Env::new();
                let fresh = freshen(&literal, &mut self.var_count, &mut fresh_env);
                let mut m = Env::new();
                if unify(&fresh, &c.head, &mut m) {
                    // Bindings made against the head also reach the
                    // dependent mapping.
                    let fresh_env = fresh_env.rewritten_through(&m);
                    rules.push(RuleMatch {
                        clause: cid,
                        body: c.body.clone(),
                        env: m,
                        fresh_env,
                    });
                }
            }
        }

        for f in facts {
            let r = QueryResult {
                failure: false,
                literal: f.env.rewrite(&literal),
                proof: Some(Proof {
                    success: true,
                    clause: Some(f.clause),
                    substitutions: f.env.clone(),
                }),
                env: f.env,
                invalidators: HashMap::new(),
            };
            self.merge_result_into_subgoal(id, r);
        }

        for rule in rules {
            let mapping: HashMap<i64, Term> = rule.fresh_env.iter().collect();
            let (chain_id, is_new) = self.add_chain(
                rule.clause,
                rule.env,
                &rule.body,
                vec![Dependent { receiver: id, mapping }],
                HashMap::new(),
            );
            if is_new {
                self.visit_chain(chain_id);
            }
        }
    }

    fn run_external(&mut self, id: Fingerprint, rel: &ExternalRelation) {
        let literal = self.subgoal(id).literal.clone();
        let tuples = match (rel.run)(self.db, &literal.terms) {
            Ok(tuples) => tuples,
            Err(err) => panic!(
                "external relation {} failed while deriving {}: {}",
                rel.head.predicate, literal, err
            ),
        };
        for tuple in tuples {
            let derived = Literal::new(literal.predicate.clone(), tuple);
            // Re-unifying against the call builds the environment and weeds
            // out tuples that conflict with repeated variables.
            let mut env = Env::new();
            if unify(&derived, &literal, &mut env) {
                let r = QueryResult {
                    failure: false,
                    env,
                    literal: derived,
                    proof: Some(Proof {
                        success: true,
                        clause: None,
                        substitutions: Env::new(),
                    }),
                    invalidators: HashMap::new(),
                };
                self.merge_result_into_subgoal(id, r);
            } else {
                trace!("tuple {} did not unify with {}", derived, literal);
            }
        }
    }
}
