//! # Datalog for authorization decisions
//!
//! Privalog is an embeddable Datalog engine built to answer questions of the
//! form "does this user hold that privilege on this resource?". Policies are
//! rules, application state is facts (stored, or materialized on demand from
//! external systems), and a query returns every derivable answer together
//! with a reconstructible proof.
//!
//! The engine evaluates top-down and goal-directed with memoization:
//! mutually recursive rule sets terminate, every derived subgoal is cached
//! per database, and the cache is invalidated selectively when underlying
//! facts change (explicitly via
//! [`Database::invalidate_literal`](database::Database::invalidate_literal),
//! or on a timer via [`ttl::TtlInvalidator`]). Negation is by failure and
//! must be stratified: recursion through `!` is not supported.
//!
//! # Example
//!
//! ```
//! use privalog::Database;
//!
//! let db = Database::new();
//! for command in db
//!     .parse(
//!         "parent(john, douglas).
//!          parent(bob, john).
//!          ancestor(A, B) :- parent(A, B).
//!          ancestor(A, B) :- parent(A, C), ancestor(C, B).",
//!     )
//!     .unwrap()
//! {
//!     db.apply(command).unwrap();
//! }
//!
//! let query = db.parse_command("ancestor(bob, X)?").unwrap();
//! let results = db.apply(query).unwrap();
//! let mut answers: Vec<String> = results
//!     .iter()
//!     .map(|r| db.literal_string(&r.literal))
//!     .collect();
//! answers.sort();
//! assert_eq!(answers, ["ancestor(bob, douglas)", "ancestor(bob, john)"]);
//! ```
//!
//! Facts that live elsewhere (a user table, a session service) plug in as
//! [`external::ExternalRelation`]s: callables that enumerate matching tuples
//! on demand. Results derived through them are cached like everything else,
//! and a [`ttl::TtlInvalidator`] can expire those cache entries so the
//! engine re-fetches.
//!
//! The surface syntax is described in [`textual`]; literals and clauses can
//! also be built programmatically via [`database::Database::literal`] and
//! friends, which is the natural fit when embedding the engine behind a
//! typed API.

mod checks;
pub mod database;
pub mod env;
pub mod external;
pub mod fingerprint;
pub mod intern;
mod invalidate;
pub mod proof;
mod search;
pub mod term;
pub mod textual;
pub mod ttl;

pub use checks::CheckError;
pub use database::{ApplyError, Command, CommandKind, Database, QueryResult};
pub use external::{ExternalRelation, RelationError};
pub use intern::{GroundSet, Interner};
pub use invalidate::InvalidationReport;
pub use proof::ProofError;
pub use term::{atom, var, Clause, Literal, Term, TermSpec};
pub use textual::ParseError;
pub use ttl::TtlInvalidator;
