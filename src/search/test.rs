use crate::database::{Database, QueryResult};
use crate::external::ExternalRelation;

/// Apply a whole program, returning the results of the last command.
fn run_program(db: &Database, program: &str) -> Vec<QueryResult> {
    let commands = db.parse(program).expect("parse failed");
    let mut last = vec![];
    for c in commands {
        last = db.apply(c).expect("apply failed");
    }
    last
}

/// Result bags have unspecified order; compare sorted lines.
fn solutions(db: &Database, results: &[QueryResult]) -> Vec<String> {
    let rendered = db.format_results(results);
    let mut lines: Vec<String> = rendered.lines().map(str::to_owned).collect();
    lines.sort();
    lines
}

fn assert_program(program: &str, expected: &[&str]) {
    let db = Database::new();
    let results = run_program(&db, program);
    let mut expected: Vec<&str> = expected.to_vec();
    expected.sort_unstable();
    assert_eq!(solutions(&db, &results), expected);
}

fn table(predicate: &str, arity: usize, rows: &[&[&str]]) -> ExternalRelation {
    ExternalRelation::table(
        predicate,
        arity,
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    )
}

#[test]
fn simple_join() {
    assert_program(
        "foo(1).
         foo(2).
         foo(3).
         baz(1, 3).
         baz(1, 4).
         bar(A, B) :-
             foo(A),
             foo(B),
             baz(A, B).
         bar(X, Y)?",
        &["bar(1, 3)."],
    );
}

#[test]
fn ancestor_transitivity() {
    assert_program(
        "ancestor(A, B) :- parent(A, B).
         ancestor(A, B) :- parent(A, C), ancestor(C, B).
         parent(john, douglas).
         parent(bob, john).
         parent(ebbon, bob).
         ancestor(A, B)?",
        &[
            "ancestor(bob, john).",
            "ancestor(ebbon, bob).",
            "ancestor(bob, douglas).",
            "ancestor(ebbon, john).",
            "ancestor(ebbon, douglas).",
            "ancestor(john, douglas).",
        ],
    );
}

#[test]
fn mutual_recursion_terminates() {
    // p q test from Chen & Warren
    assert_program(
        "q(X) :- p(X).
         q(a).
         p(X) :- q(X).
         q(X)?",
        &["q(a)."],
    );
}

#[test]
fn path_closure_over_a_cycle() {
    assert_program(
        "edge(a, b). edge(b, c). edge(c, d). edge(d, a).
         path(X, Y) :- edge(X, Y).
         path(X, Y) :- edge(X, Z), path(Z, Y).
         path(X, Y) :- path(X, Z), edge(Z, Y).
         path(X, Y)?",
        &[
            "path(a, a).", "path(a, b).", "path(a, c).", "path(a, d).",
            "path(b, a).", "path(b, b).", "path(b, c).", "path(b, d).",
            "path(c, a).", "path(c, b).", "path(c, c).", "path(c, d).",
            "path(d, a).", "path(d, b).", "path(d, c).", "path(d, d).",
        ],
    );
}

#[test]
fn delegation_chains() {
    // Laps test
    assert_program(
        "contains(ca, store, rams_couch, rams).
         contains(rams, fetch, rams_couch, will).
         contains(ca, fetch, Name, Watcher) :-
             contains(ca, store, Name, Owner),
             contains(Owner, fetch, Name, Watcher).
         trusted(ca).
         permit(User, Priv, Name) :-
             contains(Auth, Priv, Name, User),
             trusted(Auth).
         permit(User, Priv, Name)?",
        &[
            "permit(rams, store, rams_couch).",
            "permit(will, fetch, rams_couch).",
        ],
    );
}

#[test]
fn long_identifiers() {
    assert_program(
        "abcdefghi(z123456789,
         z1234567890123456789,
         z123456789012345678901234567890123456789,
         z1234567890123456789012345678901234567890123456789012345678901234567890123456789).

         this_is_a_long_identifier_and_tests_the_scanners_concat_when_read_with_a_small_buffer.
         this_is_a_long_identifier_and_tests_the_scanners_concat_when_read_with_a_small_buffer?",
        &["this_is_a_long_identifier_and_tests_the_scanners_concat_when_read_with_a_small_buffer."],
    );
}

#[test]
fn zero_arity_predicates() {
    assert_program("true. true?", &["true."]);
}

#[test]
fn safe_negation() {
    assert_program(
        "foo(a). foo(b). bar(a).
         baz(X) :-
             foo(X),
             !bar(X).
         baz(Y)?",
        &["baz(b)."],
    );
}

#[test]
fn negation_is_reordered_behind_positive_literals() {
    assert_program(
        "foo(a). foo(b). bar(a).
         baz(X) :-
             !bar(X),
             foo(X).
         baz(Y)?",
        &["baz(b)."],
    );
}

#[test]
fn negation_with_no_matches_keeps_everything() {
    assert_program(
        "foo(a). foo(b).
         baz(X) :- foo(X), !bar(X).
         bar(c).
         baz(Y)?",
        &["baz(a).", "baz(b)."],
    );
}

#[test]
fn ground_queries_answer_yes_or_no() {
    assert_program(
        "parent(a, b). parent(b, c).
         ancestor(X, Y) :- parent(X, Y).
         ancestor(X, Y) :- parent(X, Z), ancestor(Z, Y).
         ancestor(a, c)?",
        &["ancestor(a, c)."],
    );
    assert_program(
        "parent(a, b).
         ancestor(X, Y) :- parent(X, Y).
         ancestor(c, a)?",
        &[],
    );
}

#[test]
fn membership_filters_and_enumerates() {
    assert_program(
        "foo(a). foo(b). foo(d).
         baz(X) :- foo(X), X in [a, b, c].
         baz(X)?",
        &["baz(a).", "baz(b)."],
    );
}

#[test]
fn membership_enumerates_unbound_elements() {
    assert_program(
        "any(X) :- X in [r2, d2].
         any(X)?",
        &["any(d2).", "any(r2)."],
    );
}

#[test]
fn external_relation_join() {
    let db = Database::new();
    db.add_external_relations([table(
        "external",
        2,
        &[&["a", "b"], &["a", "c"], &["a", "d"], &["b", "c"]],
    )]);
    let results = run_program(
        &db,
        "foo(a).
         foo(b).
         foo(d).
         foo(e).
         bar(X, Y) :-
             external(X, Y),
             foo(X),
             foo(Y).
         bar(X, Y)?",
    );
    assert_eq!(solutions(&db, &results), vec!["bar(a, b).", "bar(a, d)."]);
}

#[test]
fn external_relation_handles_repeated_variables() {
    let db = Database::new();
    db.add_external_relations([table(
        "pair",
        2,
        &[&["a", "b"], &["b", "b"], &["c", "c"]],
    )]);
    // The relation never sees the repetition; the engine re-unifies.
    let results = run_program(&db, "pair(X, X)?");
    assert_eq!(solutions(&db, &results), vec!["pair(b, b).", "pair(c, c)."]);
}

#[test]
fn external_relation_with_bound_call_terms() {
    let db = Database::new();
    db.add_external_relations([table(
        "edge",
        2,
        &[&["a", "b"], &["a", "c"], &["b", "c"]],
    )]);
    let results = run_program(&db, "edge(a, Y)?");
    assert_eq!(solutions(&db, &results), vec!["edge(a, b).", "edge(a, c)."]);
}

#[test]
fn failed_subgoals_are_memoized_until_invalidated() {
    let db = Database::new();
    let results = run_program(&db, "foo(a). baz(X)?");
    assert!(results.is_empty());

    // The failure is cached; the new fact stays invisible...
    run_program(&db, "baz(q).");
    let results = run_program(&db, "baz(X)?");
    assert!(results.is_empty());

    // ...until the cached entry is evicted.
    db.invalidate_literal(&db.literal("baz", [crate::term::var("Any")]));
    let results = run_program(&db, "baz(X)?");
    assert_eq!(solutions(&db, &results), vec!["baz(q)."]);
}

#[test]
fn rbac_policy_over_external_tables() {
    let db = Database::new();
    db.add_external_relations([
        table("users", 2, &[&["alice", "Admin"], &["bob", "Reader"]]),
        table("posts", 1, &[&["post1"]]),
        table("comments", 1, &[&["comment1"]]),
    ]);
    run_program(
        &db,
        "checkResource(User, Action, Resource) :-
             resourceType(Resource, ResourceType),
             users(User, Role),
             allowed(Role, Action, ResourceType).

         resourceType(Resource, 'Post') :-
             posts(Resource).
         resourceType(Resource, 'Comment') :-
             comments(Resource).

         allowed('Reader', 'View', 'Post').
         allowed('Reader', 'View', 'Comment').
         allowed('Reader', 'Create', 'Comment').

         % Writers can do everything readers can, plus create and edit posts.
         allowed('Writer', Action, ResourceType) :-
             allowed('Reader', Action, ResourceType).
         allowed('Writer', 'Create', 'Post').
         allowed('Writer', 'Edit', 'Post').
         allowed('Writer', 'Delete', 'Post').

         % Admins can do everything writers can.
         allowed('Admin', Action, ResourceType) :-
             allowed('Writer', Action, ResourceType).",
    );

    let can = |user: &str, action: &str, resource: &str| {
        let query = format!("checkResource({}, '{}', {})?", user, action, resource);
        !run_program(&db, &query).is_empty()
    };

    assert!(can("alice", "Edit", "post1"));
    assert!(can("alice", "View", "comment1"));
    assert!(can("bob", "View", "post1"));
    assert!(can("bob", "Create", "comment1"));
    assert!(!can("bob", "Edit", "post1"));
    assert!(!can("bob", "Delete", "post1"));
}

#[test]
fn results_carry_ground_literals_matching_the_query() {
    let db = Database::new();
    let results = run_program(
        &db,
        "parent(a, b). parent(b, c).
         ancestor(X, Y) :- parent(X, Y).
         ancestor(X, Y) :- parent(X, Z), ancestor(Z, Y).
         ancestor(X, Y)?",
    );
    for r in &results {
        assert!(r.literal.is_ground());
        assert_eq!(r.literal.predicate, "ancestor");
        assert_eq!(r.literal.terms.len(), 2);
        assert!(!r.literal.negated);
    }
}

#[test]
fn shared_subgoals_across_queries_reuse_the_cache() {
    let db = Database::new();
    run_program(
        &db,
        "foo(a). foo(b).
         bar(X) :- foo(X).
         quux(X) :- foo(X), bar(X).",
    );
    let first = run_program(&db, "bar(X)?");
    assert_eq!(solutions(&db, &first), vec!["bar(a).", "bar(b)."]);

    // quux shares the foo and bar subgoals with the first query; the cached
    // entries must replay into this derivation.
    let second = run_program(&db, "quux(X)?");
    assert_eq!(solutions(&db, &second), vec!["quux(a).", "quux(b)."]);
}
