use criterion::{criterion_group, criterion_main, Criterion};
use privalog::Database;

macro_rules! sanity_check {
    ($computation:expr,$result:expr) => {{
        let r = $computation;
        assert_eq!(r, $result);
        r
    }};
}

/// A linear parent chain n0 -> n1 -> ... -> n<len> plus the transitive
/// ancestor rules.
fn ancestor_program(len: usize) -> String {
    let mut program = String::from(
        "ancestor(A, B) :- parent(A, B).
         ancestor(A, B) :- parent(A, C), ancestor(C, B).\n",
    );
    for i in 0..len {
        program.push_str(&format!("parent(n{}, n{}).\n", i, i + 1));
    }
    program
}

fn prepare(len: usize) -> Database {
    let db = Database::new();
    for command in db.parse(&ancestor_program(len)).unwrap() {
        db.apply(command).unwrap();
    }
    db
}

fn ask_chain(db: &Database, len: usize) -> usize {
    let query = db.parse_command("ancestor(n0, X)?").unwrap();
    let results = db.apply(query).unwrap();
    sanity_check!(results.len(), len)
}

fn derive_cold(c: &mut Criterion) {
    c.bench_function("derive_ancestor_chain_64", |b| {
        b.iter(|| {
            let db = prepare(64);
            ask_chain(&db, 64)
        })
    });
}

fn re_ask_cached(c: &mut Criterion) {
    let db = prepare(64);
    ask_chain(&db, 64);
    c.bench_function("re_ask_ancestor_chain_64", |b| b.iter(|| ask_chain(&db, 64)));
}

fn invalidate_and_rederive(c: &mut Criterion) {
    let db = prepare(64);
    let witness = db.parse_command("parent(X, Y)?").unwrap().head;
    c.bench_function("invalidate_and_rederive_chain_64", |b| {
        b.iter(|| {
            db.invalidate_literal(&witness);
            ask_chain(&db, 64)
        })
    });
}

criterion_group!(benches, derive_cold, re_ask_cached, invalidate_and_rederive);
criterion_main!(benches);
