//! This bench test finds circular dependencies in a large database made of
//! many small dependency loops hanging off a long acyclic chain.

#![allow(missing_docs)]

use criterion::{Criterion, criterion_group, criterion_main};
use rtmx::{Database, Requirement};

/// Generates a chain of requirements where every tenth one closes a loop.
fn preseed_database(size: usize) -> Database {
    let mut db = Database::new();
    for i in 0..size {
        let mut requirement = Requirement::new(format!("REQ-{i:05}"));
        if i > 0 {
            requirement.add_dependency(format!("REQ-{:05}", i - 1));
        }
        if i % 10 == 9 {
            requirement.add_dependency(format!("REQ-{:05}", i + 1));
        }
        if i % 50 == 0 {
            requirement.add_dependency(format!("sync:REQ-{i:05}"));
        }
        db.push(requirement);
    }
    db
}

fn find_cycles(c: &mut Criterion) {
    let db = preseed_database(5_000);
    c.bench_function("find cycles", |b| b.iter(|| db.find_cycles()));
    c.bench_function("has cycles", |b| b.iter(|| db.has_cycles()));
}

criterion_group!(benches, find_cycles);
criterion_main!(benches);
