//! # TTL-based invalidation
//!
//! External data goes stale. A [`TtlInvalidator`] decorates external
//! relations so that every call is recorded on a bounded queue, and a
//! background worker invalidates each recorded call literal once it has
//! outlived the configured expiry. Any tuple returned by a wrapped relation
//! becomes eligible for eviction within `cycle + timeout` of its return,
//! regardless of concurrent query load.
//!
//! Enqueueing blocks when the queue is full; invalidation is best-effort
//! and the queue is sized generously.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use log::trace;

use crate::database::Database;
use crate::external::ExternalRelation;
use crate::term::Literal;

const QUEUE_CAPACITY: usize = 1000;

struct Expiring {
    literal: Literal,
    born: Instant,
}

/// Wraps external relations with expiry tracking and drives the eviction
/// worker. Holds the database weakly, so dropping every strong handle shuts
/// the worker down.
pub struct TtlInvalidator {
    db: Weak<Database>,
    timeout: Duration,
    cycle: Duration,
    sender: SyncSender<Expiring>,
    receiver: Option<Receiver<Expiring>>,
}

impl TtlInvalidator {
    /// Create an invalidator with expiry `timeout`, checking every `cycle`.
    pub fn new(db: &Arc<Database>, timeout: Duration, cycle: Duration) -> TtlInvalidator {
        let (sender, receiver) = sync_channel(QUEUE_CAPACITY);
        TtlInvalidator {
            db: Arc::downgrade(db),
            timeout,
            cycle,
            sender,
            receiver: Some(receiver),
        }
    }

    /// Decorate a relation so every invocation is registered for expiry.
    /// The recorded literal pairs the relation's predicate with the exact
    /// call terms, which is also how its results are cached.
    pub fn wrap(&self, relation: ExternalRelation) -> ExternalRelation {
        let predicate = relation.head.predicate.clone();
        let sender = self.sender.clone();
        ExternalRelation {
            head: relation.head.clone(),
            run: Box::new(move |interner, terms| {
                let tuples = (relation.run)(interner, terms);
                let record = Expiring {
                    literal: Literal::new(predicate.clone(), terms.to_vec()),
                    born: Instant::now(),
                };
                // Blocks when the queue is full.
                let _ = sender.send(record);
                tuples
            }),
        }
    }

    /// Start the background worker.
    ///
    /// # Panics
    ///
    /// Panics when called twice.
    pub fn start(&mut self) {
        let receiver = self
            .receiver
            .take()
            .expect("TTL invalidator can only be started once");
        let db = self.db.clone();
        let timeout = self.timeout;
        let cycle = self.cycle;
        thread::spawn(move || worker(receiver, db, timeout, cycle));
    }
}

fn worker(receiver: Receiver<Expiring>, db: Weak<Database>, timeout: Duration, cycle: Duration) {
    // Records arrive in birth order, so waiting on the head of the queue
    // never delays an older record.
    while let Ok(record) = receiver.recv() {
        while record.born.elapsed() < timeout {
            thread::sleep(cycle);
        }
        match db.upgrade() {
            Some(db) => {
                trace!("ttl expiry for {}", record.literal);
                db.invalidate_literal(&record.literal);
            }
            None => return,
        }
    }
}
