use crate::database::Database;
use std::sync::atomic::{AtomicIsize, Ordering};

/// Write database plus the read replicas a model class rotates through.
///
/// The cursor starts unset (`-1`), moves to `0` on the first read dispatch and wraps modulo
/// the replica count. It is shared by every caller of the owning model class, and advanced
/// with a single atomic read-modify-write so concurrent readers never see a skipped or
/// repeated position within a rotation.
#[derive(Debug)]
pub struct ReplicaSet {
    primary: Database,
    replicas: Vec<Database>,
    cursor: AtomicIsize,
}

impl ReplicaSet {
    pub fn new(primary: Database, replicas: Option<Vec<Database>>) -> Self {
        ReplicaSet {
            primary,
            replicas: replicas.unwrap_or_default(),
            cursor: AtomicIsize::new(-1),
        }
    }

    pub fn write_database(&self) -> &Database {
        &self.primary
    }

    pub fn replicas(&self) -> &[Database] {
        &self.replicas
    }

    /// Next replica in round-robin order, or the write database when there are none.
    pub fn read_database(&self) -> &Database {
        let count = self.replicas.len() as isize;
        if count == 0 {
            return &self.primary;
        }

        // fetch_update returns the previous value; recompute the position it stored
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some((c + 1).rem_euclid(count))
            })
            .unwrap_or_else(|c| c);
        let index = (previous + 1).rem_euclid(count) as usize;

        let replica = &self.replicas[index];
        log::debug!("Routing read to replica {} ({:?})", index, replica);
        replica
    }

    /// Position of the last replica handed out, `-1` before the first read.
    pub fn cursor(&self) -> isize {
        self.cursor.load(Ordering::Acquire)
    }
}
