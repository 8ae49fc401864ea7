use crate::common::Value;
use crate::errors::OrmResult;
use crate::model::Row;
use crate::query::SelectQuery;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Operations the shim needs from a host database.
///
/// Persistence, query planning, integrity and pooling all live behind this trait. Errors
/// a provider returns (e.g. [`ErrorKind::IntegrityError`](crate::errors::ErrorKind::IntegrityError))
/// reach the caller unchanged.
pub trait DatabaseProvider: Send + Sync {
    /// Name used in logs and debug output.
    fn name(&self) -> String;

    /// Runs a structured select and returns the matching rows.
    fn select(&self, query: &SelectQuery) -> OrmResult<Vec<Row>>;

    /// Runs a raw SQL statement with positional parameters.
    fn raw(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>>;

    /// Inserts `row` into `table` and returns the primary key it was stored under.
    fn insert(&self, table: &str, primary_key: &str, row: Row) -> OrmResult<Value>;

    /// Updates the row whose primary key is `pk` and returns the affected row count.
    fn update(&self, table: &str, primary_key: &str, pk: &Value, row: Row) -> OrmResult<usize>;

    /// Deletes the row whose primary key is `pk` and returns the affected row count.
    fn delete(&self, table: &str, primary_key: &str, pk: &Value) -> OrmResult<usize>;

    fn close(&self) -> OrmResult<()>;

    fn is_closed(&self) -> bool;
}

/// Cheap-clone handle to a [`DatabaseProvider`].
///
/// Two handles are equal when they point at the same provider instance, which is how
/// replica routing is observed.
#[derive(Clone)]
pub struct Database {
    inner: Arc<dyn DatabaseProvider>,
}

impl Database {
    pub fn new<T: DatabaseProvider + 'static>(provider: T) -> Self {
        Database {
            inner: Arc::new(provider),
        }
    }

    pub fn from_arc(provider: Arc<dyn DatabaseProvider>) -> Self {
        Database { inner: provider }
    }

    pub fn same_as(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Deref for Database {
    type Target = Arc<dyn DatabaseProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PartialEq for Database {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Database {}

impl Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Database({})", self.inner.name())
    }
}
