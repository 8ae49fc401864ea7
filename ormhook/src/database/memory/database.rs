use crate::common::{atomic, Atomic, ReadExecutor, Value, WriteExecutor};
use crate::database::DatabaseProvider;
use crate::errors::{ErrorKind, OrmError, OrmResult};
use crate::model::Row;
use crate::query::SelectQuery;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use itertools::Itertools;
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, LazyLock};

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";

static RAW_SELECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^select\s+\*\s+from\s+({IDENT})(?:\s+where\s+({IDENT})\s*=\s*\?)?\s*;?$"
    ))
    .expect("raw select pattern is valid")
});

static RAW_DELETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^delete\s+from\s+({IDENT})(?:\s+where\s+({IDENT})\s*=\s*\?)?\s*;?$"
    ))
    .expect("raw delete pattern is valid")
});

static RAW_INSERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^insert\s+into\s+({IDENT})\s*\(([^)]*)\)\s*values\s*\(([^)]*)\)\s*;?$"
    ))
    .expect("raw insert pattern is valid")
});

/// A table: rows ordered by primary key plus the auto-increment sequence.
struct MemoryTable {
    rows: SkipMap<Value, Row>,
    sequence: AtomicI64,
    write_lock: Mutex<()>,
}

impl MemoryTable {
    fn new() -> Self {
        MemoryTable {
            rows: SkipMap::new(),
            sequence: AtomicI64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    fn rows(&self) -> Vec<Row> {
        self.rows.iter().map(|entry| entry.value().clone()).collect()
    }
}

/// Tables shared between a primary and the replicas created from it.
#[derive(Default)]
struct MemoryStorage {
    tables: DashMap<String, Arc<MemoryTable>>,
}

impl MemoryStorage {
    fn table(&self, name: &str) -> Arc<MemoryTable> {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryTable::new()))
            .clone()
    }

    fn existing_table(&self, name: &str) -> Option<Arc<MemoryTable>> {
        self.tables.get(name).map(|table| table.clone())
    }
}

/// In-memory [`DatabaseProvider`].
///
/// Every statement it runs is appended to a log readable through
/// [`executed`](MemoryDatabase::executed), which is how tests observe which database a query
/// was routed to. Replicas made with [`replica_of`](MemoryDatabase::replica_of) see the
/// primary's rows but keep their own log.
///
/// ```rust
/// use ormhook::database::DatabaseProvider;
/// use ormhook::database::memory::MemoryDatabase;
/// use ormhook::row;
///
/// let primary = MemoryDatabase::new("primary");
/// let replica = MemoryDatabase::replica_of("replica", &primary);
///
/// let id = primary.insert("post", "id", row! { title: "hello" }).unwrap();
/// let rows = replica.raw("SELECT * FROM post WHERE id = ?", &[id]).unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(replica.executed(), vec!["SELECT * FROM post WHERE id = ?"]);
/// ```
#[derive(Clone)]
pub struct MemoryDatabase {
    inner: Arc<MemoryDatabaseInner>,
}

impl MemoryDatabase {
    pub fn new(name: &str) -> Self {
        MemoryDatabase {
            inner: Arc::new(MemoryDatabaseInner::new(
                name,
                Arc::new(MemoryStorage::default()),
                None,
            )),
        }
    }

    /// A database named `name` that reads and writes the same tables as `primary`.
    pub fn replica_of(name: &str, primary: &MemoryDatabase) -> Self {
        MemoryDatabase {
            inner: Arc::new(MemoryDatabaseInner::new(
                name,
                primary.inner.storage.clone(),
                Some(primary.inner.name.clone()),
            )),
        }
    }

    /// Name of the primary this database replicates, if any.
    pub fn primary_name(&self) -> Option<&str> {
        self.inner.primary.as_deref()
    }

    /// Statements run against this database, oldest first.
    pub fn executed(&self) -> Vec<String> {
        self.inner.statements.read_with(|log| log.clone())
    }

    pub fn clear_executed(&self) {
        self.inner.statements.write_with(|log| log.clear());
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.inner
            .storage
            .existing_table(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.inner
            .storage
            .tables
            .iter()
            .map(|entry| entry.key().clone())
            .sorted()
            .collect()
    }
}

impl DatabaseProvider for MemoryDatabase {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn select(&self, query: &SelectQuery) -> OrmResult<Vec<Row>> {
        self.inner.select(query)
    }

    fn raw(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.inner.raw(sql, params)
    }

    fn insert(&self, table: &str, primary_key: &str, row: Row) -> OrmResult<Value> {
        self.inner.check_open()?;
        self.inner.record(format!(
            "INSERT INTO {} ({})",
            table,
            row.columns().join(", ")
        ));
        self.inner.insert(table, primary_key, row)
    }

    fn update(&self, table: &str, primary_key: &str, pk: &Value, row: Row) -> OrmResult<usize> {
        self.inner.update(table, primary_key, pk, row)
    }

    fn delete(&self, table: &str, primary_key: &str, pk: &Value) -> OrmResult<usize> {
        self.inner.check_open()?;
        self.inner
            .record(format!("DELETE FROM {} WHERE {} = {}", table, primary_key, pk));
        Ok(self.inner.delete_where(table, Some((primary_key, pk))))
    }

    fn close(&self) -> OrmResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            log::warn!("Database {} is already closed", self.inner.name);
        } else {
            log::debug!("Closed in-memory database {}", self.inner.name);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

struct MemoryDatabaseInner {
    name: String,
    primary: Option<String>,
    storage: Arc<MemoryStorage>,
    statements: Atomic<Vec<String>>,
    closed: AtomicBool,
}

impl MemoryDatabaseInner {
    fn new(name: &str, storage: Arc<MemoryStorage>, primary: Option<String>) -> Self {
        MemoryDatabaseInner {
            name: name.to_string(),
            primary,
            storage,
            statements: atomic(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> OrmResult<()> {
        if self.closed.load(Ordering::Acquire) {
            log::error!("Database {} is closed", self.name);
            return Err(OrmError::new(
                &format!("Database {} is closed", self.name),
                ErrorKind::ConnectionError,
            ));
        }
        Ok(())
    }

    fn record(&self, statement: String) {
        log::trace!("[{}] {}", self.name, statement);
        self.statements.write_with(|log| log.push(statement));
    }

    fn select(&self, query: &SelectQuery) -> OrmResult<Vec<Row>> {
        self.check_open()?;
        self.record(query.to_string());

        let table = match self.storage.existing_table(query.table()) {
            Some(table) => table,
            None => return Ok(Vec::new()),
        };

        let mut rows: Vec<Row> = table
            .rows()
            .into_iter()
            .filter(|row| query.predicate().matches(row))
            .collect();

        if !query.ordering().is_empty() {
            rows.sort_by(|a, b| {
                query
                    .ordering()
                    .iter()
                    .fold(CmpOrdering::Equal, |acc, (column, order)| {
                        acc.then_with(|| {
                            order.apply(a.get_or_null(column).cmp(&b.get_or_null(column)))
                        })
                    })
            });
        }

        let offset = query.offset_value().unwrap_or(0);
        let limit = query.limit_value().unwrap_or(usize::MAX);
        let rows = rows.into_iter().skip(offset).take(limit);

        if query.projection().is_empty() {
            Ok(rows.collect())
        } else {
            Ok(rows.map(|row| row.project(query.projection())).collect())
        }
    }

    fn insert(&self, table_name: &str, primary_key: &str, row: Row) -> OrmResult<Value> {
        let table = self.storage.table(table_name);
        let _guard = table.write_lock.lock();

        let pk = match row.get(primary_key) {
            Some(value) if !value.is_null() => value.clone(),
            _ => Value::I64(table.sequence.fetch_add(1, Ordering::AcqRel) + 1),
        };

        if table.rows.contains_key(&pk) {
            log::error!(
                "Duplicate primary key {} for {}.{}",
                pk,
                table_name,
                primary_key
            );
            return Err(OrmError::new(
                &format!("UNIQUE constraint failed: {}.{}", table_name, primary_key),
                ErrorKind::IntegrityError,
            ));
        }

        if let Some(id) = pk.as_i64() {
            table.sequence.fetch_max(id, Ordering::AcqRel);
        }

        let mut stored = Row::new();
        stored.put(primary_key, pk.clone())?;
        for (column, value) in row {
            if column != primary_key {
                stored.put(column, value)?;
            }
        }
        table.rows.insert(pk.clone(), stored);
        Ok(pk)
    }

    fn update(&self, table_name: &str, primary_key: &str, pk: &Value, row: Row) -> OrmResult<usize> {
        self.check_open()?;
        self.record(format!(
            "UPDATE {} SET {} WHERE {} = {}",
            table_name,
            row.columns().join(", "),
            primary_key,
            pk
        ));

        let table = match self.storage.existing_table(table_name) {
            Some(table) => table,
            None => return Ok(0),
        };
        let _guard = table.write_lock.lock();

        let mut updated = match table.rows.get(pk) {
            Some(entry) => entry.value().clone(),
            None => return Ok(0),
        };
        updated.merge(&row);
        updated.put(primary_key, pk.clone())?;
        table.rows.insert(pk.clone(), updated);
        Ok(1)
    }

    /// Deletes rows matching `column = value`, or every row when `condition` is `None`.
    fn delete_where(&self, table_name: &str, condition: Option<(&str, &Value)>) -> usize {
        let table = match self.storage.existing_table(table_name) {
            Some(table) => table,
            None => return 0,
        };
        let _guard = table.write_lock.lock();

        let doomed: Vec<Value> = table
            .rows
            .iter()
            .filter(|entry| match condition {
                Some((column, value)) => &entry.value().get_or_null(column) == value,
                None => true,
            })
            .map(|entry| entry.key().clone())
            .collect();

        doomed
            .iter()
            .filter(|pk| table.rows.remove(*pk).is_some())
            .count()
    }

    fn raw(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.check_open()?;
        self.record(sql.to_string());
        let statement = sql.trim();

        if let Some(captures) = RAW_SELECT.captures(statement) {
            let condition = match captures.get(2) {
                Some(column) => Some((column.as_str(), first_param(params, sql)?)),
                None => None,
            };
            let table = match self.storage.existing_table(&captures[1]) {
                Some(table) => table,
                None => return Ok(Vec::new()),
            };
            return Ok(match condition {
                Some((column, value)) => table
                    .rows()
                    .into_iter()
                    .filter(|row| &row.get_or_null(column) == value)
                    .collect(),
                None => table.rows(),
            });
        }

        if let Some(captures) = RAW_DELETE.captures(statement) {
            let condition = match captures.get(2) {
                Some(column) => Some((column.as_str(), first_param(params, sql)?)),
                None => None,
            };
            self.delete_where(&captures[1], condition);
            return Ok(Vec::new());
        }

        if let Some(captures) = RAW_INSERT.captures(statement) {
            let columns: Vec<&str> = captures[2].split(',').map(str::trim).collect();
            let placeholders: Vec<&str> = captures[3].split(',').map(str::trim).collect();
            if placeholders.iter().any(|p| *p != "?")
                || columns.len() != placeholders.len()
                || columns.len() != params.len()
            {
                log::error!("Raw insert needs one ? placeholder per column: {}", sql);
                return Err(OrmError::new(
                    "Raw insert needs one ? placeholder and one parameter per column",
                    ErrorKind::QueryError,
                ));
            }
            let row: Row = columns.into_iter().zip(params.iter().cloned()).collect();
            let primary_key = crate::common::DEFAULT_PRIMARY_KEY;
            self.insert(&captures[1], primary_key, row)?;
            return Ok(Vec::new());
        }

        log::error!("Unsupported raw statement for in-memory database: {}", sql);
        Err(OrmError::new(
            &format!("Unsupported statement: {}", sql),
            ErrorKind::QueryError,
        ))
    }
}

fn first_param<'a>(params: &'a [Value], sql: &str) -> OrmResult<&'a Value> {
    params.first().ok_or_else(|| {
        log::error!("Missing parameter for statement: {}", sql);
        OrmError::new("Missing parameter for ? placeholder", ErrorKind::QueryError)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SortOrder;
    use crate::database::Database;
    use crate::query::field;
    use crate::{row, val};

    #[test]
    fn insert_assigns_increasing_keys() {
        let db = MemoryDatabase::new("main");
        let first = db.insert("post", "id", row! { title: "a" }).unwrap();
        let second = db.insert("post", "id", row! { title: "b" }).unwrap();
        assert_eq!(first, val!(1));
        assert_eq!(second, val!(2));
        assert_eq!(db.row_count("post"), 2);
    }

    #[test]
    fn explicit_key_advances_sequence() {
        let db = MemoryDatabase::new("main");
        db.insert("post", "id", row! { id: 10, title: "a" }).unwrap();
        let next = db.insert("post", "id", row! { title: "b" }).unwrap();
        assert_eq!(next, val!(11));
    }

    #[test]
    fn duplicate_key_is_integrity_error() {
        let db = MemoryDatabase::new("main");
        db.insert("post", "id", row! { id: 1 }).unwrap();
        let err = db.insert("post", "id", row! { id: 1 }).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::IntegrityError);
        assert_eq!(db.row_count("post"), 1);
    }

    #[test]
    fn update_merges_columns() {
        let db = MemoryDatabase::new("main");
        let id = db.insert("post", "id", row! { title: "a", views: 1 }).unwrap();
        assert_eq!(db.update("post", "id", &id, row! { views: 2 }).unwrap(), 1);
        assert_eq!(db.update("post", "id", &val!(99), row! { views: 2 }).unwrap(), 0);

        let query = SelectQuery::new("post", Database::new(db.clone()));
        let rows = db.select(&query).unwrap();
        assert_eq!(rows[0].get_or_null("title"), val!("a"));
        assert_eq!(rows[0].get_or_null("views"), val!(2));
    }

    #[test]
    fn delete_by_key() {
        let db = MemoryDatabase::new("main");
        let id = db.insert("post", "id", row! { title: "a" }).unwrap();
        assert_eq!(db.delete("post", "id", &id).unwrap(), 1);
        assert_eq!(db.delete("post", "id", &id).unwrap(), 0);
        assert_eq!(db.delete("missing", "id", &id).unwrap(), 0);
    }

    #[test]
    fn select_orders_by_multiple_columns() {
        let db = MemoryDatabase::new("main");
        for (cat, views) in [("b", 1), ("a", 2), ("a", 1)] {
            db.insert("post", "id", row! { cat: cat, views: views }).unwrap();
        }
        let query = SelectQuery::new("post", Database::new(db.clone()))
            .filter(field("views").gte(1))
            .order_by("cat", SortOrder::Ascending)
            .order_by("views", SortOrder::Descending);
        let ids: Vec<Value> = db
            .select(&query)
            .unwrap()
            .iter()
            .map(|r| r.get_or_null("id"))
            .collect();
        assert_eq!(ids, vec![val!(2), val!(3), val!(1)]);
    }

    #[test]
    fn raw_dialect() {
        let db = MemoryDatabase::new("main");
        db.raw("INSERT INTO post (title, views) VALUES (?, ?)", &[val!("a"), val!(3)])
            .unwrap();
        db.raw("insert into post (title) values (?)", &[val!("b")])
            .unwrap();

        assert_eq!(db.raw("SELECT * FROM post", &[]).unwrap().len(), 2);
        let rows = db
            .raw("select * from post where title = ?", &[val!("b")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_or_null("id"), val!(2));

        db.raw("DELETE FROM post WHERE title = ?", &[val!("a")]).unwrap();
        assert_eq!(db.row_count("post"), 1);
        db.raw("DELETE FROM post", &[]).unwrap();
        assert_eq!(db.row_count("post"), 0);
    }

    #[test]
    fn raw_missing_param_fails_on_absent_table() {
        let db = MemoryDatabase::new("main");
        assert!(db.raw("SELECT * FROM ghost", &[]).unwrap().is_empty());
        let err = db.raw("SELECT * FROM ghost WHERE id = ?", &[]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::QueryError);
        let err = db.raw("DELETE FROM ghost WHERE id = ?", &[]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::QueryError);
        assert!(db.raw("DELETE FROM ghost WHERE id = ?", &[val!(1)]).unwrap().is_empty());
    }

    #[test]
    fn raw_errors() {
        let db = MemoryDatabase::new("main");
        let err = db.raw("UPDATE post SET views = 1", &[]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::QueryError);

        let err = db.raw("SELECT * FROM post WHERE id = ?", &[]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::QueryError);

        let err = db.raw("DELETE FROM post WHERE id = ?", &[]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::QueryError);

        let err = db
            .raw("INSERT INTO post (a, b) VALUES (?, ?)", &[val!(1)])
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::QueryError);
    }

    #[test]
    fn replica_shares_rows_but_not_log() {
        let primary = MemoryDatabase::new("primary");
        let replica = MemoryDatabase::replica_of("replica", &primary);
        primary.insert("post", "id", row! { title: "a" }).unwrap();

        assert_eq!(replica.raw("SELECT * FROM post", &[]).unwrap().len(), 1);
        assert_eq!(primary.executed(), vec!["INSERT INTO post (title)"]);
        assert_eq!(replica.executed(), vec!["SELECT * FROM post"]);
        assert_eq!(replica.primary_name(), Some("primary"));

        replica.clear_executed();
        assert!(replica.executed().is_empty());
        assert_eq!(replica.table_names(), vec!["post"]);
    }

    #[test]
    fn closed_database_refuses_work() {
        let db = MemoryDatabase::new("main");
        db.close().unwrap();
        db.close().unwrap();
        let err = db.insert("post", "id", row! { title: "a" }).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConnectionError);
        assert!(db.raw("SELECT * FROM post", &[]).is_err());
    }
}
