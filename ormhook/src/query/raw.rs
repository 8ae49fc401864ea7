use crate::common::Value;
use crate::database::Database;
use crate::errors::OrmResult;
use crate::model::{Model, Row};

/// A raw SQL statement with positional parameters.
#[derive(Debug, Clone)]
pub struct RawQuery {
    sql: String,
    params: Vec<Value>,
    database: Database,
}

impl RawQuery {
    pub fn new(sql: &str, params: Vec<Value>, database: Database) -> Self {
        RawQuery {
            sql: sql.to_string(),
            params,
            database,
        }
    }

    /// Whether the statement text starts with `select`, in any case.
    ///
    /// The check is lexical only: leading whitespace or comments make it a non-select.
    pub fn is_select(&self) -> bool {
        is_select_sql(&self.sql)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn bind(mut self, database: Database) -> Self {
        self.database = database;
        self
    }

    pub fn execute(&self) -> OrmResult<Vec<Row>> {
        self.database.raw(&self.sql, &self.params)
    }

    pub fn fetch<M: Model>(&self) -> OrmResult<Vec<M>> {
        self.execute()?.iter().map(M::from_row).collect()
    }
}

pub fn is_select_sql(sql: &str) -> bool {
    sql.get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
}
