use crate::common::SortOrder;
use crate::database::Database;
use crate::errors::OrmResult;
use crate::model::{Model, Row};
use crate::query::Filter;
use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// A structured `SELECT` against one table, bound to the database that will run it.
///
/// Builder methods consume and return the query. A query obtained from
/// [`ModelClass::select`](crate::model::ModelClass::select) is already bound to the read
/// database picked for it.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    database: Database,
    filter: Filter,
    order: Vec<(String, SortOrder)>,
    limit: Option<usize>,
    offset: Option<usize>,
    columns: Vec<String>,
}

impl SelectQuery {
    pub fn new(table: &str, database: Database) -> Self {
        SelectQuery {
            table: table.to_string(),
            database,
            filter: Filter::All,
            order: Vec::new(),
            limit: None,
            offset: None,
            columns: Vec::new(),
        }
    }

    /// Adds a predicate; successive calls are combined with AND.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = std::mem::replace(&mut self.filter, Filter::All).and(filter);
        self
    }

    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Restricts the returned columns. An empty projection returns every column.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Rebinds the query to another database.
    pub fn bind(mut self, database: Database) -> Self {
        self.database = database;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn predicate(&self) -> &Filter {
        &self.filter
    }

    pub fn ordering(&self) -> &[(String, SortOrder)] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.offset
    }

    pub fn projection(&self) -> &[String] {
        &self.columns
    }

    pub fn execute(&self) -> OrmResult<Vec<Row>> {
        self.database.select(self)
    }

    /// First matching row, if any.
    pub fn first(&self) -> OrmResult<Option<Row>> {
        let query = self.clone().limit(1);
        Ok(query.execute()?.into_iter().next())
    }

    /// Number of rows the query returns.
    pub fn count(&self) -> OrmResult<usize> {
        Ok(self.execute()?.len())
    }

    pub fn exists(&self) -> OrmResult<bool> {
        Ok(self.first()?.is_some())
    }

    /// Runs the query and maps every row to `M`.
    pub fn fetch<M: Model>(&self) -> OrmResult<Vec<M>> {
        self.execute()?.iter().map(M::from_row).collect()
    }

    pub fn fetch_first<M: Model>(&self) -> OrmResult<Option<M>> {
        match self.first()? {
            Some(row) => Ok(Some(M::from_row(&row)?)),
            None => Ok(None),
        }
    }
}

impl Display for SelectQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        write!(f, "SELECT {} FROM {}", columns, self.table)?;
        if self.filter != Filter::All {
            write!(f, " WHERE {}", self.filter)?;
        }
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, order)| match order {
                    SortOrder::Ascending => format!("{} ASC", column),
                    SortOrder::Descending => format!("{} DESC", column),
                })
                .join(", ");
            write!(f, " ORDER BY {}", order)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}
