use crate::common::Value;
use crate::model::Row;
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A row predicate used by [`SelectQuery`](crate::query::SelectQuery) and
/// [`ModelClass::get`](crate::model::ModelClass::get).
///
/// Missing columns read as `Null`. Ordering comparisons against `Null` never match, while
/// `eq(Value::Null)` matches null columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(column, value) => &row.get_or_null(column) == value,
            Filter::Ne(column, value) => &row.get_or_null(column) != value,
            Filter::Gt(column, value) => compare(row, column, value, |o| o.is_gt()),
            Filter::Gte(column, value) => compare(row, column, value, |o| o.is_ge()),
            Filter::Lt(column, value) => compare(row, column, value, |o| o.is_lt()),
            Filter::Lte(column, value) => compare(row, column, value, |o| o.is_le()),
            Filter::In(column, values) => {
                let actual = row.get_or_null(column);
                values.iter().any(|v| v == &actual)
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(row)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(row)),
            Filter::Not(filter) => !filter.matches(row),
        }
    }

    /// Both this filter and `other`. Nested conjunctions are flattened.
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::All, other) => other,
            (this, Filter::All) => this,
            (Filter::And(mut filters), Filter::And(more)) => {
                filters.extend(more);
                Filter::And(filters)
            }
            (Filter::And(mut filters), other) => {
                filters.push(other);
                Filter::And(filters)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    pub fn or(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::Or(mut filters), other) => {
                filters.push(other);
                Filter::Or(filters)
            }
            (this, other) => Filter::Or(vec![this, other]),
        }
    }

    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }

    /// Column and value of a single equality test, used by backends for key lookups.
    pub fn as_equality(&self) -> Option<(&str, &Value)> {
        match self {
            Filter::Eq(column, value) => Some((column.as_str(), value)),
            _ => None,
        }
    }
}

fn compare(row: &Row, column: &str, value: &Value, accept: fn(Ordering) -> bool) -> bool {
    let actual = row.get_or_null(column);
    if actual.is_null() || value.is_null() {
        return false;
    }
    accept(actual.cmp(value))
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "true"),
            Filter::Eq(c, v) => write!(f, "{} = {}", c, v),
            Filter::Ne(c, v) => write!(f, "{} != {}", c, v),
            Filter::Gt(c, v) => write!(f, "{} > {}", c, v),
            Filter::Gte(c, v) => write!(f, "{} >= {}", c, v),
            Filter::Lt(c, v) => write!(f, "{} < {}", c, v),
            Filter::Lte(c, v) => write!(f, "{} <= {}", c, v),
            Filter::In(c, vs) => write!(f, "{} IN ({})", c, vs.iter().join(", ")),
            Filter::And(fs) => write!(f, "({})", fs.iter().join(" AND ")),
            Filter::Or(fs) => write!(f, "({})", fs.iter().join(" OR ")),
            Filter::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

/// Starts a filter on `column`.
///
/// ```rust
/// use ormhook::query::field;
///
/// let filter = field("views").gt(10).and(field("status").eq("live"));
/// assert_eq!(filter.to_string(), "(views > 10 AND status = live)");
/// ```
pub fn field(column: &str) -> FluentFilter {
    FluentFilter {
        column: column.to_string(),
    }
}

/// Matches every row.
pub fn all() -> Filter {
    Filter::All
}

pub struct FluentFilter {
    column: String,
}

impl FluentFilter {
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Eq(self.column, value.into())
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Ne(self.column, value.into())
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Gt(self.column, value.into())
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Gte(self.column, value.into())
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Lt(self.column, value.into())
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Lte(self.column, value.into())
    }

    /// Column value is one of `values`.
    pub fn in_list<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::In(self.column, values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(self) -> Filter {
        Filter::Eq(self.column, Value::Null)
    }
}
