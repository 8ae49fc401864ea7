use crate::common::Value;
use crate::errors::{ErrorKind, OrmError, OrmResult};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};

/// A single table row: column names mapped to values, in column order.
///
/// Rows are what a [`Model`](crate::model::Model) is written to and read back from. Missing
/// columns read as [`Value::Null`].
#[derive(Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Row {
    columns: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Row {
            columns: IndexMap::new(),
        }
    }

    /// Sets `column`, replacing any previous value in place.
    pub fn put<'a, T: Into<Value>>(
        &mut self,
        column: impl Into<Cow<'a, str>>,
        value: T,
    ) -> OrmResult<()> {
        let column = column.into();
        if column.is_empty() {
            log::error!("Row does not support empty column names");
            return Err(OrmError::new(
                "Row does not support empty column names",
                ErrorKind::InvalidOperation,
            ));
        }
        self.columns.insert(column.into_owned(), value.into());
        Ok(())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn get_or_null(&self, column: &str) -> Value {
        self.columns.get(column).cloned().unwrap_or(Value::Null)
    }

    /// Removes `column`, keeping the order of the remaining columns.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.columns.shift_remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copies every column of `other` into this row.
    pub fn merge(&mut self, other: &Row) {
        for (column, value) in other.columns.iter() {
            self.columns.insert(column.clone(), value.clone());
        }
    }

    /// A new row holding only `columns`, in the order given. Unknown columns are skipped.
    pub fn project(&self, columns: &[String]) -> Row {
        let mut projected = Row::new();
        for column in columns {
            if let Some(value) = self.columns.get(column) {
                projected.columns.insert(column.clone(), value.clone());
            }
        }
        projected
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Debug for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.columns.iter()).finish()
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (column, value)) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", column, value)?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Builds a [`Row`] from `column: value` pairs.
///
/// ```rust
/// use ormhook::row;
///
/// let row = row! { title: "Hello", views: 3 };
/// assert_eq!(row.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::model::Row::new()
    };

    ($($column:ident : $value:expr),* $(,)?) => {
        {
            let mut row = $crate::model::Row::new();
            $(
                row.put(stringify!($column), $crate::common::Value::from($value))
                    .expect("row! column names are never empty");
            )*
            row
        }
    };
}
