//! Hand-written models shared by the unit tests.

use crate::choices;
use crate::common::{from_value, Value};
use crate::errors::OrmResult;
use crate::model::{FieldMeta, Model, Row};
use crate::row;

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Note {
    pub id: Option<i64>,
    pub title: String,
    pub status: i64,
}

impl Note {
    pub fn new(title: &str) -> Self {
        Note {
            id: None,
            title: title.to_string(),
            status: 0,
        }
    }
}

impl Model for Note {
    fn table_name() -> String {
        "note".to_string()
    }

    fn fields() -> Vec<FieldMeta> {
        vec![
            FieldMeta::new("id"),
            FieldMeta::new("title"),
            FieldMeta::new("status").with_choices(choices![0 => "draft", 1 => "published"]),
        ]
    }

    fn to_row(&self) -> OrmResult<Row> {
        Ok(row! { id: self.id, title: self.title.clone(), status: self.status })
    }

    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Note {
            id: from_value::<Option<i64>>(&row.get_or_null("id"))?,
            title: from_value::<String>(&row.get_or_null("title"))?,
            status: from_value::<i64>(&row.get_or_null("status"))?,
        })
    }

    fn pk(&self) -> Option<Value> {
        self.id.map(Value::from)
    }

    fn set_pk(&mut self, value: Value) -> OrmResult<()> {
        self.id = from_value::<Option<i64>>(&value)?;
        Ok(())
    }
}

/// A model keyed by a natural string key, stored in the abstract `model` table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Setting {
    pub key: String,
    pub value: String,
}

impl Model for Setting {
    fn table_name() -> String {
        crate::common::DEFAULT_TABLE_NAME.to_string()
    }

    fn primary_key() -> &'static str {
        "key"
    }

    fn to_row(&self) -> OrmResult<Row> {
        Ok(row! { key: self.key.clone(), value: self.value.clone() })
    }

    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Setting {
            key: from_value::<String>(&row.get_or_null("key"))?,
            value: from_value::<String>(&row.get_or_null("value"))?,
        })
    }

    fn pk(&self) -> Option<Value> {
        Some(Value::from(self.key.clone()))
    }

    fn set_pk(&mut self, value: Value) -> OrmResult<()> {
        self.key = from_value::<String>(&value)?;
        Ok(())
    }
}
