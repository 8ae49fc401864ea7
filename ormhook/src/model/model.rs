use crate::common::{Value, DEFAULT_PRIMARY_KEY};
use crate::errors::OrmResult;
use crate::model::{FieldMeta, Row};

/// A row-backed type the ORM can save, delete and query.
///
/// Usually derived with `#[derive(Model)]` from the `ormhook_derive` crate. A hand-written
/// implementation looks like this:
///
/// ```rust
/// use ormhook::common::{from_value, Value};
/// use ormhook::errors::OrmResult;
/// use ormhook::model::{Model, Row};
/// use ormhook::row;
///
/// struct Tag {
///     id: Option<i64>,
///     name: String,
/// }
///
/// impl Model for Tag {
///     fn table_name() -> String {
///         "tag".to_string()
///     }
///
///     fn to_row(&self) -> OrmResult<Row> {
///         Ok(row! { id: self.id, name: self.name.clone() })
///     }
///
///     fn from_row(row: &Row) -> OrmResult<Self> {
///         Ok(Tag {
///             id: from_value::<Option<i64>>(&row.get_or_null("id"))?,
///             name: from_value::<String>(&row.get_or_null("name"))?,
///         })
///     }
///
///     fn pk(&self) -> Option<Value> {
///         self.id.map(Value::from)
///     }
///
///     fn set_pk(&mut self, value: Value) -> OrmResult<()> {
///         self.id = from_value::<Option<i64>>(&value)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// Name of the backing table. `"model"` (or an empty name) marks an abstract base
    /// that is not listed among the registry's known models.
    fn table_name() -> String;

    /// Column holding the primary key.
    fn primary_key() -> &'static str {
        DEFAULT_PRIMARY_KEY
    }

    /// Per-field metadata, including attached choice registries.
    fn fields() -> Vec<FieldMeta> {
        Vec::new()
    }

    fn to_row(&self) -> OrmResult<Row>;

    fn from_row(row: &Row) -> OrmResult<Self>;

    /// The bound primary key, `None` while the instance has never been saved.
    fn pk(&self) -> Option<Value>;

    /// Binds the primary key assigned by the database on insert.
    fn set_pk(&mut self, value: Value) -> OrmResult<()>;

    /// Whether a save of this instance would be an insert.
    fn is_new(&self) -> bool {
        !self.pk().is_some_and(|pk| pk.is_truthy())
    }
}
