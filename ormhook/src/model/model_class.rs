use crate::choices::Choices;
use crate::common::Value;
use crate::database::{Database, ReplicaSet};
use crate::errors::{ErrorKind, OrmError, OrmResult};
use crate::model::{FieldMeta, Model};
use crate::query::{field, Filter, RawQuery, SelectQuery};
use crate::signal::{Signal, SignalContext, SignalKind};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Options for [`ModelClass::save_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Insert even when the instance already has a primary key bound.
    pub force_insert: bool,
}

impl SaveOptions {
    pub fn force_insert() -> Self {
        SaveOptions { force_insert: true }
    }
}

/// Registered model class: per-model signals, databases and read routing.
///
/// Cloning is cheap and every clone shares the same signals and replica cursor, so all
/// callers of one model class see one rotation.
///
/// # Saving and deleting
///
/// [`save`](ModelClass::save) fires `pre_save`, writes to the write database, then fires
/// `post_save`; both carry `created` in their context. [`delete_instance`](ModelClass::delete_instance)
/// does the same with `pre_delete` and `post_delete`. A failing receiver or database call
/// stops the sequence and its error is returned unchanged.
///
/// # Reading
///
/// [`select`](ModelClass::select) queries go to the next read replica in round-robin order,
/// or to the write database when the class has no replicas. [`raw`](ModelClass::raw)
/// statements are routed the same way only when their text starts with `select`.
pub struct ModelClass<M: Model> {
    inner: Arc<ModelClassInner<M>>,
}

impl<M: Model> ModelClass<M> {
    pub fn new(database: Database, read_replicas: Option<Vec<Database>>) -> Self {
        ModelClass {
            inner: Arc::new(ModelClassInner::new(database, read_replicas)),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.inner.table_name
    }

    pub fn primary_key(&self) -> &str {
        self.inner.primary_key
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.inner.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.inner.fields.iter().find(|f| f.name() == name)
    }

    /// Choice registry attached to field `name`, if it declares one.
    pub fn choices(&self, name: &str) -> Option<&Choices> {
        self.field(name).and_then(FieldMeta::choices)
    }

    pub fn pre_save(&self) -> &Signal<M> {
        &self.inner.pre_save
    }

    pub fn post_save(&self) -> &Signal<M> {
        &self.inner.post_save
    }

    pub fn pre_delete(&self) -> &Signal<M> {
        &self.inner.pre_delete
    }

    pub fn post_delete(&self) -> &Signal<M> {
        &self.inner.post_delete
    }

    pub fn signal(&self, kind: SignalKind) -> &Signal<M> {
        match kind {
            SignalKind::PreSave => self.pre_save(),
            SignalKind::PostSave => self.post_save(),
            SignalKind::PreDelete => self.pre_delete(),
            SignalKind::PostDelete => self.post_delete(),
        }
    }

    /// The write database.
    pub fn database(&self) -> &Database {
        self.inner.replicas.write_database()
    }

    pub fn read_replicas(&self) -> &[Database] {
        self.inner.replicas.replicas()
    }

    pub fn replica_set(&self) -> &ReplicaSet {
        &self.inner.replicas
    }

    /// Advances the replica cursor and returns the database the next read goes to.
    pub fn read_database(&self) -> Database {
        self.inner.replicas.read_database().clone()
    }

    /// A select over this model's table, bound to the next read database.
    pub fn select(&self) -> SelectQuery {
        SelectQuery::new(self.table_name(), self.database().clone()).bind(self.read_database())
    }

    /// A raw statement; select statements go to the next read database, anything else to
    /// the write database.
    pub fn raw(&self, sql: &str, params: Vec<Value>) -> RawQuery {
        let query = RawQuery::new(sql, params, self.database().clone());
        if query.is_select() {
            query.bind(self.read_database())
        } else {
            query
        }
    }

    /// The single instance matching `filter`.
    ///
    /// Fails with [`ErrorKind::DoesNotExist`] when nothing matches.
    pub fn get(&self, filter: Filter) -> OrmResult<M> {
        let query = self.select().filter(filter);
        match query.fetch_first::<M>()? {
            Some(instance) => Ok(instance),
            None => {
                log::error!("No {} row matches {}", self.table_name(), query.predicate());
                Err(OrmError::new(
                    &format!("{} matching query does not exist", self.table_name()),
                    ErrorKind::DoesNotExist,
                ))
            }
        }
    }

    /// Like [`get`](ModelClass::get), but `None` instead of [`ErrorKind::DoesNotExist`].
    /// Every other error is returned unchanged.
    pub fn get_or_none(&self, filter: Filter) -> OrmResult<Option<M>> {
        match self.get(filter) {
            Ok(instance) => Ok(Some(instance)),
            Err(err) if err.is_does_not_exist() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn get_by_id<T: Into<Value>>(&self, pk: T) -> OrmResult<M> {
        self.get(field(self.primary_key()).eq(pk))
    }

    pub fn save(&self, instance: &mut M) -> OrmResult<usize> {
        self.save_with(instance, SaveOptions::default())
    }

    /// Saves `instance`, inserting when forced or when it has no primary key bound and
    /// updating otherwise. Returns the number of rows written.
    pub fn save_with(&self, instance: &mut M, options: SaveOptions) -> OrmResult<usize> {
        let created = options.force_insert || instance.is_new();
        let context = SignalContext::saving(created);
        log::debug!("Saving {} (created = {})", self.table_name(), created);

        self.inner.pre_save.send(instance, &context)?;

        let primary_key = self.primary_key();
        let mut row = instance.to_row()?;
        let written = if created {
            if !row.get(primary_key).is_some_and(Value::is_truthy) {
                row.remove(primary_key);
            }
            let pk = self.database().insert(self.table_name(), primary_key, row)?;
            instance.set_pk(pk)?;
            1
        } else {
            let pk = instance.pk().unwrap_or_default();
            row.remove(primary_key);
            self.database()
                .update(self.table_name(), primary_key, &pk, row)?
        };

        self.inner.post_save.send(instance, &context)?;
        Ok(written)
    }

    /// Inserts a new instance and returns it with its primary key bound.
    pub fn create(&self, mut instance: M) -> OrmResult<M> {
        self.save_with(&mut instance, SaveOptions::force_insert())?;
        Ok(instance)
    }

    /// Deletes `instance` by primary key. Returns the number of rows removed.
    pub fn delete_instance(&self, instance: &M) -> OrmResult<usize> {
        let context = SignalContext::new();
        log::debug!("Deleting {}", self.table_name());

        self.inner.pre_delete.send(instance, &context)?;
        let pk = instance.pk().unwrap_or_default();
        let deleted = self
            .database()
            .delete(self.table_name(), self.primary_key(), &pk)?;
        self.inner.post_delete.send(instance, &context)?;
        Ok(deleted)
    }
}

impl<M: Model> Clone for ModelClass<M> {
    fn clone(&self) -> Self {
        ModelClass {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Model> Debug for ModelClass<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClass")
            .field("table_name", &self.inner.table_name)
            .field("database", self.database())
            .field("read_replicas", &self.read_replicas())
            .finish()
    }
}

struct ModelClassInner<M> {
    table_name: String,
    primary_key: &'static str,
    fields: Vec<FieldMeta>,
    pre_save: Signal<M>,
    post_save: Signal<M>,
    pre_delete: Signal<M>,
    post_delete: Signal<M>,
    replicas: ReplicaSet,
}

impl<M: Model> ModelClassInner<M> {
    fn new(database: Database, read_replicas: Option<Vec<Database>>) -> Self {
        ModelClassInner {
            table_name: M::table_name(),
            primary_key: M::primary_key(),
            fields: M::fields(),
            pre_save: Signal::new(),
            post_save: Signal::new(),
            pre_delete: Signal::new(),
            post_delete: Signal::new(),
            replicas: ReplicaSet::new(database, read_replicas),
        }
    }
}
