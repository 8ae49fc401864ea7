//! The model registry bound to its configured databases.

use crate::database::Database;
use crate::errors::OrmResult;
use crate::model::{Model, ModelClass, ModelRegistry};
use crate::orm_builder::OrmBuilder;
use crate::orm_config::OrmConfig;
use crate::signal::SignalKind;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Per-model overrides for [`Orm::register_with`].
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    database: Option<Database>,
    read_replicas: Option<Vec<Database>>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write database for this model instead of the configured one.
    pub fn database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Read replicas for this model instead of the configured ones. An empty list sends
    /// every read to the write database.
    pub fn read_replicas(mut self, read_replicas: Vec<Database>) -> Self {
        self.read_replicas = Some(read_replicas);
        self
    }
}

/// Entry point: opens the configured databases and registers models against them.
///
/// `Orm` is cheap to clone; clones share the registry, so a model class obtained from one
/// clone has the same signals and replica cursor as from any other.
///
/// ```rust
/// use ormhook::orm::Orm;
///
/// let orm = Orm::builder().database_url("memory://app").open().unwrap();
/// assert!(orm.known_models().is_empty());
/// orm.close().unwrap();
/// ```
#[derive(Clone)]
pub struct Orm {
    inner: Arc<OrmInner>,
}

impl Orm {
    pub fn builder() -> OrmBuilder {
        OrmBuilder::new()
    }

    /// Initializes `config` and wraps the databases it opened.
    pub(crate) fn open(config: OrmConfig) -> OrmResult<Orm> {
        config.initialize()?;
        let database = config.database()?;
        let read_replicas = config.read_replicas()?;
        log::debug!(
            "Opened {:?} with {} read replica(s)",
            database,
            read_replicas.len()
        );
        Ok(Orm {
            inner: Arc::new(OrmInner {
                config,
                registry: ModelRegistry::new(),
                database,
                read_replicas,
            }),
        })
    }

    /// Registers `M` against the configured write database and read replicas.
    pub fn register<M: Model>(&self) -> OrmResult<ModelClass<M>> {
        self.register_with::<M>(ModelOptions::default())
    }

    pub fn register_with<M: Model>(&self, options: ModelOptions) -> OrmResult<ModelClass<M>> {
        let database = options
            .database
            .unwrap_or_else(|| self.inner.database.clone());
        let read_replicas = options.read_replicas.or_else(|| {
            if self.inner.read_replicas.is_empty() {
                None
            } else {
                Some(self.inner.read_replicas.clone())
            }
        });
        self.inner.registry.register::<M>(database, read_replicas)
    }

    /// The registered class of `M`; [`ModelNotRegistered`](crate::errors::ErrorKind::ModelNotRegistered)
    /// otherwise.
    pub fn model<M: Model>(&self) -> OrmResult<ModelClass<M>> {
        self.inner.registry.get::<M>()
    }

    pub fn has_model<M: Model>(&self) -> bool {
        self.inner.registry.contains::<M>()
    }

    /// Table names of the registered concrete models, in registration order.
    pub fn known_models(&self) -> Vec<String> {
        self.inner.registry.known_models()
    }

    /// Connects a type-erased [`Receiver`](crate::signal::Receiver) to the `kind` signal
    /// of the model registered for `table`.
    pub fn connect(
        &self,
        table: &str,
        kind: SignalKind,
        receiver: Arc<dyn Any + Send + Sync>,
    ) -> OrmResult<()> {
        self.inner.registry.connect(table, kind, receiver)
    }

    pub fn database(&self) -> &Database {
        &self.inner.database
    }

    pub fn read_replicas(&self) -> &[Database] {
        &self.inner.read_replicas
    }

    pub fn config(&self) -> &OrmConfig {
        &self.inner.config
    }

    pub fn close(&self) -> OrmResult<()> {
        self.inner.config.close()
    }
}

impl Debug for Orm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orm")
            .field("database", &self.inner.database)
            .field("read_replicas", &self.inner.read_replicas.len())
            .finish()
    }
}

struct OrmInner {
    config: OrmConfig,
    registry: ModelRegistry,
    database: Database,
    read_replicas: Vec<Database>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDatabase;
    use crate::errors::ErrorKind;
    use crate::signal::{Receiver, SignalContext};
    use crate::test_fixtures::{Note, Setting};
    use parking_lot::Mutex;

    fn orm_with_replicas() -> Orm {
        Orm::builder()
            .database_url("memory://main")
            .read_replica_url("memory://r1?replica_of=main")
            .read_replica_url("memory://r2?replica_of=main")
            .open()
            .unwrap()
    }

    #[test]
    fn registered_models_use_configured_databases() {
        let orm = orm_with_replicas();
        let notes = orm.register::<Note>().unwrap();
        assert_eq!(notes.database(), orm.database());
        assert_eq!(notes.read_replicas(), orm.read_replicas());
        assert_eq!(notes.select().database().name(), "r1");
        assert_eq!(notes.select().database().name(), "r2");
        assert_eq!(notes.select().database().name(), "r1");
    }

    #[test]
    fn per_model_overrides() {
        let orm = orm_with_replicas();
        let other = Database::new(MemoryDatabase::new("archive"));
        let notes = orm
            .register_with::<Note>(
                ModelOptions::new()
                    .database(other.clone())
                    .read_replicas(vec![]),
            )
            .unwrap();
        assert_eq!(notes.database(), &other);
        assert_eq!(notes.select().database(), &other);
    }

    #[test]
    fn debug_shows_database_and_replica_count() {
        let orm = orm_with_replicas();
        let rendered = format!("{:?}", orm);
        assert!(rendered.starts_with("Orm {"));
        assert!(rendered.contains("main"));
        assert!(rendered.contains("read_replicas: 2"));
    }

    #[test]
    fn registry_introspection() {
        let orm = orm_with_replicas();
        assert!(!orm.has_model::<Note>());
        assert_eq!(orm.model::<Note>().unwrap_err().kind(), &ErrorKind::ModelNotRegistered);

        orm.register::<Setting>().unwrap();
        orm.register::<Note>().unwrap();
        assert!(orm.has_model::<Note>());
        assert_eq!(orm.known_models(), vec!["note"]);
        assert_eq!(
            orm.register::<Note>().unwrap_err().kind(),
            &ErrorKind::InvalidOperation
        );
    }

    #[test]
    fn clones_share_the_rotation() {
        let orm = orm_with_replicas();
        orm.register::<Note>().unwrap();
        let clone = orm.clone();

        let first = orm.model::<Note>().unwrap().read_database();
        let second = clone.model::<Note>().unwrap().read_database();
        assert_ne!(first, second);
    }

    #[test]
    fn connect_by_name() {
        let orm = orm_with_replicas();
        let notes = orm.register::<Note>().unwrap();
        let kinds = Arc::new(Mutex::new(Vec::new()));

        for name in ["pre_delete", "post_delete"] {
            let kind: SignalKind = name.parse().unwrap();
            let kinds = kinds.clone();
            let receiver = Receiver::new(move |_: &Note, _: &SignalContext| {
                kinds.lock().push(kind);
                Ok(())
            });
            orm.connect("note", kind, Arc::new(receiver)).unwrap();
        }

        let note = notes.create(Note::new("x")).unwrap();
        notes.delete_instance(&note).unwrap();
        assert_eq!(
            *kinds.lock(),
            vec![SignalKind::PreDelete, SignalKind::PostDelete]
        );
    }

    #[test]
    fn close_closes_databases() {
        let orm = orm_with_replicas();
        orm.close().unwrap();
        assert!(orm.database().is_closed());
        assert!(orm.read_replicas().iter().all(|db| db.is_closed()));
    }
}
