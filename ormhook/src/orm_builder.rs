use crate::database::{Database, DatabaseModule};
use crate::errors::{OrmError, OrmResult};
use crate::orm::Orm;
use crate::orm_config::{OrmConfig, OrmSettings};

/// Fluent builder for an [`Orm`].
///
/// The first configuration error is kept and returned from [`open`](OrmBuilder::open); the
/// calls after it are ignored.
///
/// ```rust
/// use ormhook::orm::Orm;
///
/// let orm = Orm::builder()
///     .database_url("memory://blog")
///     .read_replica_url("memory://blog-r1?replica_of=blog")
///     .open()
///     .unwrap();
/// assert_eq!(orm.read_replicas().len(), 1);
/// ```
#[derive(Default)]
pub struct OrmBuilder {
    error: Option<OrmError>,
    config: OrmConfig,
}

impl OrmBuilder {
    pub fn new() -> Self {
        OrmBuilder {
            error: None,
            config: OrmConfig::new(),
        }
    }

    fn apply(mut self, step: impl FnOnce(&OrmConfig) -> OrmResult<()>) -> Self {
        if self.error.is_none() {
            if let Err(e) = step(&self.config) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn database_url(self, url: &str) -> Self {
        self.apply(|config| config.set_database_url(url))
    }

    pub fn database(self, database: Database) -> Self {
        self.apply(|config| config.set_database(database))
    }

    pub fn read_replica_url(self, url: &str) -> Self {
        self.apply(|config| config.add_read_replica_url(url))
    }

    pub fn read_replica(self, database: Database) -> Self {
        self.apply(|config| config.add_read_replica(database))
    }

    pub fn read_replicas(self, databases: Vec<Database>) -> Self {
        databases
            .into_iter()
            .fold(self, |builder, database| builder.read_replica(database))
    }

    pub fn settings(self, settings: OrmSettings) -> Self {
        self.apply(|config| config.apply_settings(settings))
    }

    /// Applies [`OrmSettings::from_env`].
    pub fn from_env(self) -> Self {
        self.apply(|config| config.apply_settings(OrmSettings::from_env()?))
    }

    pub fn load_module<T: DatabaseModule + 'static>(self, module: T) -> Self {
        self.apply(|config| config.load_module(module))
    }

    /// Opens the configured databases and returns the registry.
    pub fn open(self) -> OrmResult<Orm> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.config.auto_configure()?;
        Orm::open(self.config)
    }
}
