//! Configuration for an [`Orm`](crate::orm::Orm): database modules, connection URLs and
//! the databases they open.

use crate::common::{
    atomic, Atomic, ReadExecutor, WriteExecutor, ENV_DATABASE_URL, ENV_READ_REPLICAS,
};
use crate::database::memory::MemoryModule;
use crate::database::{Database, DatabaseModule, DatabaseUrl};
use crate::errors::{ErrorKind, OrmError, OrmResult};
use dashmap::DashMap;
use std::env::VarError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Plain connection settings, loadable from the environment or any serde format.
///
/// ```rust
/// use ormhook::orm_config::OrmSettings;
///
/// let settings = OrmSettings::new("memory://main")
///     .with_read_replica("memory://r1?replica_of=main");
/// assert_eq!(settings.read_replicas.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrmSettings {
    /// URL of the write database.
    pub database_url: Option<String>,
    /// URLs of the read replicas, in rotation order.
    pub read_replicas: Vec<String>,
}

impl OrmSettings {
    pub fn new(database_url: &str) -> Self {
        OrmSettings {
            database_url: Some(database_url.to_string()),
            read_replicas: Vec::new(),
        }
    }

    pub fn with_read_replica(mut self, url: &str) -> Self {
        self.read_replicas.push(url.to_string());
        self
    }

    /// Reads `ORMHOOK_DATABASE_URL` and the comma separated `ORMHOOK_READ_REPLICAS`.
    /// Unset variables leave the corresponding setting empty.
    pub fn from_env() -> OrmResult<Self> {
        let database_url = read_env(ENV_DATABASE_URL)?;
        let read_replicas = read_env(ENV_READ_REPLICAS)?;
        Ok(Self::from_values(database_url.as_deref(), read_replicas.as_deref()))
    }

    fn from_values(database_url: Option<&str>, read_replicas: Option<&str>) -> Self {
        OrmSettings {
            database_url: database_url
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            read_replicas: read_replicas
                .map(|urls| {
                    urls.split(',')
                        .map(str::trim)
                        .filter(|url| !url.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

fn read_env(key: &str) -> OrmResult<Option<String>> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => {
            log::error!("Environment variable {} is not valid unicode", key);
            Err(OrmError::new(
                &format!("Environment variable {} is not valid unicode", key),
                ErrorKind::InvalidConfiguration,
            ))
        }
    }
}

/// Shared, cloneable configuration.
///
/// Everything is mutable until [`initialize`](OrmConfig::initialize) opens the databases;
/// after that every setter fails with [`ErrorKind::InvalidOperation`].
#[derive(Clone)]
pub struct OrmConfig {
    inner: Arc<OrmConfigInner>,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OrmConfig {
    pub fn new() -> Self {
        OrmConfig {
            inner: Arc::new(OrmConfigInner::new()),
        }
    }

    /// Makes `module` responsible for the URL schemes it declares.
    pub fn load_module<T: DatabaseModule + 'static>(&self, module: T) -> OrmResult<()> {
        self.inner.load_module(Arc::new(module))
    }

    /// Loads the in-memory module unless another module already serves `memory://`.
    pub fn auto_configure(&self) -> OrmResult<()> {
        if !self.inner.modules.contains_key(crate::common::MEMORY_SCHEME) {
            self.load_module(MemoryModule::new())?;
        }
        Ok(())
    }

    pub fn set_database_url(&self, url: &str) -> OrmResult<()> {
        self.inner.check_not_configured("database url")?;
        DatabaseUrl::parse(url)?;
        self.inner
            .settings
            .write_with(|settings| settings.database_url = Some(url.to_string()));
        Ok(())
    }

    pub fn add_read_replica_url(&self, url: &str) -> OrmResult<()> {
        self.inner.check_not_configured("read replicas")?;
        DatabaseUrl::parse(url)?;
        self.inner
            .settings
            .write_with(|settings| settings.read_replicas.push(url.to_string()));
        Ok(())
    }

    /// Uses an already opened database as the write database, ignoring any database url.
    pub fn set_database(&self, database: Database) -> OrmResult<()> {
        self.inner.check_not_configured("database")?;
        self.inner.database_handle.write_with(|it| *it = Some(database));
        Ok(())
    }

    /// Appends an already opened database to the read replicas.
    pub fn add_read_replica(&self, database: Database) -> OrmResult<()> {
        self.inner.check_not_configured("read replicas")?;
        self.inner.replica_handles.write_with(|it| it.push(database));
        Ok(())
    }

    /// Replaces the url settings with `settings`.
    pub fn apply_settings(&self, settings: OrmSettings) -> OrmResult<()> {
        self.inner.check_not_configured("settings")?;
        if let Some(url) = &settings.database_url {
            DatabaseUrl::parse(url)?;
        }
        for url in &settings.read_replicas {
            DatabaseUrl::parse(url)?;
        }
        self.inner.settings.write_with(|it| *it = settings);
        Ok(())
    }

    pub fn settings(&self) -> OrmSettings {
        self.inner.settings.read_with(|it| it.clone())
    }

    /// Connects `url` through the module serving its scheme.
    pub fn connect(&self, url: &str) -> OrmResult<Database> {
        self.inner.connect(url)
    }

    /// The write database. Fails until the configuration is initialized.
    pub fn database(&self) -> OrmResult<Database> {
        self.inner.databases().map(|(database, _)| database.clone())
    }

    /// The read replicas, empty when none are configured.
    pub fn read_replicas(&self) -> OrmResult<Vec<Database>> {
        self.inner.databases().map(|(_, replicas)| replicas.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.configured.load(Ordering::Acquire)
    }

    /// Opens the write database and the replicas, then freezes the configuration.
    pub(crate) fn initialize(&self) -> OrmResult<()> {
        self.inner.initialize()
    }

    /// Closes every opened database.
    pub fn close(&self) -> OrmResult<()> {
        self.inner.close()
    }
}

struct OrmConfigInner {
    configured: AtomicBool,
    modules: DashMap<String, Arc<dyn DatabaseModule>>,
    settings: Atomic<OrmSettings>,
    database_handle: Atomic<Option<Database>>,
    replica_handles: Atomic<Vec<Database>>,
    opened: OnceLock<(Database, Vec<Database>)>,
}

impl OrmConfigInner {
    fn new() -> Self {
        OrmConfigInner {
            configured: AtomicBool::new(false),
            modules: DashMap::new(),
            settings: atomic(OrmSettings::default()),
            database_handle: atomic(None),
            replica_handles: atomic(Vec::new()),
            opened: OnceLock::new(),
        }
    }

    fn check_not_configured(&self, what: &str) -> OrmResult<()> {
        if self.configured.load(Ordering::Acquire) {
            log::error!("Cannot change {} after initialization", what);
            return Err(OrmError::new(
                &format!("Cannot change {} after initialization", what),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }

    fn load_module(&self, module: Arc<dyn DatabaseModule>) -> OrmResult<()> {
        self.check_not_configured("modules")?;
        let schemes = module.schemes();
        if schemes.is_empty() {
            log::error!("Database module declares no url scheme");
            return Err(OrmError::new(
                "Database module declares no url scheme",
                ErrorKind::InvalidConfiguration,
            ));
        }
        for scheme in schemes {
            let scheme = scheme.to_ascii_lowercase();
            if self.modules.insert(scheme.clone(), module.clone()).is_some() {
                log::warn!("Replaced database module for scheme {}", scheme);
            }
        }
        Ok(())
    }

    fn connect(&self, url: &str) -> OrmResult<Database> {
        let url = DatabaseUrl::parse(url)?;
        let module = self
            .modules
            .get(url.scheme())
            .map(|module| module.value().clone())
            .ok_or_else(|| {
                log::error!("No database module loaded for scheme {}", url.scheme());
                OrmError::new(
                    &format!("No database module loaded for scheme {}", url.scheme()),
                    ErrorKind::InvalidConfiguration,
                )
            })?;

        log::debug!("Connecting {}", url);
        module.connect(&url).map_err(|err| {
            log::error!("Failed to connect {}: {}", url, err);
            OrmError::new_with_cause(
                &format!("Failed to connect {}", url),
                err.kind().clone(),
                err,
            )
        })
    }

    fn initialize(&self) -> OrmResult<()> {
        if self.configured.load(Ordering::Acquire) {
            return Ok(());
        }

        let settings = self.settings.read_with(|it| it.clone());
        let database = match self.database_handle.read_with(|it| it.clone()) {
            Some(database) => database,
            None => match &settings.database_url {
                Some(url) => self.connect(url)?,
                None => {
                    log::error!("No database is configured");
                    return Err(OrmError::new(
                        "No database is configured; set a database url or a database",
                        ErrorKind::InvalidConfiguration,
                    ));
                }
            },
        };

        let mut replicas = self.replica_handles.read_with(|it| it.clone());
        for url in &settings.read_replicas {
            replicas.push(self.connect(url)?);
        }

        if self.opened.set((database, replicas)).is_err() {
            log::warn!("Configuration was initialized concurrently");
        }
        self.configured.store(true, Ordering::Release);
        Ok(())
    }

    fn databases(&self) -> OrmResult<&(Database, Vec<Database>)> {
        self.opened.get().ok_or_else(|| {
            log::error!("Configuration is not initialized");
            OrmError::new(
                "Configuration is not initialized",
                ErrorKind::InvalidOperation,
            )
        })
    }

    fn close(&self) -> OrmResult<()> {
        if let Some((database, replicas)) = self.opened.get() {
            for replica in replicas {
                replica.close()?;
            }
            database.close()?;
        }
        Ok(())
    }
}
