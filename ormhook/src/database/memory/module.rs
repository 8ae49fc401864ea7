use crate::common::{MEMORY_SCHEME, REPLICA_OF_PARAM};
use crate::database::memory::MemoryDatabase;
use crate::database::{Database, DatabaseModule, DatabaseUrl};
use crate::errors::{ErrorKind, OrmError, OrmResult};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
struct CatalogEntry {
    memory: MemoryDatabase,
    handle: Database,
}

/// Serves `memory://name` URLs.
///
/// Databases are kept in a catalog by name, so connecting the same URL twice yields the same
/// handle. `memory://replica?replica_of=primary` creates a replica sharing the tables of
/// `primary`, creating the primary first when needed.
#[derive(Clone, Default)]
pub struct MemoryModule {
    catalog: Arc<DashMap<String, CatalogEntry>>,
}

impl MemoryModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The in-memory database registered under `name`, for inspecting its statement log.
    pub fn database(&self, name: &str) -> Option<MemoryDatabase> {
        self.catalog.get(name).map(|entry| entry.memory.clone())
    }

    pub fn database_names(&self) -> Vec<String> {
        self.catalog.iter().map(|entry| entry.key().clone()).collect()
    }

    fn get_or_create(&self, name: &str, primary: Option<&MemoryDatabase>) -> CatalogEntry {
        self.catalog
            .entry(name.to_string())
            .or_insert_with(|| {
                let memory = match primary {
                    Some(primary) => MemoryDatabase::replica_of(name, primary),
                    None => MemoryDatabase::new(name),
                };
                log::debug!("Created in-memory database {}", name);
                CatalogEntry {
                    handle: Database::new(memory.clone()),
                    memory,
                }
            })
            .clone()
    }
}

impl DatabaseModule for MemoryModule {
    fn schemes(&self) -> Vec<String> {
        vec![MEMORY_SCHEME.to_string()]
    }

    fn connect(&self, url: &DatabaseUrl) -> OrmResult<Database> {
        let name = url.database_name();
        if name.is_empty() {
            log::error!("In-memory database url {} has no name", url);
            return Err(OrmError::new(
                "In-memory database url needs a name, e.g. memory://main",
                ErrorKind::InvalidConfiguration,
            ));
        }

        let primary = match url.param(REPLICA_OF_PARAM) {
            Some(primary) if primary == name => {
                log::error!("In-memory database {} cannot replicate itself", name);
                return Err(OrmError::new(
                    &format!("In-memory database {} cannot replicate itself", name),
                    ErrorKind::InvalidConfiguration,
                ));
            }
            Some(primary) => Some(self.get_or_create(primary, None).memory),
            None => None,
        };

        Ok(self.get_or_create(name, primary.as_ref()).handle)
    }
}
