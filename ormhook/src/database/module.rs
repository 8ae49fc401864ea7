use crate::database::{Database, DatabaseUrl};
use crate::errors::OrmResult;

/// Connects [`DatabaseUrl`]s of the schemes it serves.
///
/// Modules are loaded into an [`OrmConfig`](crate::orm_config::OrmConfig) and chosen by URL
/// scheme when the configured databases are opened. A driver crate plugs in by providing
/// one of these.
pub trait DatabaseModule: Send + Sync {
    /// Lower-case URL schemes handled by this module, e.g. `["memory"]`.
    fn schemes(&self) -> Vec<String>;

    fn connect(&self, url: &DatabaseUrl) -> OrmResult<Database>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDatabase;
    use crate::errors::{ErrorKind, OrmError};

    struct OfflineModule;

    impl DatabaseModule for OfflineModule {
        fn schemes(&self) -> Vec<String> {
            vec!["offline".to_string()]
        }

        fn connect(&self, url: &DatabaseUrl) -> OrmResult<Database> {
            if url.host() == "up" {
                Ok(Database::new(MemoryDatabase::new(url.database_name())))
            } else {
                Err(OrmError::new("host unreachable", ErrorKind::ConnectionError))
            }
        }
    }

    #[test]
    fn module_connects_by_url() {
        let module = OfflineModule;
        let url = DatabaseUrl::parse("offline://up/app").unwrap();
        assert_eq!(module.connect(&url).unwrap().name(), "app");

        let url = DatabaseUrl::parse("offline://down/app").unwrap();
        let err = module.connect(&url).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConnectionError);
    }
}
