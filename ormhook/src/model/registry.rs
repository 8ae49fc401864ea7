use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor, DEFAULT_TABLE_NAME};
use crate::database::Database;
use crate::errors::{ErrorKind, OrmError, OrmResult};
use crate::model::{Model, ModelClass};
use crate::signal::SignalKind;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Type-erased view of a [`ModelClass`] so classes of different models share one map.
trait ErasedModelClass: Send + Sync {
    fn table_name(&self) -> &str;

    fn connect_any(&self, kind: SignalKind, receiver: Arc<dyn Any + Send + Sync>) -> OrmResult<()>;

    fn as_any(&self) -> &dyn Any;
}

impl<M: Model> ErasedModelClass for ModelClass<M> {
    fn table_name(&self) -> &str {
        ModelClass::table_name(self)
    }

    fn connect_any(&self, kind: SignalKind, receiver: Arc<dyn Any + Send + Sync>) -> OrmResult<()> {
        self.signal(kind).connect_any(receiver).map(|_| ())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Model classes registered on one [`Orm`](crate::orm::Orm).
///
/// Registration is the step that gives a model its four signals and its replica cursor.
/// Each model type can be registered once per registry.
pub struct ModelRegistry {
    classes: DashMap<TypeId, Arc<dyn ErasedModelClass>>,
    by_table: DashMap<String, TypeId>,
    known_models: Atomic<Vec<String>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry {
            classes: DashMap::new(),
            by_table: DashMap::new(),
            known_models: atomic(Vec::new()),
        }
    }

    /// Builds and stores the class for `M`.
    ///
    /// Models with a non-empty table name other than `"model"` are appended to
    /// [`known_models`](ModelRegistry::known_models).
    pub fn register<M: Model>(
        &self,
        database: Database,
        read_replicas: Option<Vec<Database>>,
    ) -> OrmResult<ModelClass<M>> {
        let class = match self.classes.entry(TypeId::of::<M>()) {
            Entry::Occupied(_) => {
                log::error!("Model {} is already registered", std::any::type_name::<M>());
                return Err(OrmError::new(
                    &format!(
                        "Model {} is already registered",
                        std::any::type_name::<M>()
                    ),
                    ErrorKind::InvalidOperation,
                ));
            }
            Entry::Vacant(entry) => {
                let class = ModelClass::<M>::new(database, read_replicas);
                entry.insert(Arc::new(class.clone()));
                class
            }
        };

        let table_name = class.table_name().to_string();
        if !table_name.is_empty() && table_name != DEFAULT_TABLE_NAME {
            self.known_models
                .write_with(|models| models.push(table_name.clone()));
        }

        match self.by_table.entry(table_name.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(TypeId::of::<M>());
            }
            Entry::Occupied(_) => {
                log::warn!(
                    "Table {} is shared by several models; wiring by table name resolves to the first",
                    table_name
                );
            }
        }

        log::debug!(
            "Registered model {} on table {} with {} read replica(s)",
            std::any::type_name::<M>(),
            table_name,
            class.read_replicas().len()
        );
        Ok(class)
    }

    pub fn get<M: Model>(&self) -> OrmResult<ModelClass<M>> {
        self.classes
            .get(&TypeId::of::<M>())
            .and_then(|class| class.as_any().downcast_ref::<ModelClass<M>>().cloned())
            .ok_or_else(|| {
                log::error!("Model {} is not registered", std::any::type_name::<M>());
                OrmError::new(
                    &format!("Model {} is not registered", std::any::type_name::<M>()),
                    ErrorKind::ModelNotRegistered,
                )
            })
    }

    pub fn contains<M: Model>(&self) -> bool {
        self.classes.contains_key(&TypeId::of::<M>())
    }

    /// Table names of registered concrete models, in registration order.
    pub fn known_models(&self) -> Vec<String> {
        self.known_models.read_with(|models| models.clone())
    }

    /// Connects a type-erased receiver to `kind` of the model registered for `table`.
    ///
    /// `receiver` must be a [`Receiver<M>`](crate::signal::Receiver) for that model,
    /// otherwise [`ErrorKind::InvalidReceiver`] is returned.
    pub fn connect(
        &self,
        table: &str,
        kind: SignalKind,
        receiver: Arc<dyn Any + Send + Sync>,
    ) -> OrmResult<()> {
        let type_id = self.by_table.get(table).map(|id| *id).ok_or_else(|| {
            log::error!("No model is registered for table {}", table);
            OrmError::new(
                &format!("No model is registered for table {}", table),
                ErrorKind::ModelNotRegistered,
            )
        })?;

        let class = self
            .classes
            .get(&type_id)
            .map(|class| class.value().clone())
            .ok_or_else(|| {
                log::error!("Model for table {} disappeared from the registry", table);
                OrmError::new(
                    &format!("Model for table {} is missing", table),
                    ErrorKind::InternalError,
                )
            })?;

        log::debug!("Connecting {} receiver to {}", kind, class.table_name());
        class.connect_any(kind, receiver)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
