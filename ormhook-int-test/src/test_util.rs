use ormhook::database::memory::{MemoryDatabase, MemoryModule};
use ormhook::errors::{ErrorKind, OrmError, OrmResult};
use ormhook::orm::Orm;
use std::backtrace::Backtrace;
use std::time::Instant;

/// Runs a test between `before` and `after`, reporting errors and panics with a backtrace.
/// `after` runs even when the test body returns an error.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> OrmResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> OrmResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> OrmResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx)
                    .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let (error, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => (e, bt),
        Err(panic_err) => {
            let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (
                format!("Panic: {}", err_msg),
                Backtrace::capture().to_string(),
            )
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Took {:?}", start_time.elapsed());
    eprintln!("Error: {}", error);
    if !backtrace.is_empty() && !backtrace.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", backtrace);
    }
    eprintln!("=====================================================\n");

    panic!("Test failed: {}", error);
}

#[derive(Clone)]
pub struct TestContext {
    orm: Orm,
    module: MemoryModule,
    primary: String,
    replicas: Vec<String>,
}

impl TestContext {
    pub fn new(orm: Orm, module: MemoryModule, primary: String, replicas: Vec<String>) -> Self {
        Self {
            orm,
            module,
            primary,
            replicas,
        }
    }

    pub fn orm(&self) -> Orm {
        self.orm.clone()
    }

    pub fn module(&self) -> &MemoryModule {
        &self.module
    }

    pub fn primary_name(&self) -> &str {
        &self.primary
    }

    pub fn replica_names(&self) -> &[String] {
        &self.replicas
    }

    /// The in-memory backend behind the write database.
    pub fn primary(&self) -> OrmResult<MemoryDatabase> {
        self.memory(&self.primary)
    }

    /// The in-memory backend behind the `index`-th read replica.
    pub fn replica(&self, index: usize) -> OrmResult<MemoryDatabase> {
        let name = self.replicas.get(index).ok_or_else(|| {
            OrmError::new(
                &format!("No read replica at index {}", index),
                ErrorKind::InvalidOperation,
            )
        })?;
        self.memory(name)
    }

    /// Clears the statement log of every database in the context.
    pub fn clear_statements(&self) -> OrmResult<()> {
        self.primary()?.clear_executed();
        for index in 0..self.replicas.len() {
            self.replica(index)?.clear_executed();
        }
        Ok(())
    }

    fn memory(&self, name: &str) -> OrmResult<MemoryDatabase> {
        self.module.database(name).ok_or_else(|| {
            OrmError::new(
                &format!("In-memory database {} was never opened", name),
                ErrorKind::InternalError,
            )
        })
    }
}

pub fn random_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// An ORM over a fresh in-memory primary with `replica_count` replicas reading its tables.
pub fn create_test_context_with_replicas(replica_count: usize) -> OrmResult<TestContext> {
    let module = MemoryModule::new();
    let primary = random_name("main");
    let replicas: Vec<String> = (0..replica_count)
        .map(|i| format!("{}-r{}", primary, i + 1))
        .collect();

    let mut builder = Orm::builder()
        .load_module(module.clone())
        .database_url(&format!("memory://{}", primary));
    for replica in &replicas {
        builder = builder.read_replica_url(&format!("memory://{}?replica_of={}", replica, primary));
    }

    let orm = builder.open()?;
    Ok(TestContext::new(orm, module, primary, replicas))
}

pub fn create_test_context() -> OrmResult<TestContext> {
    create_test_context_with_replicas(2)
}

pub fn create_test_context_without_replicas() -> OrmResult<TestContext> {
    create_test_context_with_replicas(0)
}

pub fn cleanup(ctx: TestContext) -> OrmResult<()> {
    log::debug!(
        "Closing {} and {} replica(s)",
        ctx.primary_name(),
        ctx.replica_names().len()
    );
    ctx.orm().close()
}
