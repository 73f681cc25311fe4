//! Lazy, concurrency-safe schema bootstrap.
//!
//! [`BootstrapCoordinator::ensure_initialized`] creates missing tables and
//! seeds empty ones at most once per process. Concurrent callers share one
//! in-flight attempt: the first caller stores a memoized future, everyone
//! else awaits a clone of it and observes the same outcome.
//!
//! A failed attempt leaves the coordinator uninitialized. The next attempt
//! re-runs every check from scratch, but only after a cooldown that doubles
//! with consecutive failures. Within one attempt, transient storage failures
//! are retried with bounded exponential backoff, and every storage call is
//! bounded by a timeout.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use backon::Retryable;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::BootstrapConfig;
use crate::storage::seed::{self, SeedBatch};
use crate::storage::{SchemaCatalog, SchemaDescriptor, StorageError};
use crate::utils::retry::bootstrap_backoff;

/// Cap on the cooldown multiplier after consecutive failed attempts.
const MAX_COOLDOWN_FACTOR: u32 = 8;

/// Errors from the bootstrap sequence.
///
/// `Clone` because one outcome is handed to every caller of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Bootstrap step '{step}' timed out after {after:?}")]
    Timeout { step: &'static str, after: Duration },

    #[error("Bootstrap cooling down after a failed attempt, retry in {retry_in:?}")]
    CoolingDown { retry_in: Duration },
}

impl InitError {
    /// Failures worth retrying inside the same attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            InitError::Storage(e) => e.is_transient(),
            InitError::Timeout { .. } => true,
            InitError::CoolingDown { .. } => false,
        }
    }
}

type InitFuture = Shared<BoxFuture<'static, Result<(), InitError>>>;

#[derive(Default)]
struct AttemptState {
    in_flight: Option<InitFuture>,
    consecutive_failures: u32,
    retry_after: Option<Instant>,
    attempts: u64,
}

struct Inner {
    catalog: Arc<dyn SchemaCatalog>,
    schema: SchemaDescriptor,
    seeds: Option<Vec<SeedBatch>>,
    config: BootstrapConfig,
    initialized: AtomicBool,
    state: Mutex<AttemptState>,
}

/// Coordinates the one-time schema bootstrap for a process.
///
/// Shared through `Arc` and handed to the query gateway at construction.
pub struct BootstrapCoordinator {
    inner: Arc<Inner>,
}

impl BootstrapCoordinator {
    /// Coordinator for the dashboard schema and seed rows.
    pub fn new(catalog: Arc<dyn SchemaCatalog>, config: BootstrapConfig) -> Self {
        Self::build(catalog, SchemaDescriptor::dashboard(), None, config)
    }

    /// Coordinator for an explicit schema and seed set.
    pub fn with_schema(
        catalog: Arc<dyn SchemaCatalog>,
        schema: SchemaDescriptor,
        seeds: Vec<SeedBatch>,
        config: BootstrapConfig,
    ) -> Self {
        Self::build(catalog, schema, Some(seeds), config)
    }

    fn build(
        catalog: Arc<dyn SchemaCatalog>,
        schema: SchemaDescriptor,
        seeds: Option<Vec<SeedBatch>>,
        config: BootstrapConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                catalog,
                schema,
                seeds,
                config,
                initialized: AtomicBool::new(false),
                state: Mutex::new(AttemptState::default()),
            }),
        }
    }

    /// Whether a bootstrap attempt has succeeded in this process.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// Number of bootstrap attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.inner.lock_state().attempts
    }

    /// Ensure the schema exists and seed rows are present.
    ///
    /// Safe to call concurrently and repeatedly. Once an attempt succeeds,
    /// calls return immediately without touching storage.
    pub async fn ensure_initialized(&self) -> Result<(), InitError> {
        if self.is_initialized() {
            return Ok(());
        }

        let attempt = {
            let mut state = self.inner.lock_state();
            if self.is_initialized() {
                return Ok(());
            }

            match &state.in_flight {
                Some(attempt) => attempt.clone(),
                None => {
                    if let Some(retry_after) = state.retry_after {
                        let now = Instant::now();
                        if now < retry_after {
                            return Err(InitError::CoolingDown {
                                retry_in: retry_after - now,
                            });
                        }
                    }

                    state.attempts += 1;
                    let inner = Arc::clone(&self.inner);
                    let attempt = async move {
                        let result = inner.run().await;
                        inner.settle(&result);
                        result
                    }
                    .boxed()
                    .shared();
                    state.in_flight = Some(attempt.clone());
                    attempt
                }
            }
        };

        attempt.await
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, AttemptState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the outcome of the attempt that just finished.
    ///
    /// Runs inside the shared future, so exactly once per attempt.
    fn settle(&self, result: &Result<(), InitError>) {
        let mut state = self.lock_state();
        state.in_flight = None;

        match result {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                state.consecutive_failures = 0;
                state.retry_after = None;
            }
            Err(e) => {
                state.consecutive_failures += 1;
                let factor = 1u32
                    .checked_shl(state.consecutive_failures - 1)
                    .unwrap_or(MAX_COOLDOWN_FACTOR)
                    .min(MAX_COOLDOWN_FACTOR);
                let cooldown = self.config.cooldown() * factor;
                state.retry_after = Some(Instant::now() + cooldown);
                error!(
                    error = %e,
                    failures = state.consecutive_failures,
                    cooldown = ?cooldown,
                    "Database bootstrap failed"
                );
            }
        }
    }

    async fn run(&self) -> Result<(), InitError> {
        info!("Bootstrapping database schema");

        let existing = self
            .step("list tables", || self.catalog.existing_tables())
            .await?;

        let missing: Vec<_> = self.schema.missing(&existing).copied().collect();
        if missing.is_empty() {
            debug!(tables = existing.len(), "Database tables already exist");
        }
        for table in &missing {
            self.step("create table", || self.catalog.create_table(table))
                .await?;
            info!(table = table.name, "Created table");
        }

        for seed in self.seeds().await? {
            let rows = self
                .step("count rows", || self.catalog.row_count(seed.table))
                .await?;
            if rows > 0 {
                debug!(table = seed.table, rows, "Seed skipped, table not empty");
                continue;
            }

            let inserted = self
                .step("seed table", || self.catalog.seed_if_empty(&seed))
                .await?;
            info!(table = seed.table, rows = inserted, "Seeded table");
        }

        info!("Database initialized successfully");
        Ok(())
    }

    async fn seeds(&self) -> Result<Vec<SeedBatch>, InitError> {
        if let Some(seeds) = &self.seeds {
            return Ok(seeds.clone());
        }

        let cost = self.config.password_cost;
        tokio::task::spawn_blocking(move || seed::dashboard_seeds(cost))
            .await
            .map_err(|e| StorageError::Seed(format!("seed builder panicked: {}", e)))?
            .map_err(InitError::from)
    }

    /// Run one storage call under the step timeout, retrying transient failures.
    async fn step<T, F, Fut>(&self, step: &'static str, mut op: F) -> Result<T, InitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let limit = self.config.step_timeout();

        let attempt = || {
            let call = op();
            async move {
                match tokio::time::timeout(limit, call).await {
                    Ok(result) => result.map_err(InitError::from),
                    Err(_) => Err(InitError::Timeout { step, after: limit }),
                }
            }
        };

        attempt
            .retry(bootstrap_backoff(&self.config))
            .when(InitError::is_transient)
            .notify(|err: &InitError, delay: Duration| {
                warn!(step, error = %err, delay = ?delay, "Bootstrap step failed, retrying");
            })
            .await
    }
}
