//! In-memory schema catalog.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{Result, SchemaCatalog, SeedBatch, StorageError, TableDef};

/// Mock catalog tracking tables and row counts in memory.
///
/// Counts every call so tests can assert how often storage was touched.
/// Failures and latency can be injected.
#[derive(Default)]
pub struct MockCatalog {
    tables: RwLock<HashMap<String, i64>>,
    latency: RwLock<Option<Duration>>,
    fail_on_list: RwLock<Option<StorageError>>,
    fail_on_seed: RwLock<Option<StorageError>>,
    transient_failures: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    seed_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table that already exists with `rows` rows.
    pub async fn add_table(&self, name: &str, rows: i64) {
        self.tables.write().await.insert(name.to_string(), rows);
    }

    /// Delay every storage call.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    /// Fail every table listing with `error` until cleared with `None`.
    pub async fn set_fail_on_list(&self, error: Option<StorageError>) {
        *self.fail_on_list.write().await = error;
    }

    /// Fail every seed insert with `error` until cleared with `None`.
    pub async fn set_fail_on_seed(&self, error: Option<StorageError>) {
        *self.fail_on_seed.write().await = error;
    }

    /// Fail the next `count` table listings as unavailable.
    pub fn fail_next_lists(&self, count: usize) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn seed_calls(&self) -> usize {
        self.seed_calls.load(Ordering::SeqCst)
    }

    /// Row count of a table, `None` if it does not exist.
    pub async fn rows(&self, table: &str) -> Option<i64> {
        self.tables.read().await.get(table).copied()
    }

    async fn delay(&self) {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn missing_relation(table: &str) -> StorageError {
        StorageError::Database(format!("relation \"{}\" does not exist", table))
    }
}

#[async_trait]
impl SchemaCatalog for MockCatalog {
    async fn existing_tables(&self) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return Err(StorageError::Unavailable("connection refused".to_string()));
        }
        if let Some(err) = self.fail_on_list.read().await.clone() {
            return Err(err);
        }

        Ok(self.tables.read().await.keys().cloned().collect())
    }

    async fn create_table(&self, table: &TableDef) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.tables
            .write()
            .await
            .entry(table.name.to_string())
            .or_insert(0);
        Ok(())
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        self.delay().await;
        self.rows(table)
            .await
            .ok_or_else(|| Self::missing_relation(table))
    }

    async fn seed_if_empty(&self, seed: &SeedBatch) -> Result<u64> {
        self.seed_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if let Some(err) = self.fail_on_seed.read().await.clone() {
            return Err(err);
        }

        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(seed.table)
            .ok_or_else(|| Self::missing_relation(seed.table))?;
        if *rows > 0 {
            return Ok(0);
        }
        *rows = seed.rows as i64;
        Ok(seed.rows as u64)
    }
}
