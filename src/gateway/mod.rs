//! Query gateway.
//!
//! Single entry point for every query the application issues. Each call
//! awaits the schema bootstrap before touching the database, so no caller can
//! observe an uninitialized schema, and every statement is executed with
//! bound parameters.

use std::sync::Arc;

use async_trait::async_trait;
use sea_query::Values;
use sea_query_binder::SqlxValues;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tracing::error;

use crate::bootstrap::{BootstrapCoordinator, InitError};
use crate::storage::{Statement, StorageError};

/// Errors surfaced by the gateway to its callers.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Database not initialized: {0}")]
    Bootstrap(#[from] InitError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to decode row: {0}")]
    Decode(String),
}

impl QueryError {
    /// Whether the query was rejected by an integrity constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, QueryError::Storage(StorageError::ConstraintViolation(_)))
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::RowNotFound => QueryError::Decode(err.to_string()),
            other => QueryError::Storage(other.into()),
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Raw database client behind the gateway.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Row type returned by queries.
    type Row: Send;

    /// Run a statement and return its rows.
    async fn fetch_all(&self, statement: Statement) -> Result<Vec<Self::Row>>;

    /// Run a statement and return the number of rows affected.
    async fn execute(&self, statement: Statement) -> Result<u64>;

    /// Run statements in one transaction. Returns total rows affected.
    async fn execute_atomic(&self, statements: Vec<Statement>) -> Result<u64>;
}

/// PostgreSQL executor over a connection pool.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    type Row = PgRow;

    async fn fetch_all(&self, statement: Statement) -> Result<Vec<PgRow>> {
        let rows = sqlx::query_with(&statement.sql, SqlxValues(statement.values))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn execute(&self, statement: Statement) -> Result<u64> {
        let result = sqlx::query_with(&statement.sql, SqlxValues(statement.values))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn execute_atomic(&self, statements: Vec<Statement>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;

        for statement in statements {
            affected += sqlx::query_with(&statement.sql, SqlxValues(statement.values))
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }
}

/// Gateway enforcing the bootstrap precondition on every query.
pub struct QueryGateway<E: QueryExecutor> {
    executor: E,
    bootstrap: Arc<BootstrapCoordinator>,
}

impl<E: QueryExecutor> QueryGateway<E> {
    pub fn new(executor: E, bootstrap: Arc<BootstrapCoordinator>) -> Self {
        Self {
            executor,
            bootstrap,
        }
    }

    pub fn bootstrap(&self) -> &Arc<BootstrapCoordinator> {
        &self.bootstrap
    }

    async fn ready(&self) -> Result<()> {
        self.bootstrap.ensure_initialized().await.map_err(|e| {
            error!(error = %e, "Query rejected, database not initialized");
            QueryError::Bootstrap(e)
        })
    }

    /// Run raw SQL with `$n` placeholders bound to `params`.
    pub async fn execute(&self, sql: &str, params: Values) -> Result<Vec<E::Row>> {
        self.ready().await?;
        self.executor.fetch_all(Statement::new(sql, params)).await
    }

    /// Run a statement and return every row.
    pub async fn fetch(&self, statement: Statement) -> Result<Vec<E::Row>> {
        self.ready().await?;
        self.executor.fetch_all(statement).await
    }

    /// Run a statement and return the first row, if any.
    pub async fn fetch_optional(&self, statement: Statement) -> Result<Option<E::Row>> {
        Ok(self.fetch(statement).await?.into_iter().next())
    }

    /// Run a statement and return the number of rows affected.
    pub async fn run(&self, statement: Statement) -> Result<u64> {
        self.ready().await?;
        self.executor.execute(statement).await
    }

    /// Run statements in one transaction.
    pub async fn run_atomic(&self, statements: Vec<Statement>) -> Result<u64> {
        self.ready().await?;
        self.executor.execute_atomic(statements).await
    }
}

#[cfg(test)]
mod tests;
