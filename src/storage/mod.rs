//! Storage implementations.
//!
//! PostgreSQL is the only backend. Everything above this module talks to it
//! through the [`SchemaCatalog`] (bootstrap) and [`DashboardStore`]
//! (data access) traits so tests can substitute the in-memory mocks.

use std::str::FromStr;
use std::time::Duration;

use sea_query::{PostgresQueryBuilder, QueryStatementWriter, Values};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use tracing::info;

use crate::config::{DatabaseConfig, SslSetting};

pub mod catalog;
pub mod postgres;
pub mod schema;
pub mod seed;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use catalog::{PostgresCatalog, SchemaCatalog};
pub use postgres::PostgresDashboardStore;
pub use schema::{SchemaDescriptor, TableDef};
pub use seed::SeedBatch;
pub use store::{
    CardData, CustomerField, DashboardStore, Invoice, InvoiceStatus, InvoiceSummary,
    LatestInvoice, NewInvoice, RevenueRow, User,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Carries rendered messages rather than driver errors so one outcome can be
/// cloned to every caller waiting on the same bootstrap attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Seed error: {0}")]
    Seed(String),
}

impl StorageError {
    /// Connectivity problems that may clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StorageError::Unavailable(err.to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(code) if code == SQLSTATE_INSUFFICIENT_PRIVILEGE => {
                    StorageError::PermissionDenied(db.message().to_string())
                }
                Some(code) if code.starts_with(SQLSTATE_INTEGRITY_CLASS) => {
                    StorageError::ConstraintViolation(db.message().to_string())
                }
                _ => StorageError::Database(db.message().to_string()),
            },
            _ => StorageError::Database(err.to_string()),
        }
    }
}

/// SQLSTATE for "insufficient_privilege".
pub const SQLSTATE_INSUFFICIENT_PRIVILEGE: &str = "42501";
/// SQLSTATE class 23: integrity constraint violation.
pub const SQLSTATE_INTEGRITY_CLASS: &str = "23";

/// A parameterized SQL statement.
///
/// Values travel separately from the SQL text and are bound by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Values,
}

impl Statement {
    pub fn new(sql: impl Into<String>, values: Values) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    /// A statement without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Values(Vec::new()))
    }

    /// Render a sea-query statement for PostgreSQL with `$n` placeholders.
    pub fn from_query<Q: QueryStatementWriter>(query: &Q) -> Self {
        let (sql, values) = query.build(PostgresQueryBuilder);
        Self { sql, values }
    }
}

/// Build the connection options for the configured database.
pub fn connect_options(config: &DatabaseConfig, ssl: SslSetting) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| StorageError::Database(format!("invalid database url: {}", e)))?;

    let mode = match ssl {
        SslSetting::Disable => PgSslMode::Disable,
        SslSetting::Prefer => PgSslMode::Prefer,
        SslSetting::Require => PgSslMode::Require,
    };

    Ok(options.ssl_mode(mode))
}

/// Pool options bounded by the configured size and timeouts.
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max)
        .idle_timeout(Duration::from_secs(config.idle_timeout))
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
}

/// Create the connection pool without opening a connection.
///
/// Connections are established on first use, which is always the bootstrap.
pub fn connect_lazy(config: &DatabaseConfig, ssl: SslSetting) -> Result<PgPool> {
    let options = connect_options(config, ssl)?;
    info!(
        max = config.max,
        idle_timeout = config.idle_timeout,
        connect_timeout = config.connect_timeout,
        ssl = ?ssl,
        "Storage: postgres pool configured"
    );
    Ok(pool_options(config).connect_lazy_with(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Expr, Query};

    use schema::Customers;

    #[test]
    fn test_statement_from_query_is_parameterized() {
        let query = Query::select()
            .column(Customers::Name)
            .from(Customers::Table)
            .and_where(Expr::col(Customers::Name).eq("Robert'); DROP TABLE customers;--"))
            .to_owned();

        let statement = Statement::from_query(&query);
        assert_eq!(
            statement.sql,
            r#"SELECT "name" FROM "customers" WHERE "name" = $1"#
        );
        assert_eq!(statement.values.0.len(), 1);
    }

    #[test]
    fn test_raw_statement_has_no_values() {
        let statement = Statement::raw("SELECT 1");
        assert!(statement.values.0.is_empty());
    }

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::Unavailable("refused".into()).is_transient());
        assert!(!StorageError::PermissionDenied("nope".into()).is_transient());
        assert!(!StorageError::ConstraintViolation("fk".into()).is_transient());
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        let err: StorageError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[test]
    fn test_connect_options_reject_bad_url() {
        let config = DatabaseConfig {
            url: "not a url".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(connect_options(&config, SslSetting::Disable).is_err());
    }

    #[test]
    fn test_connect_options_apply_ssl_mode() {
        let config = DatabaseConfig::default();
        let options = connect_options(&config, SslSetting::Require).unwrap();
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Require));
    }
}
