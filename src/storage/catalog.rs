//! Schema catalog interface and its PostgreSQL implementation.
//!
//! The catalog is the bootstrapper's only view of the database. It sits
//! below the query gateway and talks to the pool directly.

use async_trait::async_trait;
use sea_query::{Alias, Expr, Query};
use sqlx::{PgPool, Row};
use tracing::debug;

use super::schema::TableDef;
use super::seed::SeedBatch;
use super::{Result, Statement};

/// Key of the transaction-scoped advisory lock serializing seed inserts
/// across processes sharing one database.
const SEED_LOCK_KEY: i64 = 0x6c65_6467_6572;

/// Key of the advisory lock serializing table creation.
const SCHEMA_LOCK_KEY: i64 = 0x6c65_6467_6573;

/// Storage operations needed to provision the schema and seed rows.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Names of the tables present in the public schema.
    async fn existing_tables(&self) -> Result<Vec<String>>;

    /// Create a table. Must succeed if the table already exists.
    async fn create_table(&self, table: &TableDef) -> Result<()>;

    /// Number of rows in a table.
    async fn row_count(&self, table: &str) -> Result<i64>;

    /// Insert a seed batch if its table is still empty.
    ///
    /// Returns the number of rows inserted (0 when the table already had rows).
    async fn seed_if_empty(&self, seed: &SeedBatch) -> Result<u64>;
}

/// PostgreSQL implementation of SchemaCatalog.
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Create a new PostgreSQL catalog.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn count_statement(table: &str) -> Statement {
        let query = Query::select()
            .expr(Expr::cust("COUNT(*)"))
            .from(Alias::new(table))
            .to_owned();
        Statement::from_query(&query)
    }
}

#[async_trait]
impl SchemaCatalog for PostgresCatalog {
    async fn existing_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT table_name::text AS table_name \
             FROM information_schema.tables \
             WHERE table_schema = 'public'",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            tables.push(row.try_get::<String, _>("table_name")?);
        }
        Ok(tables)
    }

    async fn create_table(&self, table: &TableDef) -> Result<()> {
        // Concurrent CREATE TABLE IF NOT EXISTS can still collide in pg_type.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        sqlx::query(table.create_sql).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        let statement = Self::count_statement(table);
        let row = sqlx::query(&statement.sql).fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn seed_if_empty(&self, seed: &SeedBatch) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SEED_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let count_statement = Self::count_statement(seed.table);
        let count: i64 = sqlx::query(&count_statement.sql)
            .fetch_one(&mut *tx)
            .await?
            .try_get(0)?;

        if count > 0 {
            debug!(table = seed.table, rows = count, "seed skipped, table not empty");
            tx.commit().await?;
            return Ok(0);
        }

        let inserted = sqlx::query_with(
            &seed.statement.sql,
            sea_query_binder::SqlxValues(seed.statement.values.clone()),
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_statement_quotes_table() {
        let statement = PostgresCatalog::count_statement("invoices");
        assert_eq!(statement.sql, r#"SELECT COUNT(*) FROM "invoices""#);
        assert!(statement.values.0.is_empty());
    }
}
