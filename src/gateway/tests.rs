use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_query::{Expr, Query, Values};

use crate::bootstrap::BootstrapCoordinator;
use crate::config::BootstrapConfig;
use crate::storage::mock::MockCatalog;
use crate::storage::schema::Customers;
use crate::storage::{SchemaCatalog, StorageError};

use super::*;

/// Executor recording the statements it receives. Rows are the SQL text.
#[derive(Default)]
struct RecordingExecutor {
    statements: Mutex<Vec<Statement>>,
}

impl RecordingExecutor {
    fn recorded(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    type Row = String;

    async fn fetch_all(&self, statement: Statement) -> Result<Vec<String>> {
        let sql = statement.sql.clone();
        self.statements.lock().unwrap().push(statement);
        Ok(vec![sql])
    }

    async fn execute(&self, statement: Statement) -> Result<u64> {
        self.statements.lock().unwrap().push(statement);
        Ok(1)
    }

    async fn execute_atomic(&self, statements: Vec<Statement>) -> Result<u64> {
        let count = statements.len() as u64;
        self.statements.lock().unwrap().extend(statements);
        Ok(count)
    }
}

fn test_config() -> BootstrapConfig {
    BootstrapConfig {
        password_cost: 4,
        max_retries: 0,
        cooldown: 0,
        ..BootstrapConfig::default()
    }
}

fn gateway(catalog: Arc<MockCatalog>) -> QueryGateway<RecordingExecutor> {
    let bootstrap = Arc::new(BootstrapCoordinator::new(catalog, test_config()));
    QueryGateway::new(RecordingExecutor::default(), bootstrap)
}

#[tokio::test]
async fn test_query_before_explicit_init_bootstraps_first() {
    let catalog = Arc::new(MockCatalog::new());
    let gateway = gateway(catalog.clone());

    assert!(!gateway.bootstrap().is_initialized());
    let rows = gateway
        .execute("SELECT 1", Values(Vec::new()))
        .await
        .unwrap();

    assert_eq!(rows, vec!["SELECT 1".to_string()]);
    assert!(gateway.bootstrap().is_initialized());
    assert_eq!(catalog.create_calls(), 4);
    assert_eq!(catalog.rows("invoices").await, Some(6));
}

#[tokio::test]
async fn test_bootstrap_runs_once_across_queries() {
    let catalog = Arc::new(MockCatalog::new());
    let gateway = gateway(catalog.clone());

    for _ in 0..3 {
        gateway.run(Statement::raw("DELETE FROM invoices")).await.unwrap();
    }

    assert_eq!(catalog.list_calls(), 1);
    assert_eq!(gateway.executor.recorded().len(), 3);
}

#[tokio::test]
async fn test_bootstrap_failure_blocks_query() {
    let catalog = Arc::new(MockCatalog::new());
    catalog
        .set_fail_on_list(Some(StorageError::PermissionDenied(
            "permission denied for schema public".to_string(),
        )))
        .await;
    let gateway = gateway(catalog.clone());

    let err = gateway
        .fetch(Statement::raw("SELECT 1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::Bootstrap(InitError::Storage(StorageError::PermissionDenied(_)))
    ));
    assert!(gateway.executor.recorded().is_empty());
}

#[tokio::test]
async fn test_values_are_bound_not_interpolated() {
    let catalog = Arc::new(MockCatalog::new());
    let gateway = gateway(catalog);
    let hostile = "x' OR '1'='1";

    let query = Query::select()
        .column(Customers::Id)
        .from(Customers::Table)
        .and_where(Expr::col(Customers::Name).eq(hostile))
        .to_owned();
    gateway.fetch(Statement::from_query(&query)).await.unwrap();

    let recorded = gateway.executor.recorded();
    assert!(!recorded[0].sql.contains(hostile));
    assert_eq!(recorded[0].values.0.len(), 1);
}

#[tokio::test]
async fn test_fetch_optional_returns_first_row() {
    let catalog = Arc::new(MockCatalog::new());
    let gateway = gateway(catalog);

    let row = gateway
        .fetch_optional(Statement::raw("SELECT 2"))
        .await
        .unwrap();
    assert_eq!(row.as_deref(), Some("SELECT 2"));
}

#[tokio::test]
async fn test_run_atomic_passes_every_statement() {
    let catalog = Arc::new(MockCatalog::new());
    let gateway = gateway(catalog);

    let affected = gateway
        .run_atomic(vec![Statement::raw("SELECT 1"), Statement::raw("SELECT 2")])
        .await
        .unwrap();
    assert_eq!(affected, 2);
}

#[tokio::test]
async fn test_existing_schema_is_left_alone() {
    let catalog = Arc::new(MockCatalog::new());
    for table in ["users", "customers", "invoices", "revenue"] {
        catalog.add_table(table, 3).await;
    }
    let gateway = gateway(catalog.clone());

    gateway.fetch(Statement::raw("SELECT 1")).await.unwrap();

    assert_eq!(catalog.create_calls(), 0);
    assert_eq!(catalog.seed_calls(), 0);
    assert_eq!(catalog.row_count("customers").await.unwrap(), 3);
}

#[test]
fn test_constraint_violation_helper() {
    let err = QueryError::from(StorageError::ConstraintViolation("fk".to_string()));
    assert!(err.is_constraint_violation());
    assert!(!QueryError::Decode("bad".to_string()).is_constraint_violation());
}
