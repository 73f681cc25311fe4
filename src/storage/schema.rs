//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building,
//! plus the DDL the bootstrapper applies for each table.

use sea_query::Iden;

/// Users table schema.
#[derive(Iden)]
pub enum Users {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "email"]
    Email,
    #[iden = "password"]
    Password,
}

/// Customers table schema.
#[derive(Iden)]
pub enum Customers {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "email"]
    Email,
    #[iden = "image_url"]
    ImageUrl,
}

/// Invoices table schema.
#[derive(Iden)]
pub enum Invoices {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "customer_id"]
    CustomerId,
    #[iden = "amount"]
    Amount,
    #[iden = "status"]
    Status,
    #[iden = "date"]
    Date,
}

/// Revenue table schema.
#[derive(Iden)]
pub enum Revenue {
    Table,
    #[iden = "month"]
    Month,
    #[iden = "revenue"]
    Revenue,
}

/// SQL for creating the users table.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) UNIQUE NOT NULL,
    password VARCHAR(255) NOT NULL
)
"#;

/// SQL for creating the customers table.
pub const CREATE_CUSTOMERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) UNIQUE NOT NULL,
    image_url VARCHAR(255)
)
"#;

/// SQL for creating the invoices table.
pub const CREATE_INVOICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    customer_id UUID NOT NULL REFERENCES customers(id),
    amount INTEGER NOT NULL,
    status VARCHAR(255) NOT NULL,
    date DATE NOT NULL
)
"#;

/// SQL for creating the revenue table.
pub const CREATE_REVENUE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS revenue (
    month VARCHAR(4) PRIMARY KEY,
    revenue INTEGER NOT NULL
)
"#;

/// One table the bootstrapper is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    /// Table name as it appears in the catalog.
    pub name: &'static str,
    /// Idempotent DDL (`CREATE TABLE IF NOT EXISTS`).
    pub create_sql: &'static str,
}

/// Ordered set of tables required by the dashboard.
///
/// Order matters: a table appears after every table it references.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    tables: Vec<TableDef>,
}

impl SchemaDescriptor {
    pub fn new(tables: Vec<TableDef>) -> Self {
        Self { tables }
    }

    /// The dashboard schema: users, customers, invoices, revenue.
    pub fn dashboard() -> Self {
        Self::new(vec![
            TableDef {
                name: "users",
                create_sql: CREATE_USERS_TABLE,
            },
            TableDef {
                name: "customers",
                create_sql: CREATE_CUSTOMERS_TABLE,
            },
            TableDef {
                name: "invoices",
                create_sql: CREATE_INVOICES_TABLE,
            },
            TableDef {
                name: "revenue",
                create_sql: CREATE_REVENUE_TABLE,
            },
        ])
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// Tables from the descriptor that are absent from `existing`, in order.
    pub fn missing<'a>(&'a self, existing: &'a [String]) -> impl Iterator<Item = &'a TableDef> {
        self.tables
            .iter()
            .filter(move |t| !existing.iter().any(|name| name == t.name))
    }
}
