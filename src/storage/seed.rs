//! Seed rows for an empty dashboard database.
//!
//! Every seed row carries a fixed primary key so that re-applying a batch
//! with `ON CONFLICT DO NOTHING` can never duplicate rows.

use chrono::NaiveDate;
use sea_query::{OnConflict, Query};
use uuid::{uuid, Uuid};

use super::schema::{Customers, Invoices, Revenue, Users};
use super::{Result, Statement, StorageError};

/// Password of the seeded dashboard user. Stored only as a bcrypt hash.
pub const SEED_USER_PASSWORD: &str = "123456";

/// Seeded user: (id, name, email).
pub const SEED_USER: (Uuid, &str, &str) = (
    uuid!("410544b2-4001-4271-9855-fec4b6a6442a"),
    "User",
    "user@nextmail.com",
);

/// Seeded customers: (id, name, email, image_url).
pub const SEED_CUSTOMERS: [(Uuid, &str, &str, &str); 6] = [
    (
        uuid!("d6e15727-9fe1-4961-8c5b-ea44a9bd81aa"),
        "Evil Rabbit",
        "evil@rabbit.com",
        "/customers/evil-rabbit.png",
    ),
    (
        uuid!("3958dc9e-712f-4377-85e9-fec4b6a6442a"),
        "Delba de Oliveira",
        "delba@oliveira.com",
        "/customers/delba-de-oliveira.png",
    ),
    (
        uuid!("3958dc9e-742f-4377-85e9-fec4b6a6442a"),
        "Lee Robinson",
        "lee@robinson.com",
        "/customers/lee-robinson.png",
    ),
    (
        uuid!("76d65c26-f784-44a2-ac19-586678f7c2f2"),
        "Michael Novotny",
        "michael@novotny.com",
        "/customers/michael-novotny.png",
    ),
    (
        uuid!("CC27C14A-0ACF-4F4A-A6C9-D45682C144B9"),
        "Amy Burns",
        "amy@burns.com",
        "/customers/amy-burns.png",
    ),
    (
        uuid!("13D07535-C59E-4157-A011-F8D2EF4E0CBB"),
        "Balazs Orban",
        "balazs@orban.com",
        "/customers/balazs-orban.png",
    ),
];

/// Seeded invoices: (id, customer_id, amount in cents, status, date).
pub const SEED_INVOICES: [(Uuid, Uuid, i32, &str, &str); 6] = [
    (
        uuid!("5f0c1b9e-2b7a-4c1e-9d3a-1a2b3c4d5e01"),
        uuid!("d6e15727-9fe1-4961-8c5b-ea44a9bd81aa"),
        15795,
        "pending",
        "2022-12-06",
    ),
    (
        uuid!("5f0c1b9e-2b7a-4c1e-9d3a-1a2b3c4d5e02"),
        uuid!("3958dc9e-712f-4377-85e9-fec4b6a6442a"),
        20348,
        "pending",
        "2022-11-14",
    ),
    (
        uuid!("5f0c1b9e-2b7a-4c1e-9d3a-1a2b3c4d5e03"),
        uuid!("CC27C14A-0ACF-4F4A-A6C9-D45682C144B9"),
        3040,
        "paid",
        "2022-10-29",
    ),
    (
        uuid!("5f0c1b9e-2b7a-4c1e-9d3a-1a2b3c4d5e04"),
        uuid!("76d65c26-f784-44a2-ac19-586678f7c2f2"),
        44800,
        "paid",
        "2023-09-10",
    ),
    (
        uuid!("5f0c1b9e-2b7a-4c1e-9d3a-1a2b3c4d5e05"),
        uuid!("13D07535-C59E-4157-A011-F8D2EF4E0CBB"),
        34577,
        "pending",
        "2023-08-05",
    ),
    (
        uuid!("5f0c1b9e-2b7a-4c1e-9d3a-1a2b3c4d5e06"),
        uuid!("3958dc9e-742f-4377-85e9-fec4b6a6442a"),
        54246,
        "pending",
        "2023-07-16",
    ),
];

/// Seeded monthly revenue.
pub const SEED_REVENUE: [(&str, i32); 12] = [
    ("Jan", 2000),
    ("Feb", 1800),
    ("Mar", 2200),
    ("Apr", 2500),
    ("May", 2300),
    ("Jun", 3200),
    ("Jul", 3500),
    ("Aug", 3700),
    ("Sep", 2500),
    ("Oct", 2800),
    ("Nov", 3000),
    ("Dec", 4800),
];

/// Fixed rows for one table, inserted only while that table is empty.
#[derive(Debug, Clone)]
pub struct SeedBatch {
    pub table: &'static str,
    pub rows: usize,
    pub statement: Statement,
}

/// Build every seed batch, in schema order.
///
/// Hashes the seeded user's password, so call it off the async executor.
pub fn dashboard_seeds(password_cost: u32) -> Result<Vec<SeedBatch>> {
    Ok(vec![
        users(password_cost)?,
        customers(),
        invoices()?,
        revenue(),
    ])
}

fn users(password_cost: u32) -> Result<SeedBatch> {
    let (id, name, email) = SEED_USER;
    let hash = bcrypt::hash(SEED_USER_PASSWORD, password_cost)
        .map_err(|e| StorageError::Seed(format!("failed to hash seed password: {}", e)))?;

    let query = Query::insert()
        .into_table(Users::Table)
        .columns([Users::Id, Users::Name, Users::Email, Users::Password])
        .values_panic([id.into(), name.into(), email.into(), hash.into()])
        .on_conflict(OnConflict::column(Users::Id).do_nothing().to_owned())
        .to_owned();

    Ok(SeedBatch {
        table: "users",
        rows: 1,
        statement: Statement::from_query(&query),
    })
}

fn customers() -> SeedBatch {
    let mut query = Query::insert();
    query.into_table(Customers::Table).columns([
        Customers::Id,
        Customers::Name,
        Customers::Email,
        Customers::ImageUrl,
    ]);
    for (id, name, email, image_url) in SEED_CUSTOMERS {
        query.values_panic([id.into(), name.into(), email.into(), image_url.into()]);
    }
    query.on_conflict(OnConflict::column(Customers::Id).do_nothing().to_owned());

    SeedBatch {
        table: "customers",
        rows: SEED_CUSTOMERS.len(),
        statement: Statement::from_query(&query),
    }
}

fn invoices() -> Result<SeedBatch> {
    let mut query = Query::insert();
    query.into_table(Invoices::Table).columns([
        Invoices::Id,
        Invoices::CustomerId,
        Invoices::Amount,
        Invoices::Status,
        Invoices::Date,
    ]);
    for (id, customer_id, amount, status, date) in SEED_INVOICES {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| StorageError::Seed(format!("invalid seed date {}: {}", date, e)))?;
        query.values_panic([
            id.into(),
            customer_id.into(),
            amount.into(),
            status.into(),
            date.into(),
        ]);
    }
    query.on_conflict(OnConflict::column(Invoices::Id).do_nothing().to_owned());

    Ok(SeedBatch {
        table: "invoices",
        rows: SEED_INVOICES.len(),
        statement: Statement::from_query(&query),
    })
}

fn revenue() -> SeedBatch {
    let mut query = Query::insert();
    query
        .into_table(Revenue::Table)
        .columns([Revenue::Month, Revenue::Revenue]);
    for (month, amount) in SEED_REVENUE {
        query.values_panic([month.into(), amount.into()]);
    }
    query.on_conflict(OnConflict::column(Revenue::Month).do_nothing().to_owned());

    SeedBatch {
        table: "revenue",
        rows: SEED_REVENUE.len(),
        statement: Statement::from_query(&query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost accepted by bcrypt; keeps the tests fast.
    const TEST_COST: u32 = 4;

    #[test]
    fn test_seed_batches_follow_schema_order() {
        let seeds = dashboard_seeds(TEST_COST).unwrap();
        let tables: Vec<_> = seeds.iter().map(|s| s.table).collect();
        assert_eq!(tables, vec!["users", "customers", "invoices", "revenue"]);
    }

    #[test]
    fn test_seed_row_counts() {
        let seeds = dashboard_seeds(TEST_COST).unwrap();
        let rows: Vec<_> = seeds.iter().map(|s| s.rows).collect();
        assert_eq!(rows, vec![1, 6, 6, 12]);
    }

    #[test]
    fn test_seed_invoices_reference_seed_customers() {
        for (_, customer_id, _, _, _) in SEED_INVOICES {
            assert!(SEED_CUSTOMERS.iter().any(|(id, ..)| *id == customer_id));
        }
    }

    #[test]
    fn test_seed_statements_are_parameterized_and_idempotent() {
        for seed in dashboard_seeds(TEST_COST).unwrap() {
            assert!(seed.statement.sql.contains("ON CONFLICT"), "{}", seed.table);
            assert!(seed.statement.sql.contains("$1"), "{}", seed.table);
            assert!(!seed.statement.values.0.is_empty());
        }
    }

    #[test]
    fn test_seed_password_is_hashed() {
        let seeds = dashboard_seeds(TEST_COST).unwrap();
        let users = &seeds[0];
        assert!(!users.statement.sql.contains(SEED_USER_PASSWORD));
        let plaintext = sea_query::Value::String(Some(Box::new(SEED_USER_PASSWORD.to_string())));
        assert!(!users.statement.values.0.contains(&plaintext));
    }
}
