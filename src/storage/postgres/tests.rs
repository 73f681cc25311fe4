use chrono::NaiveDate;
use uuid::Uuid;

use crate::storage::schema::Customers;
use crate::storage::{InvoiceStatus, NewInvoice};

use super::queries;
use super::*;

fn invoice(amount: i64) -> NewInvoice {
    NewInvoice {
        id: None,
        customer_id: Uuid::new_v4(),
        amount,
        status: InvoiceStatus::Paid,
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    }
}

#[test]
fn test_customers_ordered_by_name() {
    let statement = queries::customers();
    assert_eq!(
        statement.sql,
        r#"SELECT "id", "name" FROM "customers" ORDER BY "name" ASC"#
    );
}

#[test]
fn test_count_statement() {
    let statement = queries::count(Customers::Table);
    assert_eq!(
        statement.sql,
        r#"SELECT COUNT(*) AS "count" FROM "customers""#
    );
}

#[test]
fn test_filtered_invoices_binds_search_term() {
    let statement = queries::filtered_invoices("evil'; --", 2);

    assert!(statement.sql.contains("ILIKE"));
    assert!(statement.sql.contains(r#"INNER JOIN "customers""#));
    assert!(statement.sql.contains(r#"ORDER BY "invoices"."date" DESC"#));
    assert!(!statement.sql.contains("evil"));

    let pattern = sea_query::Value::String(Some(Box::new("%evil'; --%".to_string())));
    let matches = statement.values.0.iter().filter(|v| **v == pattern).count();
    assert_eq!(matches, 5);
}

#[test]
fn test_filtered_invoices_pages_by_offset() {
    let first = queries::filtered_invoices("", 1);
    let third = queries::filtered_invoices("", 3);

    assert!(first.values.0.contains(&sea_query::Value::BigUnsigned(Some(0))));
    assert!(third.values.0.contains(&sea_query::Value::BigUnsigned(Some(12))));
    assert!(third.values.0.contains(&sea_query::Value::BigUnsigned(Some(6))));
}

#[test]
fn test_filtered_count_shares_search() {
    let statement = queries::filtered_count("paid");
    assert!(statement.sql.starts_with(r#"SELECT COUNT(*) AS "count""#));
    assert!(statement.sql.contains("ILIKE"));
    assert!(!statement.sql.contains("LIMIT"));
}

#[test]
fn test_invoice_totals_coalesce_to_zero() {
    let statement = queries::invoice_totals();
    assert!(statement.sql.contains("COALESCE(SUM("));
    assert!(statement.sql.contains("CASE WHEN"));
    assert!(statement.sql.contains(r#"AS "paid""#));
    assert!(statement.sql.contains(r#"AS "pending""#));
}

#[test]
fn test_insert_invoice_ignores_duplicate_ids() {
    let id = Uuid::new_v4();
    let statement = queries::insert_invoice(id, &invoice(15795), 15795);

    assert!(statement.sql.starts_with(r#"INSERT INTO "invoices""#));
    assert!(statement.sql.ends_with(r#"ON CONFLICT ("id") DO NOTHING"#));
    assert_eq!(statement.values.0.len(), 5);
}

#[test]
fn test_update_invoice_keeps_date() {
    let statement = queries::update_invoice(Uuid::new_v4(), &invoice(100), 100);
    assert!(statement.sql.starts_with(r#"UPDATE "invoices" SET"#));
    assert!(!statement.sql.contains(r#""date""#));
}

#[test]
fn test_stored_amount_range() {
    assert_eq!(stored_amount(&invoice(44800)).unwrap(), 44800);
    assert!(stored_amount(&invoice(i64::from(i32::MAX) + 1)).is_err());
}
