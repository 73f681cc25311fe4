//! Dashboard data access interface and record types.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gateway::QueryError;

/// Result type for data access operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Invoices shown per page of the filtered invoice table.
pub const ITEMS_PER_PAGE: u64 = 6;

/// Number of invoices shown in the "latest invoices" panel.
pub const LATEST_INVOICES: u64 = 5;

/// Invoice payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(format!("unknown invoice status '{}'", other)),
        }
    }
}

/// Convert a dollar amount to integer cents.
pub fn dollars_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert integer cents to a dollar amount.
pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Customer id and name, as offered by the invoice forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerField {
    pub id: Uuid,
    pub name: String,
}

/// Invoice as loaded for the edit form. `amount` is in dollars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub amount: f64,
    pub status: InvoiceStatus,
}

/// Invoice row of the filtered invoice table. `amount` is in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub date: NaiveDate,
    pub amount: i64,
    pub status: InvoiceStatus,
}

/// Entry of the latest invoices panel. `amount` is in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestInvoice {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub amount: i64,
}

/// Revenue for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueRow {
    pub month: String,
    pub revenue: i32,
}

/// Dashboard summary cards. Totals are in cents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    pub number_of_customers: i64,
    pub number_of_invoices: i64,
    pub total_paid_invoices: i64,
    pub total_pending_invoices: i64,
}

/// Dashboard user. `password` is a bcrypt hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Invoice to be written. `amount` is in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    /// Client-generated id. Re-inserting an existing id is a no-op.
    pub id: Option<Uuid>,
    pub customer_id: Uuid,
    pub amount: i64,
    pub status: InvoiceStatus,
    pub date: NaiveDate,
}

/// Data access for the dashboard pages and actions.
///
/// Implementations:
/// - `PostgresDashboardStore`: PostgreSQL through the query gateway
/// - `MockDashboardStore`: in-memory, for tests
#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// Customers ordered by name.
    async fn fetch_customers(&self) -> Result<Vec<CustomerField>>;

    /// Monthly revenue.
    async fn fetch_revenue(&self) -> Result<Vec<RevenueRow>>;

    /// The newest invoices with their customers.
    async fn fetch_latest_invoices(&self) -> Result<Vec<LatestInvoice>>;

    /// Customer and invoice counts, paid and pending totals.
    async fn fetch_card_data(&self) -> Result<CardData>;

    /// One page (1-based) of invoices matching `query`, newest first.
    async fn fetch_filtered_invoices(&self, query: &str, page: u64)
        -> Result<Vec<InvoiceSummary>>;

    /// Number of pages of invoices matching `query`.
    async fn fetch_invoice_pages(&self, query: &str) -> Result<u64>;

    /// Invoice for the edit form.
    async fn fetch_invoice_by_id(&self, id: Uuid) -> Result<Option<Invoice>>;

    /// Insert one invoice and return its id.
    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Uuid>;

    /// Insert every invoice or none of them. Returns rows inserted.
    async fn create_invoices(&self, invoices: Vec<NewInvoice>) -> Result<u64>;

    /// Update customer, amount and status. Returns whether the invoice existed.
    async fn update_invoice(&self, id: Uuid, invoice: NewInvoice) -> Result<bool>;

    /// Delete an invoice. Returns whether it existed.
    async fn delete_invoice(&self, id: Uuid) -> Result<bool>;

    /// User with the given email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Pages needed to show `total` items.
pub fn page_count(total: u64) -> u64 {
    total.div_ceil(ITEMS_PER_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!("pending".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Pending);
        assert_eq!("paid".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert!("overdue".parse::<InvoiceStatus>().is_err());
        assert!("Paid".parse::<InvoiceStatus>().is_err());
        assert_eq!(InvoiceStatus::Paid.to_string(), "paid");
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&InvoiceStatus::Pending).unwrap();
        assert_eq!(json, r#""pending""#);
    }

    #[test]
    fn test_amount_conversion() {
        assert_eq!(dollars_to_cents(157.95), 15795);
        assert_eq!(dollars_to_cents(100.0), 10000);
        assert_eq!(dollars_to_cents(0.1 + 0.2), 30);
        assert!((cents_to_dollars(15795) - 157.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(6), 1);
        assert_eq!(page_count(7), 2);
        assert_eq!(page_count(13), 3);
    }
}
