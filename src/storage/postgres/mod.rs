//! PostgreSQL implementation of the dashboard store.
//!
//! Every query goes through the [`QueryGateway`], so the schema bootstrap
//! always completes before the first statement reaches the database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::gateway::{PgExecutor, QueryError, QueryGateway};
use crate::storage::schema::{Customers, Invoices};
use crate::storage::store::{cents_to_dollars, page_count, Result};
use crate::storage::{
    CardData, CustomerField, DashboardStore, Invoice, InvoiceStatus, InvoiceSummary,
    LatestInvoice, NewInvoice, RevenueRow, Statement, StorageError, User,
};

mod queries;

#[cfg(test)]
mod tests;

/// PostgreSQL implementation of DashboardStore.
pub struct PostgresDashboardStore {
    gateway: Arc<QueryGateway<PgExecutor>>,
}

impl PostgresDashboardStore {
    pub fn new(gateway: Arc<QueryGateway<PgExecutor>>) -> Self {
        Self { gateway }
    }

    async fn count(&self, statement: Statement) -> Result<i64> {
        let row = self
            .gateway
            .fetch_optional(statement)
            .await?
            .ok_or_else(|| QueryError::Decode("count returned no rows".to_string()))?;
        Ok(row.try_get::<i64, _>(queries::TOTAL)?)
    }
}

fn status(row: &PgRow) -> Result<InvoiceStatus> {
    let raw: String = row.try_get("status")?;
    raw.parse().map_err(QueryError::Decode)
}

/// Amounts are stored as INTEGER cents.
fn stored_amount(invoice: &NewInvoice) -> Result<i32> {
    i32::try_from(invoice.amount).map_err(|_| {
        QueryError::Storage(StorageError::Database(format!(
            "invoice amount {} out of range",
            invoice.amount
        )))
    })
}

#[async_trait]
impl DashboardStore for PostgresDashboardStore {
    async fn fetch_customers(&self) -> Result<Vec<CustomerField>> {
        let rows = self.gateway.fetch(queries::customers()).await?;
        rows.iter()
            .map(|row| -> Result<CustomerField> {
                Ok(CustomerField {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn fetch_revenue(&self) -> Result<Vec<RevenueRow>> {
        let rows = self.gateway.fetch(queries::revenue()).await?;
        rows.iter()
            .map(|row| -> Result<RevenueRow> {
                Ok(RevenueRow {
                    month: row.try_get("month")?,
                    revenue: row.try_get("revenue")?,
                })
            })
            .collect()
    }

    async fn fetch_latest_invoices(&self) -> Result<Vec<LatestInvoice>> {
        let rows = self.gateway.fetch(queries::latest_invoices()).await?;
        rows.iter()
            .map(|row| -> Result<LatestInvoice> {
                Ok(LatestInvoice {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    image_url: row.try_get("image_url")?,
                    amount: i64::from(row.try_get::<i32, _>("amount")?),
                })
            })
            .collect()
    }

    async fn fetch_card_data(&self) -> Result<CardData> {
        let (customers, invoices, totals) = tokio::try_join!(
            self.count(queries::count(Customers::Table)),
            self.count(queries::count(Invoices::Table)),
            self.gateway.fetch_optional(queries::invoice_totals()),
        )?;

        let (paid, pending) = match totals {
            Some(row) => (
                row.try_get::<i64, _>(queries::PAID_TOTAL)?,
                row.try_get::<i64, _>(queries::PENDING_TOTAL)?,
            ),
            None => (0, 0),
        };

        Ok(CardData {
            number_of_customers: customers,
            number_of_invoices: invoices,
            total_paid_invoices: paid,
            total_pending_invoices: pending,
        })
    }

    async fn fetch_filtered_invoices(
        &self,
        query: &str,
        page: u64,
    ) -> Result<Vec<InvoiceSummary>> {
        let rows = self
            .gateway
            .fetch(queries::filtered_invoices(query, page))
            .await?;
        rows.iter()
            .map(|row| -> Result<InvoiceSummary> {
                Ok(InvoiceSummary {
                    id: row.try_get("id")?,
                    customer_id: row.try_get("customer_id")?,
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    image_url: row.try_get("image_url")?,
                    date: row.try_get::<NaiveDate, _>("date")?,
                    amount: i64::from(row.try_get::<i32, _>("amount")?),
                    status: status(row)?,
                })
            })
            .collect()
    }

    async fn fetch_invoice_pages(&self, query: &str) -> Result<u64> {
        let total = self.count(queries::filtered_count(query)).await?;
        Ok(page_count(total.max(0) as u64))
    }

    async fn fetch_invoice_by_id(&self, id: Uuid) -> Result<Option<Invoice>> {
        let row = self.gateway.fetch_optional(queries::invoice_by_id(id)).await?;
        row.map(|row| -> Result<Invoice> {
            Ok(Invoice {
                id: row.try_get("id")?,
                customer_id: row.try_get("customer_id")?,
                amount: cents_to_dollars(i64::from(row.try_get::<i32, _>("amount")?)),
                status: status(&row)?,
            })
        })
        .transpose()
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Uuid> {
        let id = invoice.id.unwrap_or_else(Uuid::new_v4);
        let amount = stored_amount(&invoice)?;
        self.gateway
            .run(queries::insert_invoice(id, &invoice, amount))
            .await?;
        Ok(id)
    }

    async fn create_invoices(&self, invoices: Vec<NewInvoice>) -> Result<u64> {
        if invoices.is_empty() {
            return Ok(0);
        }

        let statements = invoices
            .iter()
            .map(|invoice| -> Result<_> {
                let id = invoice.id.unwrap_or_else(Uuid::new_v4);
                Ok(queries::insert_invoice(id, invoice, stored_amount(invoice)?))
            })
            .collect::<Result<Vec<Statement>>>()?;

        self.gateway.run_atomic(statements).await
    }

    async fn update_invoice(&self, id: Uuid, invoice: NewInvoice) -> Result<bool> {
        let amount = stored_amount(&invoice)?;
        let updated = self
            .gateway
            .run(queries::update_invoice(id, &invoice, amount))
            .await?;
        Ok(updated > 0)
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<bool> {
        let deleted = self.gateway.run(queries::delete_invoice(id)).await?;
        Ok(deleted > 0)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = self
            .gateway
            .fetch_optional(queries::user_by_email(email))
            .await?;
        row.map(|row| -> Result<User> {
            Ok(User {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                password: row.try_get("password")?,
            })
        })
        .transpose()
    }
}
