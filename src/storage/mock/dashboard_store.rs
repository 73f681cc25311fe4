//! In-memory dashboard store.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::gateway::QueryError;
use crate::storage::seed::{SEED_CUSTOMERS, SEED_INVOICES, SEED_REVENUE, SEED_USER};
use crate::storage::store::{
    cents_to_dollars, page_count, Result, ITEMS_PER_PAGE, LATEST_INVOICES,
};
use crate::storage::{
    CardData, CustomerField, DashboardStore, Invoice, InvoiceStatus, InvoiceSummary,
    LatestInvoice, NewInvoice, RevenueRow, StorageError, User,
};

#[derive(Debug, Clone)]
struct StoredCustomer {
    id: Uuid,
    name: String,
    email: String,
    image_url: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredInvoice {
    id: Uuid,
    customer_id: Uuid,
    amount: i64,
    status: InvoiceStatus,
    date: NaiveDate,
}

/// Mock dashboard store holding every table in memory.
///
/// Mirrors the PostgreSQL behavior that callers depend on: the customer
/// foreign key, all-or-nothing batch inserts and `ON CONFLICT DO NOTHING`
/// for invoices carrying an id.
#[derive(Default)]
pub struct MockDashboardStore {
    customers: RwLock<Vec<StoredCustomer>>,
    invoices: RwLock<Vec<StoredInvoice>>,
    revenue: RwLock<Vec<RevenueRow>>,
    users: RwLock<Vec<User>>,
    fail_on_read: RwLock<bool>,
    fail_on_write: RwLock<bool>,
}

impl MockDashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the dashboard seed rows.
    ///
    /// The seeded user gets `password_hash` as its stored password.
    pub async fn seeded(password_hash: &str) -> Self {
        let store = Self::new();
        for (id, name, email, image_url) in SEED_CUSTOMERS {
            store.add_customer(id, name, email, Some(image_url)).await;
        }
        {
            let mut invoices = store.invoices.write().await;
            for (id, customer_id, amount, status, date) in SEED_INVOICES {
                invoices.push(StoredInvoice {
                    id,
                    customer_id,
                    amount: i64::from(amount),
                    status: status.parse().unwrap_or(InvoiceStatus::Pending),
                    date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap_or(NaiveDate::MIN),
                });
            }
        }
        *store.revenue.write().await = SEED_REVENUE
            .iter()
            .map(|(month, revenue)| RevenueRow {
                month: month.to_string(),
                revenue: *revenue,
            })
            .collect();

        let (id, name, email) = SEED_USER;
        store
            .add_user(User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password: password_hash.to_string(),
            })
            .await;
        store
    }

    pub async fn add_customer(&self, id: Uuid, name: &str, email: &str, image_url: Option<&str>) {
        self.customers.write().await.push(StoredCustomer {
            id,
            name: name.to_string(),
            email: email.to_string(),
            image_url: image_url.map(str::to_string),
        });
    }

    pub async fn add_user(&self, user: User) {
        self.users.write().await.push(user);
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    /// Number of stored invoices.
    pub async fn invoice_count(&self) -> usize {
        self.invoices.read().await.len()
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Unavailable("mock read failure".to_string()).into());
        }
        Ok(())
    }

    async fn check_write(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Unavailable("mock write failure".to_string()).into());
        }
        Ok(())
    }

    async fn check_customers(&self, invoices: &[NewInvoice]) -> Result<()> {
        let customers = self.customers.read().await;
        for invoice in invoices {
            if !customers.iter().any(|c| c.id == invoice.customer_id) {
                return Err(foreign_key_violation(invoice.customer_id));
            }
        }
        Ok(())
    }

    async fn filtered(&self, query: &str) -> Vec<InvoiceSummary> {
        let needle = query.to_lowercase();
        let customers = self.customers.read().await;
        let invoices = self.invoices.read().await;

        let mut rows: Vec<InvoiceSummary> = invoices
            .iter()
            .filter_map(|invoice| {
                let customer = customers.iter().find(|c| c.id == invoice.customer_id)?;
                Some(InvoiceSummary {
                    id: invoice.id,
                    customer_id: invoice.customer_id,
                    name: customer.name.clone(),
                    email: customer.email.clone(),
                    image_url: customer.image_url.clone(),
                    date: invoice.date,
                    amount: invoice.amount,
                    status: invoice.status,
                })
            })
            .filter(|row| {
                [
                    row.name.to_lowercase(),
                    row.email.to_lowercase(),
                    row.status.to_string(),
                    row.amount.to_string(),
                    row.date.to_string(),
                ]
                .iter()
                .any(|field| field.contains(&needle))
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }
}

fn foreign_key_violation(customer_id: Uuid) -> QueryError {
    StorageError::ConstraintViolation(format!(
        "insert or update on table \"invoices\" violates foreign key constraint: \
         customer {} does not exist",
        customer_id
    ))
    .into()
}

#[async_trait]
impl DashboardStore for MockDashboardStore {
    async fn fetch_customers(&self) -> Result<Vec<CustomerField>> {
        self.check_read().await?;
        let mut customers: Vec<_> = self
            .customers
            .read()
            .await
            .iter()
            .map(|c| CustomerField {
                id: c.id,
                name: c.name.clone(),
            })
            .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn fetch_revenue(&self) -> Result<Vec<RevenueRow>> {
        self.check_read().await?;
        Ok(self.revenue.read().await.clone())
    }

    async fn fetch_latest_invoices(&self) -> Result<Vec<LatestInvoice>> {
        self.check_read().await?;
        Ok(self
            .filtered("")
            .await
            .into_iter()
            .take(LATEST_INVOICES as usize)
            .map(|row| LatestInvoice {
                id: row.id,
                name: row.name,
                email: row.email,
                image_url: row.image_url,
                amount: row.amount,
            })
            .collect())
    }

    async fn fetch_card_data(&self) -> Result<CardData> {
        self.check_read().await?;
        let invoices = self.invoices.read().await;
        let total = |status: InvoiceStatus| {
            invoices
                .iter()
                .filter(|i| i.status == status)
                .map(|i| i.amount)
                .sum::<i64>()
        };
        Ok(CardData {
            number_of_customers: self.customers.read().await.len() as i64,
            number_of_invoices: invoices.len() as i64,
            total_paid_invoices: total(InvoiceStatus::Paid),
            total_pending_invoices: total(InvoiceStatus::Pending),
        })
    }

    async fn fetch_filtered_invoices(
        &self,
        query: &str,
        page: u64,
    ) -> Result<Vec<InvoiceSummary>> {
        self.check_read().await?;
        let offset = page.saturating_sub(1) * ITEMS_PER_PAGE;
        Ok(self
            .filtered(query)
            .await
            .into_iter()
            .skip(offset as usize)
            .take(ITEMS_PER_PAGE as usize)
            .collect())
    }

    async fn fetch_invoice_pages(&self, query: &str) -> Result<u64> {
        self.check_read().await?;
        Ok(page_count(self.filtered(query).await.len() as u64))
    }

    async fn fetch_invoice_by_id(&self, id: Uuid) -> Result<Option<Invoice>> {
        self.check_read().await?;
        Ok(self
            .invoices
            .read()
            .await
            .iter()
            .find(|i| i.id == id)
            .map(|i| Invoice {
                id: i.id,
                customer_id: i.customer_id,
                amount: cents_to_dollars(i.amount),
                status: i.status,
            }))
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Uuid> {
        self.check_write().await?;
        self.check_customers(std::slice::from_ref(&invoice)).await?;

        let id = invoice.id.unwrap_or_else(Uuid::new_v4);
        let mut invoices = self.invoices.write().await;
        if !invoices.iter().any(|i| i.id == id) {
            invoices.push(StoredInvoice {
                id,
                customer_id: invoice.customer_id,
                amount: invoice.amount,
                status: invoice.status,
                date: invoice.date,
            });
        }
        Ok(id)
    }

    async fn create_invoices(&self, batch: Vec<NewInvoice>) -> Result<u64> {
        self.check_write().await?;
        self.check_customers(&batch).await?;

        let mut invoices = self.invoices.write().await;
        let mut seen: HashSet<Uuid> = invoices.iter().map(|i| i.id).collect();
        let mut inserted = 0;
        for invoice in batch {
            let id = invoice.id.unwrap_or_else(Uuid::new_v4);
            if !seen.insert(id) {
                continue;
            }
            invoices.push(StoredInvoice {
                id,
                customer_id: invoice.customer_id,
                amount: invoice.amount,
                status: invoice.status,
                date: invoice.date,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn update_invoice(&self, id: Uuid, invoice: NewInvoice) -> Result<bool> {
        self.check_write().await?;
        self.check_customers(std::slice::from_ref(&invoice)).await?;

        let mut invoices = self.invoices.write().await;
        match invoices.iter_mut().find(|i| i.id == id) {
            Some(stored) => {
                stored.customer_id = invoice.customer_id;
                stored.amount = invoice.amount;
                stored.status = invoice.status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<bool> {
        self.check_write().await?;
        let mut invoices = self.invoices.write().await;
        let before = invoices.len();
        invoices.retain(|i| i.id != id);
        Ok(invoices.len() < before)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.check_read().await?;
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}
