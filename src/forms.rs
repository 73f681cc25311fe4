//! Server-side invoice form actions.
//!
//! Validates the create and edit invoice forms and applies them to the
//! store. Failures come back as a [`FormState`] carrying per-field messages
//! and a summary, ready to be rendered next to the form.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::storage::store::dollars_to_cents;
use crate::storage::{DashboardStore, InvoiceStatus, NewInvoice};

pub const SELECT_CUSTOMER: &str = "Please select a customer.";
pub const AMOUNT_POSITIVE: &str = "Please enter an amount greater than $0.";
pub const SELECT_STATUS: &str = "Please select an invoice status.";

/// Which action a form submission performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Create,
    Update,
    Delete,
}

impl FormAction {
    fn verb(&self) -> &'static str {
        match self {
            FormAction::Create => "Create",
            FormAction::Update => "Update",
            FormAction::Delete => "Delete",
        }
    }

    fn missing_fields(&self) -> String {
        format!("Missing Fields. Failed to {} Invoice.", self.verb())
    }

    fn database_error(&self) -> String {
        format!("Database Error: Failed to {} Invoice.", self.verb())
    }
}

/// Raw invoice form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceForm {
    pub customer_id: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
}

/// Validation messages per form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customer_id: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub amount: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_empty() && self.amount.is_empty() && self.status.is_empty()
    }
}

/// Outcome of a rejected form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    pub message: Option<String>,
    pub errors: FieldErrors,
}

impl FormState {
    fn message(message: String) -> Self {
        Self {
            message: Some(message),
            errors: FieldErrors::default(),
        }
    }

    /// Whether the failure came from storage rather than the user's input.
    pub fn is_database_error(&self) -> bool {
        self.errors.is_empty()
            && self
                .message
                .as_deref()
                .is_some_and(|m| m.starts_with("Database Error"))
    }
}

/// A form that passed validation. `amount` is in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInvoice {
    pub customer_id: Uuid,
    pub amount: i64,
    pub status: InvoiceStatus,
}

impl ValidatedInvoice {
    fn into_new(self, id: Option<Uuid>) -> NewInvoice {
        NewInvoice {
            id,
            customer_id: self.customer_id,
            amount: self.amount,
            status: self.status,
            date: Utc::now().date_naive(),
        }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validate an invoice form, collecting every field error.
pub fn validate(form: &InvoiceForm, action: FormAction) -> Result<ValidatedInvoice, FormState> {
    let mut errors = FieldErrors::default();

    let customer_id = present(&form.customer_id).and_then(|s| Uuid::parse_str(s).ok());
    if customer_id.is_none() {
        errors.customer_id.push(SELECT_CUSTOMER.to_string());
    }

    let amount = present(&form.amount)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|a| a.is_finite())
        .map(dollars_to_cents)
        .filter(|cents| *cents > 0);
    if amount.is_none() {
        errors.amount.push(AMOUNT_POSITIVE.to_string());
    }

    let status = present(&form.status).and_then(|s| s.parse::<InvoiceStatus>().ok());
    if status.is_none() {
        errors.status.push(SELECT_STATUS.to_string());
    }

    match (customer_id, amount, status) {
        (Some(customer_id), Some(amount), Some(status)) => Ok(ValidatedInvoice {
            customer_id,
            amount,
            status,
        }),
        _ => Err(FormState {
            message: Some(action.missing_fields()),
            errors,
        }),
    }
}

/// Create an invoice from the form. Returns the new invoice id.
pub async fn create_invoice(
    store: &dyn DashboardStore,
    form: &InvoiceForm,
) -> Result<Uuid, FormState> {
    let action = FormAction::Create;
    let invoice = validate(form, action)?;

    store
        .create_invoice(invoice.into_new(None))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create invoice");
            FormState::message(action.database_error())
        })
}

/// Apply the edit form to an existing invoice.
///
/// Returns `Ok(false)` when the invoice does not exist.
pub async fn update_invoice(
    store: &dyn DashboardStore,
    id: Uuid,
    form: &InvoiceForm,
) -> Result<bool, FormState> {
    let action = FormAction::Update;
    let invoice = validate(form, action)?;

    store
        .update_invoice(id, invoice.into_new(Some(id)))
        .await
        .map_err(|e| {
            error!(error = %e, invoice = %id, "Failed to update invoice");
            FormState::message(action.database_error())
        })
}

/// Delete an invoice. Returns `Ok(false)` when it did not exist.
pub async fn delete_invoice(store: &dyn DashboardStore, id: Uuid) -> Result<bool, FormState> {
    store.delete_invoice(id).await.map_err(|e| {
        error!(error = %e, invoice = %id, "Failed to delete invoice");
        FormState::message(FormAction::Delete.database_error())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MockDashboardStore;
    use crate::storage::seed::SEED_CUSTOMERS;

    fn form(customer_id: &str, amount: &str, status: &str) -> InvoiceForm {
        InvoiceForm {
            customer_id: Some(customer_id.to_string()),
            amount: Some(amount.to_string()),
            status: Some(status.to_string()),
        }
    }

    fn evil_rabbit() -> String {
        SEED_CUSTOMERS[0].0.to_string()
    }

    #[test]
    fn test_validate_converts_dollars_to_cents() {
        let invoice = validate(&form(&evil_rabbit(), "157.95", "pending"), FormAction::Create)
            .unwrap();
        assert_eq!(invoice.amount, 15795);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
    }

    #[test]
    fn test_validate_collects_every_error() {
        let state = validate(&InvoiceForm::default(), FormAction::Create).unwrap_err();

        assert_eq!(
            state.message.as_deref(),
            Some("Missing Fields. Failed to Create Invoice.")
        );
        assert_eq!(state.errors.customer_id, vec![SELECT_CUSTOMER]);
        assert_eq!(state.errors.amount, vec![AMOUNT_POSITIVE]);
        assert_eq!(state.errors.status, vec![SELECT_STATUS]);
    }

    #[test]
    fn test_validate_rejects_zero_and_garbage_amounts() {
        for amount in ["0", "-5", "abc", "NaN", "", "0.004"] {
            let state = validate(&form(&evil_rabbit(), amount, "paid"), FormAction::Update)
                .unwrap_err();
            assert_eq!(state.errors.amount, vec![AMOUNT_POSITIVE], "{}", amount);
            assert!(state.errors.customer_id.is_empty());
            assert_eq!(
                state.message.as_deref(),
                Some("Missing Fields. Failed to Update Invoice.")
            );
        }
    }

    #[test]
    fn test_validate_accepts_one_cent() {
        let invoice = validate(&form(&evil_rabbit(), "0.01", "paid"), FormAction::Create)
            .unwrap();
        assert_eq!(invoice.amount, 1);
    }

    #[test]
    fn test_form_state_serializes_camel_case() {
        let state = validate(&form("", "10", "paid"), FormAction::Create).unwrap_err();
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["errors"]["customerId"][0], SELECT_CUSTOMER);
        assert!(json["errors"].get("amount").is_none());
    }

    #[tokio::test]
    async fn test_create_invoice_stores_cents() {
        let store = MockDashboardStore::seeded("hash").await;

        let id = create_invoice(&store, &form(&evil_rabbit(), "12.34", "paid"))
            .await
            .unwrap();

        let invoice = store.fetch_invoice_by_id(id).await.unwrap().unwrap();
        assert!((invoice.amount - 12.34).abs() < 1e-9);
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_create_invoice_database_error() {
        let store = MockDashboardStore::seeded("hash").await;
        store.set_fail_on_write(true).await;

        let state = create_invoice(&store, &form(&evil_rabbit(), "1", "paid"))
            .await
            .unwrap_err();

        assert_eq!(
            state.message.as_deref(),
            Some("Database Error: Failed to Create Invoice.")
        );
        assert!(state.is_database_error());
    }

    #[tokio::test]
    async fn test_update_missing_invoice() {
        let store = MockDashboardStore::seeded("hash").await;
        let updated = update_invoice(&store, Uuid::new_v4(), &form(&evil_rabbit(), "1", "paid"))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_delete_database_error() {
        let store = MockDashboardStore::seeded("hash").await;
        store.set_fail_on_write(true).await;

        let state = delete_invoice(&store, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(
            state.message.as_deref(),
            Some("Database Error: Failed to Delete Invoice.")
        );
    }
}
