//! Bulk invoice import.
//!
//! [`validate`] turns an uploaded JSON file into typed invoices, resolving
//! customer names against the known customers. Validation is all or nothing:
//! the first bad record rejects the whole file. [`InvoiceSubmitter`] then
//! posts the validated batch to the invoice write endpoint in one request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::storage::{CustomerField, InvoiceStatus};

mod submit;

pub use submit::{
    InvoiceSubmitter, SubmissionError, NO_INVOICES, SUBMIT_FAILURE, SUBMIT_SUCCESS,
};

/// Message shown to the operator when a file fails validation.
pub const UPLOAD_FAILURE: &str = "Failed to upload invoices. Please check the file format.";

/// Invoice produced from one uploaded record, ready to submit.
///
/// `amount` is in dollars, as in the uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedInvoice {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub amount: f64,
    pub status: InvoiceStatus,
}

/// Reasons an uploaded file is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid JSON format. Expected an array of invoices: {0}")]
    MalformedInput(String),

    #[error("Customer {name} not found! (record {index})")]
    UnknownCustomer { index: usize, name: String },

    #[error("Invalid invoice data format: record {index} field '{field}' {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// Summary suitable for the operator.
    pub fn user_message(&self) -> &'static str {
        UPLOAD_FAILURE
    }
}

/// Validate an uploaded invoice file.
///
/// The file must be a JSON array of `{customerName, amount, status}`
/// records. Each record's `customerName` must exactly match a known
/// customer, `amount` must be a number and `status` one of `pending` or
/// `paid`. The amount range is left to the write endpoint. Every accepted
/// record gets a fresh id.
pub fn validate(
    contents: &[u8],
    known_customers: &[CustomerField],
) -> Result<Vec<UploadedInvoice>, ValidationError> {
    let document: Value = serde_json::from_slice(contents)
        .map_err(|e| ValidationError::MalformedInput(e.to_string()))?;

    let records = document
        .as_array()
        .ok_or_else(|| ValidationError::MalformedInput("top level is not an array".to_string()))?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| validate_record(index, record, known_customers))
        .collect()
}

fn validate_record(
    index: usize,
    record: &Value,
    known_customers: &[CustomerField],
) -> Result<UploadedInvoice, ValidationError> {
    let record = record.as_object().ok_or_else(|| {
        ValidationError::MalformedInput(format!("record {} is not an object", index))
    })?;

    let name = match record.get("customerName") {
        Some(Value::String(name)) => name,
        Some(_) => {
            return Err(ValidationError::InvalidField {
                index,
                field: "customerName",
                reason: "must be a string".to_string(),
            })
        }
        None => {
            return Err(ValidationError::InvalidField {
                index,
                field: "customerName",
                reason: "is missing".to_string(),
            })
        }
    };
    let customer = known_customers
        .iter()
        .find(|c| c.name == *name)
        .ok_or_else(|| ValidationError::UnknownCustomer {
            index,
            name: name.clone(),
        })?;

    let amount = record
        .get("amount")
        .and_then(Value::as_f64)
        .ok_or_else(|| ValidationError::InvalidField {
            index,
            field: "amount",
            reason: "must be a number".to_string(),
        })?;

    let status = record
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<InvoiceStatus>().ok())
        .ok_or_else(|| ValidationError::InvalidField {
            index,
            field: "status",
            reason: "must be \"pending\" or \"paid\"".to_string(),
        })?;

    Ok(UploadedInvoice {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        amount,
        status,
    })
}
