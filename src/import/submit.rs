//! Batch submission of validated invoices.

use reqwest::{Client, StatusCode};
use tracing::{debug, error, info};

use super::UploadedInvoice;
use crate::config::ImportConfig;
use crate::storage::CustomerField;

/// Message shown to the operator after a successful submission.
pub const SUBMIT_SUCCESS: &str = "Invoices submitted successfully!";

/// Message shown to the operator after a failed submission.
pub const SUBMIT_FAILURE: &str = "Failed to submit invoices. Please try again.";

/// Message shown to the operator when the file holds no invoices.
pub const NO_INVOICES: &str = "No invoices to submit.";

/// Longest response body excerpt kept in errors and logs.
const BODY_EXCERPT: usize = 200;

/// Errors from talking to the invoice endpoints.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Request failed: {0}")]
    Network(String),

    #[error("Endpoint rejected the request: HTTP {status} - {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("Encoding error: {0}")]
    Encode(String),
}

impl SubmissionError {
    /// Summary suitable for the operator, without internal detail.
    pub fn user_message(&self) -> &'static str {
        SUBMIT_FAILURE
    }
}

impl From<reqwest::Error> for SubmissionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SubmissionError::Encode(err.to_string())
        } else {
            SubmissionError::Network(err.to_string())
        }
    }
}

/// Client for the invoice write endpoint.
///
/// Sends the whole batch in one request and never retries: a failed batch
/// is reported to the operator as a unit.
pub struct InvoiceSubmitter {
    client: Client,
    endpoint: String,
    customers_endpoint: String,
}

impl InvoiceSubmitter {
    pub fn new(config: &ImportConfig) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            customers_endpoint: config.customers_endpoint.clone(),
        })
    }

    /// Post the validated invoices as a single JSON array.
    ///
    /// An empty batch is not sent.
    pub async fn submit(&self, invoices: &[UploadedInvoice]) -> Result<(), SubmissionError> {
        if invoices.is_empty() {
            debug!(endpoint = %self.endpoint, "Empty batch, nothing submitted");
            return Ok(());
        }

        let body =
            serde_json::to_vec(invoices).map_err(|e| SubmissionError::Encode(e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(
                endpoint = %self.endpoint,
                count = invoices.len(),
                "Invoices submitted"
            );
            return Ok(());
        }

        let body = excerpt(&response.text().await.unwrap_or_default());
        error!(
            endpoint = %self.endpoint,
            status = %status,
            body = %body,
            "Invoice submission rejected"
        );
        Err(SubmissionError::Rejected { status, body })
    }

    /// Fetch the customers the import file may refer to.
    pub async fn known_customers(&self) -> Result<Vec<CustomerField>, SubmissionError> {
        let response = self.client.get(&self.customers_endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = excerpt(&response.text().await.unwrap_or_default());
            error!(
                endpoint = %self.customers_endpoint,
                status = %status,
                "Customer list request failed"
            );
            return Err(SubmissionError::Rejected { status, body });
        }

        let customers: Vec<CustomerField> = response.json().await?;
        debug!(count = customers.len(), "Fetched known customers");
        Ok(customers)
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT).collect()
}
