//! Ledgerdash - invoice dashboard backend
//!
//! Serves the data behind an invoice dashboard from PostgreSQL. The schema
//! and seed data are created lazily on first use, every query goes through a
//! gateway that waits for that bootstrap, and invoices can be imported in
//! bulk from JSON files.

pub mod auth;
pub mod bootstrap;
pub mod communications;
pub mod config;
pub mod forms;
pub mod gateway;
pub mod handlers;
pub mod import;
pub mod storage;
pub mod utils;
