//! Mock storage implementations for testing.

mod catalog;
mod dashboard_store;

pub use catalog::MockCatalog;
pub use dashboard_store::MockDashboardStore;
