pub mod dashboard;
pub mod health;
pub mod indexing;
pub mod sites;

pub use dashboard::{dashboard_handler, refill_handler};
pub use health::health_handler;
pub use indexing::{logs_handler, recent_handler, submit_handler};
pub use sites::{saved_status_handler, verify_access_handler};
