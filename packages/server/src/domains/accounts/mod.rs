//! Accounts domain - the credit and authorization subject.

pub mod models;

pub use models::{DebitOutcome, User};
