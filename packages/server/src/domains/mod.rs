//! Domain logic, grouped by bounded context.

pub mod accounts;
pub mod indexing;
