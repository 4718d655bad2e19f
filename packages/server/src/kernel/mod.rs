//! Kernel - dependency container, trait abstractions, and the adapters
//! that implement them against PostgreSQL and the verification provider.

pub mod deps;
pub mod dispatch;
pub mod search_console;
pub mod stores;
pub mod test_dependencies;
pub mod traits;

pub use deps::{AdmissionPolicy, ServerDeps};
pub use dispatch::{DispatchMessage, PostgresDispatchQueue};
pub use search_console::SearchConsoleClient;
pub use stores::{PostgresAccountStore, PostgresJobStore};
pub use traits::{BaseAccountStore, BaseDispatchQueue, BaseJobStore, BaseSiteVerifier};
