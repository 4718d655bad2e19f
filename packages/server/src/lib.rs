//! IndexBeam API server library.
//!
//! The crate is organized in three layers:
//! - `server` - axum application assembly, routes, and middleware
//! - `kernel` - dependency container and trait abstractions for storage,
//!   dispatch, and the site-verification provider
//! - `domains` - the admission, ingestion, and aggregation logic itself

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::Config;
