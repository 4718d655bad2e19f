pub mod user;

pub use user::{DebitOutcome, User};
