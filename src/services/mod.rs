//! Gateway services over the ledger client

pub mod query;
pub mod write;

pub use query::{QueryFailed, QueryService};
pub use write::{Submission, WriteError, WriteService};
