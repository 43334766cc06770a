// Library root: the auction ledger store, its settlement and migration
// engines, and the read-side reports.

pub mod db;
pub mod error;
pub mod migration;
pub mod model;
pub mod reporting;
pub mod settlement;

pub use db::Ledger;
pub use error::{LedgerError, Result};
