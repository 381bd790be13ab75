//! Storage layer for ledger snapshots.
//!
//! - [`ledger_file`] — versioned JSON snapshot of the in-memory ledger.

pub mod ledger_file;

pub use ledger_file::{load_ledger, load_or_create, save_ledger};
