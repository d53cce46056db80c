pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::LedgerError;
pub use models::*;
pub use router::ledger_routes;
pub use store::{LedgerStore, MemoryLedgerStore};
