pub mod memory;
pub mod store;

pub use memory::{SnapshotStore, SnapshotTx};
pub use store::StoreError;
