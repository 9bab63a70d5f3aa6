//! One transaction per command.
//!
//! Flushes are staged in a private copy of the tables. Commit replays the
//! recorded changes on shared storage, where revision checks detect
//! concurrent modification.

pub mod change;
pub mod manager;
pub mod state;

pub use change::{Change, StatementKind};
pub use manager::TransactionManager;
pub use state::{Transaction, TransactionId, TransactionState};
