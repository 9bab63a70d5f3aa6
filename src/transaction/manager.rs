// ============================================================================
// Transaction Manager
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use super::{Transaction, TransactionId};
use crate::core::Result;
use crate::storage::InMemoryStorage;

/// Hands out transactions and publishes their changes to shared storage.
pub struct TransactionManager {
    storage: Arc<InMemoryStorage>,
}

impl TransactionManager {
    pub fn new(storage: Arc<InMemoryStorage>) -> Self {
        Self { storage }
    }

    pub async fn begin(&self) -> Transaction {
        let transaction = Transaction::new(TransactionId::next());
        debug!("began {}", transaction.id());
        transaction
    }

    /// Replays the transaction's changes on shared storage.
    ///
    /// Returns the time spent in storage. A failed replay aborts the
    /// transaction and leaves storage unchanged.
    pub async fn commit(&self, mut transaction: Transaction) -> Result<Duration> {
        let id = transaction.id();
        match self.storage.apply(transaction.changes()).await {
            Ok(elapsed) => {
                transaction.commit()?;
                debug!("committed {} with {} changes", id, transaction.change_count());
                Ok(elapsed)
            }
            Err(err) => {
                warn!("commit of {} failed: {}", id, err);
                transaction.rollback()?;
                Err(err)
            }
        }
    }

    pub async fn rollback(&self, mut transaction: Transaction) -> Result<()> {
        if transaction.is_active() {
            transaction.rollback()?;
        }
        debug!("rolled back {}", transaction.id());
        Ok(())
    }
}
