// ============================================================================
// Transaction State Management
// ============================================================================
//
// State transitions follow Active -> Committed/Aborted. Flushed changes go
// into a staged copy of the tables that only this transaction reads.
//
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Change;
use crate::core::{EngineError, Result};
use crate::storage::Tables;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// `Active` until committed or aborted; both are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// A unit-of-work transaction.
///
/// Owned by exactly one session; never shared between commands.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,

    /// Private copy of the tables with every flushed change applied.
    /// Created at the first flush.
    staged: Option<Tables>,

    changes: Vec<Change>,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            staged: None,
            changes: Vec::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    pub fn staged(&self) -> Option<&Tables> {
        self.staged.as_ref()
    }

    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    fn ensure_active(&self, action: &str) -> Result<()> {
        if !self.is_active() {
            return Err(EngineError::IllegalState(format!(
                "Cannot {}: transaction {} is {}",
                action, self.id, self.state
            )));
        }
        Ok(())
    }

    /// Applies `changes` to the staged view and records them.
    ///
    /// `base` is the committed state, required when nothing was staged yet.
    /// On error the staged view and the recorded changes are left untouched.
    pub fn stage(&mut self, base: Option<Tables>, changes: Vec<Change>) -> Result<()> {
        self.ensure_active("stage changes")?;

        let mut next = match (&self.staged, base) {
            (Some(tables), _) => tables.clone(),
            (None, Some(base)) => base,
            (None, None) => {
                return Err(EngineError::IllegalState(format!(
                    "transaction {} has no base snapshot to stage on",
                    self.id
                )));
            }
        };
        for change in &changes {
            next.apply(change)?;
        }
        self.staged = Some(next);
        self.changes.extend(changes);
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active("commit")?;
        self.state = TransactionState::Committed;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_active("rollback")?;
        self.changes.clear();
        self.staged = None;
        self.state = TransactionState::Aborted;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityKind, TaskCounts, TaskEntity};
    use chrono::Utc;

    fn insert_task(id: &str) -> Change {
        Change::Insert {
            kind: EntityKind::Task,
            entities: vec![Entity::Task(TaskEntity {
                id: id.into(),
                revision: 1,
                name: None,
                task_definition_key: None,
                execution_id: None,
                process_instance_id: None,
                process_definition_id: None,
                assignee: None,
                owner: None,
                claim_time: None,
                create_time: Utc::now(),
                suspended: false,
                counts: TaskCounts::new(true),
            })],
        }
    }

    #[test]
    fn test_transaction_lifecycle() {
        let mut txn = Transaction::new(TransactionId::next());

        assert!(txn.is_active());
        assert_ne!(TransactionId::next(), txn.id());

        txn.commit().unwrap();
        assert_eq!(txn.state(), TransactionState::Committed);
        assert!(txn.commit().is_err());
    }

    #[test]
    fn test_stage_is_visible_to_the_transaction_only() {
        let mut txn = Transaction::new(TransactionId::next());
        txn.stage(Some(Tables::default()), vec![insert_task("t1")]).unwrap();

        assert_eq!(txn.change_count(), 1);
        assert!(txn.staged().unwrap().contains(EntityKind::Task, "t1"));
    }

    #[test]
    fn test_failed_stage_keeps_previous_state() {
        let mut txn = Transaction::new(TransactionId::next());
        txn.stage(Some(Tables::default()), vec![insert_task("t1")]).unwrap();

        let err = txn.stage(Some(Tables::default()), vec![insert_task("t2"), insert_task("t1")]);
        assert!(err.is_err());
        assert_eq!(txn.change_count(), 1);
        assert!(!txn.staged().unwrap().contains(EntityKind::Task, "t2"));
    }

    #[test]
    fn test_rollback_clears_changes() {
        let mut txn = Transaction::new(TransactionId::next());
        txn.stage(Some(Tables::default()), vec![insert_task("t1")]).unwrap();

        txn.rollback().unwrap();
        assert_eq!(txn.change_count(), 0);
        assert!(!txn.is_staged());
        assert_eq!(txn.state(), TransactionState::Aborted);
        assert!(txn.stage(Some(Tables::default()), vec![]).is_err());
    }
}
