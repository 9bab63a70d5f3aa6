// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Each Change is one statement produced by a session flush. Changes are
// applied to the transaction's staged view at flush time and replayed on
// shared storage at commit.
//
// ============================================================================

use crate::entity::{Entity, EntityKind, naming};
use crate::storage::BulkDelete;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub enum Change {
    /// Insert one row, or several rows of the same kind as one bulk statement
    Insert { kind: EntityKind, entities: Vec<Entity> },

    /// Replace a row; `entity` already carries the incremented revision
    Update { entity: Entity, expected_revision: i32 },

    /// Delete a single row
    Delete {
        kind: EntityKind,
        id: String,
        expected_revision: i32,
    },

    /// Delete every row matching a foreign key
    BulkDelete(BulkDelete),
}

impl Change {
    pub fn kind(&self) -> EntityKind {
        match self {
            Change::Insert { kind, .. } => *kind,
            Change::Update { entity, .. } => entity.kind(),
            Change::Delete { kind, .. } => *kind,
            Change::BulkDelete(statement) => statement.kind(),
        }
    }

    pub fn statement_kind(&self) -> StatementKind {
        match self {
            Change::Insert { .. } => StatementKind::Insert,
            Change::Update { .. } => StatementKind::Update,
            Change::Delete { .. } | Change::BulkDelete(_) => StatementKind::Delete,
        }
    }

    /// The profiling key of the statement.
    pub fn statement_key(&self) -> String {
        match self {
            Change::Insert { kind, entities } => naming::insert_key(*kind, entities.len()),
            Change::Update { entity, .. } => entity.kind().qualified_name(),
            Change::Delete { kind, .. } => kind.qualified_name(),
            Change::BulkDelete(statement) => statement.key(),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Change::Insert { entities, .. } => entities.len(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_delete_key() {
        let change = Change::BulkDelete(BulkDelete::ActivityInstancesByProcessInstanceId(
            "pi".into(),
        ));
        assert_eq!(change.kind(), EntityKind::ActivityInstance);
        assert_eq!(change.statement_kind(), StatementKind::Delete);
        assert_eq!(
            change.statement_key(),
            "Bulk-delete-deleteActivityInstancesByProcessInstanceId"
        );
    }

    #[test]
    fn test_single_row_delete_key() {
        let change = Change::Delete {
            kind: EntityKind::TimerJob,
            id: "j".into(),
            expected_revision: 1,
        };
        assert_eq!(
            change.statement_key(),
            "org.flowable.job.service.impl.persistence.entity.TimerJobEntityImpl"
        );
    }
}
