use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::constraints::{foreign_keys, referencing_kinds};
use super::query::{BulkDelete, EntityQuery};
use crate::core::{EngineError, Result};
use crate::entity::{Entity, EntityKind};
use crate::transaction::Change;

#[derive(Debug, Clone)]
struct StoredRow {
    seq: u64,
    entity: Entity,
}

type Table = im::HashMap<String, StoredRow>;

/// A complete, cheaply clonable copy of every table.
///
/// Rows keep the sequence number of their first insert so scans return them
/// in a stable order.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    tables: im::HashMap<EntityKind, Table>,
    next_seq: u64,
}

impl Tables {
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Entity> {
        self.tables
            .get(&kind)
            .and_then(|table| table.get(id))
            .map(|row| &row.entity)
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map(|table| table.len()).unwrap_or(0)
    }

    pub fn select(&self, query: &EntityQuery) -> Vec<Entity> {
        let Some(table) = self.tables.get(&query.kind()) else {
            return Vec::new();
        };
        let mut rows: Vec<&StoredRow> = table
            .values()
            .filter(|row| query.matches(&row.entity))
            .collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| row.entity.clone()).collect()
    }

    /// Applies one change, checking ids, revisions and references.
    pub fn apply(&mut self, change: &Change) -> Result<()> {
        match change {
            Change::Insert { entities, .. } => {
                for entity in entities {
                    self.insert(entity)?;
                }
                Ok(())
            }
            Change::Update {
                entity,
                expected_revision,
            } => self.update(entity, *expected_revision),
            Change::Delete {
                kind,
                id,
                expected_revision,
            } => self.delete(*kind, id, *expected_revision),
            Change::BulkDelete(statement) => self.bulk_delete(statement),
        }
    }

    fn table(&self, kind: EntityKind) -> Table {
        self.tables.get(&kind).cloned().unwrap_or_default()
    }

    fn check_foreign_keys(&self, entity: &Entity) -> Result<()> {
        for (kind, id) in foreign_keys(entity) {
            if !self.contains(kind, id) {
                return Err(EngineError::ConstraintViolation(format!(
                    "{} '{}' references missing {} '{}'",
                    entity.kind(),
                    entity.id(),
                    kind,
                    id
                )));
            }
        }
        Ok(())
    }

    fn check_not_referenced(&self, kind: EntityKind, id: &str) -> Result<()> {
        for referencing in referencing_kinds(kind) {
            let Some(table) = self.tables.get(referencing) else {
                continue;
            };
            for row in table.values() {
                if row.entity.id() == id && *referencing == kind {
                    continue;
                }
                if foreign_keys(&row.entity).contains(&(kind, id)) {
                    return Err(EngineError::ConstraintViolation(format!(
                        "{} '{}' is still referenced by {} '{}'",
                        kind,
                        id,
                        referencing,
                        row.entity.id()
                    )));
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, entity: &Entity) -> Result<()> {
        let kind = entity.kind();
        if self.contains(kind, entity.id()) {
            return Err(EngineError::ConstraintViolation(format!(
                "duplicate {} id '{}'",
                kind,
                entity.id()
            )));
        }
        self.check_foreign_keys(entity)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        let mut table = self.table(kind);
        table.insert(
            entity.id().to_string(),
            StoredRow {
                seq,
                entity: entity.clone(),
            },
        );
        self.tables.insert(kind, table);
        Ok(())
    }

    fn check_revision(&self, kind: EntityKind, id: &str, expected_revision: i32) -> Result<u64> {
        let row = self
            .tables
            .get(&kind)
            .and_then(|table| table.get(id))
            .ok_or_else(|| {
                EngineError::OptimisticLock(format!("{} '{}' was deleted concurrently", kind, id))
            })?;
        if row.entity.revision() != expected_revision {
            return Err(EngineError::OptimisticLock(format!(
                "{} '{}' was updated by another transaction (revision {} != {})",
                kind,
                id,
                row.entity.revision(),
                expected_revision
            )));
        }
        Ok(row.seq)
    }

    fn update(&mut self, entity: &Entity, expected_revision: i32) -> Result<()> {
        let kind = entity.kind();
        let seq = self.check_revision(kind, entity.id(), expected_revision)?;
        self.check_foreign_keys(entity)?;

        let mut table = self.table(kind);
        table.insert(
            entity.id().to_string(),
            StoredRow {
                seq,
                entity: entity.clone(),
            },
        );
        self.tables.insert(kind, table);
        Ok(())
    }

    fn delete(&mut self, kind: EntityKind, id: &str, expected_revision: i32) -> Result<()> {
        self.check_revision(kind, id, expected_revision)?;
        self.check_not_referenced(kind, id)?;

        let mut table = self.table(kind);
        table.remove(id);
        self.tables.insert(kind, table);
        Ok(())
    }

    fn bulk_delete(&mut self, statement: &BulkDelete) -> Result<()> {
        let kind = statement.kind();
        let mut table = self.table(kind);
        let doomed: Vec<String> = table
            .values()
            .filter(|row| statement.matches(&row.entity))
            .map(|row| row.entity.id().to_string())
            .collect();
        for id in &doomed {
            self.check_not_referenced(kind, id)?;
            table.remove(id);
        }
        self.tables.insert(kind, table);
        Ok(())
    }
}

/// Shared committed state of all tables.
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// A copy of the committed tables.
    pub async fn snapshot(&self) -> Tables {
        self.tables.read().await.clone()
    }

    pub async fn select_by_id(&self, kind: EntityKind, id: &str) -> Option<Entity> {
        self.tables.read().await.get(kind, id).cloned()
    }

    pub async fn select(&self, query: &EntityQuery) -> Vec<Entity> {
        self.tables.read().await.select(query)
    }

    pub async fn row_count(&self, kind: EntityKind) -> usize {
        self.tables.read().await.row_count(kind)
    }

    /// Applies every change or none of them.
    pub async fn apply(&self, changes: &[Change]) -> Result<Duration> {
        let started = Instant::now();
        let mut guard = self.tables.write().await;
        let mut next = guard.clone();
        for change in changes {
            next.apply(change)?;
        }
        *guard = next;
        Ok(started.elapsed())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedStorage = Arc<InMemoryStorage>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{IdentityLinkEntity, IdentityLinkType, TaskCounts, TaskEntity};
    use chrono::Utc;

    fn task(id: &str) -> Entity {
        Entity::Task(TaskEntity {
            id: id.into(),
            revision: 1,
            name: Some("task".into()),
            task_definition_key: Some("task".into()),
            execution_id: None,
            process_instance_id: None,
            process_definition_id: None,
            assignee: None,
            owner: None,
            claim_time: None,
            create_time: Utc::now(),
            suspended: false,
            counts: TaskCounts::new(true),
        })
    }

    fn link(id: &str, task_id: &str) -> Entity {
        Entity::IdentityLink(IdentityLinkEntity {
            id: id.into(),
            revision: 1,
            link_type: IdentityLinkType::Candidate,
            user_id: Some("kermit".into()),
            group_id: None,
            task_id: Some(task_id.into()),
            process_instance_id: None,
        })
    }

    fn insert(entity: Entity) -> Change {
        Change::Insert {
            kind: entity.kind(),
            entities: vec![entity],
        }
    }

    #[tokio::test]
    async fn test_apply_is_all_or_nothing() {
        let storage = InMemoryStorage::new();
        let result = storage
            .apply(&[insert(task("t1")), insert(link("l1", "missing"))])
            .await;

        assert!(matches!(result, Err(EngineError::ConstraintViolation(_))));
        assert_eq!(storage.row_count(EntityKind::Task).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let storage = InMemoryStorage::new();
        storage.apply(&[insert(task("t1"))]).await.unwrap();
        let err = storage.apply(&[insert(task("t1"))]).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_referenced_task_cannot_be_deleted() {
        let storage = InMemoryStorage::new();
        storage
            .apply(&[insert(task("t1")), insert(link("l1", "t1"))])
            .await
            .unwrap();

        let delete_task = Change::Delete {
            kind: EntityKind::Task,
            id: "t1".into(),
            expected_revision: 1,
        };
        let err = storage.apply(&[delete_task.clone()]).await.unwrap_err();
        assert!(err.is_constraint_violation());

        let delete_link = Change::Delete {
            kind: EntityKind::IdentityLink,
            id: "l1".into(),
            expected_revision: 1,
        };
        storage.apply(&[delete_link, delete_task]).await.unwrap();
        assert_eq!(storage.row_count(EntityKind::Task).await, 0);
    }

    #[tokio::test]
    async fn test_stale_revision_fails() {
        let storage = InMemoryStorage::new();
        storage.apply(&[insert(task("t1"))]).await.unwrap();

        let mut updated = task("t1");
        updated.set_revision(2);
        let change = Change::Update {
            entity: updated,
            expected_revision: 1,
        };
        storage.apply(&[change.clone()]).await.unwrap();

        let err = storage.apply(&[change]).await.unwrap_err();
        assert!(err.is_optimistic_lock());
    }

    #[tokio::test]
    async fn test_select_keeps_insert_order() {
        let storage = InMemoryStorage::new();
        let ids = ["c", "a", "b"];
        for id in ids {
            storage.apply(&[insert(task(id))]).await.unwrap();
        }
        let query = EntityQuery::TasksByQueryCriteria(Default::default());
        let found: Vec<String> = storage
            .select(&query)
            .await
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(found, ids);
    }
}
