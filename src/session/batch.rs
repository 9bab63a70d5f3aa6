//! Groups pending inserts into per-kind statements.

use std::collections::HashMap;

use super::SessionSettings;
use crate::entity::{Entity, EntityKind, order};
use crate::transaction::Change;

/// Turns pending inserts (in insertion order) into insert statements.
///
/// Groups are emitted in the global insert order. A bulk-insertable group is
/// split into chunks of at most `max_statements_in_bulk_insert` rows; every
/// other row becomes its own statement.
pub fn plan_inserts(pending: Vec<Entity>, settings: &SessionSettings) -> Vec<Change> {
    let mut groups: HashMap<EntityKind, Vec<Entity>> = HashMap::new();
    for entity in pending {
        groups.entry(entity.kind()).or_default().push(entity);
    }

    let mut changes = Vec::new();
    for kind in order::insert_order() {
        let Some(mut entities) = groups.remove(kind) else {
            continue;
        };
        if *kind == EntityKind::Execution {
            entities = order::sort_executions_parents_first(entities);
        }

        if settings.is_bulk_insertable(*kind) {
            let chunk_size = settings.max_statements_in_bulk_insert.max(1);
            let mut rest = entities;
            while !rest.is_empty() {
                let tail = rest.split_off(rest.len().min(chunk_size));
                changes.push(Change::Insert {
                    kind: *kind,
                    entities: rest,
                });
                rest = tail;
            }
        } else {
            changes.extend(entities.into_iter().map(|entity| Change::Insert {
                kind: *kind,
                entities: vec![entity],
            }));
        }
    }
    changes
}
