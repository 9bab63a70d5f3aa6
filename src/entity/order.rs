//! Insert and delete order between entity kinds.

use std::collections::HashSet;

use lazy_static::lazy_static;

use super::{Entity, EntityKind};

lazy_static! {
    static ref INSERT_ORDER: Vec<EntityKind> = topological_order();
    static ref DELETE_ORDER: Vec<EntityKind> = INSERT_ORDER.iter().rev().copied().collect();
}

/// Kinds a row of `kind` may reference, i.e. must be inserted after.
pub fn dependencies(kind: EntityKind) -> &'static [EntityKind] {
    use EntityKind::*;
    match kind {
        ProcessDefinition => &[],
        Execution => &[ProcessDefinition],
        ActivityInstance | EventSubscription | Task => &[Execution],
        VariableInstance => &[Execution, Task],
        Job | TimerJob | SuspendedJob | DeadLetterJob => &[Execution],
        IdentityLink => &[Task, Execution],
        EntityLink => &[Execution, Task],
        Comment => &[Task],
        HistoricProcessInstance => &[],
        HistoricActivityInstance | HistoricTaskInstance => &[HistoricProcessInstance],
        HistoricTaskLogEntry => &[HistoricTaskInstance],
        HistoricVariableInstance | HistoricIdentityLink => {
            &[HistoricProcessInstance, HistoricTaskInstance]
        }
        HistoricEntityLink => &[HistoricProcessInstance],
    }
}

pub fn insert_order() -> &'static [EntityKind] {
    &INSERT_ORDER
}

pub fn delete_order() -> &'static [EntityKind] {
    &DELETE_ORDER
}

/// Kahn's algorithm; among ready kinds the earliest declared goes first.
fn topological_order() -> Vec<EntityKind> {
    let mut placed: HashSet<EntityKind> = HashSet::new();
    let mut order = Vec::with_capacity(EntityKind::ALL.len());

    while order.len() < EntityKind::ALL.len() {
        let next = EntityKind::ALL.iter().copied().find(|kind| {
            !placed.contains(kind) && dependencies(*kind).iter().all(|dep| placed.contains(dep))
        });
        match next {
            Some(kind) => {
                placed.insert(kind);
                order.push(kind);
            }
            None => {
                // Unreachable for the static graph; keep every kind anyway.
                order.extend(EntityKind::ALL.iter().filter(|kind| !placed.contains(kind)));
                break;
            }
        }
    }
    order
}

/// Reorders executions so that any execution referencing another one of the
/// same batch comes after it. Relative order is otherwise preserved.
pub fn sort_executions_parents_first(entities: Vec<Entity>) -> Vec<Entity> {
    let batch_ids: HashSet<String> = entities.iter().map(|e| e.id().to_string()).collect();
    let mut placed: HashSet<String> = HashSet::new();
    let mut remaining = entities;
    let mut sorted = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let before = remaining.len();
        let mut deferred = Vec::new();
        for entity in remaining {
            let ready = match &entity {
                Entity::Execution(execution) => execution
                    .referenced_executions()
                    .all(|id| !batch_ids.contains(id) || placed.contains(id)),
                _ => true,
            };
            if ready {
                placed.insert(entity.id().to_string());
                sorted.push(entity);
            } else {
                deferred.push(entity);
            }
        }
        if deferred.len() == before {
            // A reference cycle; storage reports it on insert.
            sorted.extend(deferred);
            break;
        }
        remaining = deferred;
    }
    sorted
}
