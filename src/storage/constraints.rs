//! Referential rules checked when changes are applied.

use crate::entity::{Entity, EntityKind, JobEntity, EntityData};

/// Rows that must exist before `entity` can be stored, as (kind, id).
pub fn foreign_keys(entity: &Entity) -> Vec<(EntityKind, &str)> {
    match entity {
        Entity::Execution(e) => {
            let mut keys = vec![(EntityKind::ProcessDefinition, e.process_definition_id.as_str())];
            keys.extend(e.referenced_executions().map(|id| (EntityKind::Execution, id)));
            keys
        }
        Entity::Task(t) => t
            .execution_id
            .iter()
            .map(|id| (EntityKind::Execution, id.as_str()))
            .collect(),
        Entity::EventSubscription(s) => vec![(EntityKind::Execution, s.execution_id.as_str())],
        Entity::VariableInstance(v) => {
            let mut keys = Vec::new();
            if let Some(id) = &v.execution_id {
                keys.push((EntityKind::Execution, id.as_str()));
            }
            if let Some(id) = &v.task_id {
                keys.push((EntityKind::Task, id.as_str()));
            }
            keys
        }
        Entity::IdentityLink(l) => {
            let mut keys = Vec::new();
            if let Some(id) = &l.task_id {
                keys.push((EntityKind::Task, id.as_str()));
            }
            if let Some(id) = &l.process_instance_id {
                keys.push((EntityKind::Execution, id.as_str()));
            }
            keys
        }
        other => match JobEntity::from_entity(other) {
            Some(job) => vec![(EntityKind::Execution, job.execution_id.as_str())],
            None => Vec::new(),
        },
    }
}

/// Kinds whose rows may hold a foreign key to a row of `kind`.
pub fn referencing_kinds(kind: EntityKind) -> &'static [EntityKind] {
    use EntityKind::*;
    match kind {
        ProcessDefinition => &[Execution],
        Execution => &[
            Execution,
            Task,
            EventSubscription,
            VariableInstance,
            IdentityLink,
            Job,
            TimerJob,
            SuspendedJob,
            DeadLetterJob,
        ],
        Task => &[VariableInstance, IdentityLink],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{IdentityLinkEntity, IdentityLinkType};

    #[test]
    fn test_identity_link_keys() {
        let link = Entity::IdentityLink(IdentityLinkEntity {
            id: "l".into(),
            revision: 1,
            link_type: IdentityLinkType::Candidate,
            user_id: Some("kermit".into()),
            group_id: None,
            task_id: Some("t".into()),
            process_instance_id: None,
        });
        assert_eq!(foreign_keys(&link), vec![(EntityKind::Task, "t")]);
        assert!(referencing_kinds(EntityKind::Task).contains(&EntityKind::IdentityLink));
    }
}
