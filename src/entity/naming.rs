//! Fully qualified names used as profiling keys.

use super::EntityKind;

pub const ENGINE_ENTITY_PACKAGE: &str = "org.flowable.engine.impl.persistence.entity.";
pub const VARIABLE_ENTITY_PACKAGE: &str = "org.flowable.variable.service.impl.persistence.entity.";
pub const TASK_ENTITY_PACKAGE: &str = "org.flowable.task.service.impl.persistence.entity.";
pub const JOB_ENTITY_PACKAGE: &str = "org.flowable.job.service.impl.persistence.entity.";
pub const IDENTITY_LINK_ENTITY_PACKAGE: &str =
    "org.flowable.identitylink.service.impl.persistence.entity.";
pub const ENTITY_LINK_ENTITY_PACKAGE: &str =
    "org.flowable.entitylink.service.impl.persistence.entity.";

pub const BULK_DELETE_PREFIX: &str = "Bulk-delete-";
pub const SELECT_BY_ID_PREFIX: &str = "selectById ";

const PACKAGE_TABLE: &[(&[&str], &str)] = &[
    (
        &["VariableInstanceEntityImpl", "HistoricVariableInstanceEntityImpl"],
        VARIABLE_ENTITY_PACKAGE,
    ),
    (
        &[
            "TaskEntityImpl",
            "HistoricTaskInstanceEntityImpl",
            "HistoricTaskLogEntryEntityImpl",
        ],
        TASK_ENTITY_PACKAGE,
    ),
    (
        &[
            "JobEntityImpl",
            "TimerJobEntityImpl",
            "SuspendedJobEntityImpl",
            "DeadLetterJobEntityImpl",
        ],
        JOB_ENTITY_PACKAGE,
    ),
    (
        &["IdentityLinkEntityImpl", "HistoricIdentityLinkEntityImpl"],
        IDENTITY_LINK_ENTITY_PACKAGE,
    ),
    (
        &["EntityLinkEntityImpl", "HistoricEntityLinkEntityImpl"],
        ENTITY_LINK_ENTITY_PACKAGE,
    ),
];

/// Qualifies a short entity class name (optionally suffixed, e.g.
/// `TaskEntityImpl-bulk-with-2`). Bulk delete keys are returned unchanged.
pub fn qualified_name(short: &str) -> String {
    if short.starts_with(BULK_DELETE_PREFIX) {
        return short.to_string();
    }
    for (prefixes, package) in PACKAGE_TABLE {
        if prefixes.iter().any(|prefix| short.starts_with(prefix)) {
            return format!("{package}{short}");
        }
    }
    format!("{ENGINE_ENTITY_PACKAGE}{short}")
}

pub fn insert_key(kind: EntityKind, rows: usize) -> String {
    if rows > 1 {
        format!("{}-bulk-with-{}", kind.qualified_name(), rows)
    } else {
        kind.qualified_name()
    }
}

pub fn select_by_id_key(kind: EntityKind) -> String {
    format!("{SELECT_BY_ID_PREFIX}{}", kind.qualified_name())
}

pub fn bulk_delete_key(statement: &str) -> String {
    format!("{BULK_DELETE_PREFIX}{statement}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families() {
        assert_eq!(
            EntityKind::Execution.qualified_name(),
            "org.flowable.engine.impl.persistence.entity.ExecutionEntityImpl"
        );
        assert_eq!(
            EntityKind::HistoricVariableInstance.qualified_name(),
            "org.flowable.variable.service.impl.persistence.entity.HistoricVariableInstanceEntityImpl"
        );
        assert_eq!(
            EntityKind::HistoricTaskLogEntry.qualified_name(),
            "org.flowable.task.service.impl.persistence.entity.HistoricTaskLogEntryEntityImpl"
        );
        assert_eq!(
            EntityKind::DeadLetterJob.qualified_name(),
            "org.flowable.job.service.impl.persistence.entity.DeadLetterJobEntityImpl"
        );
        assert_eq!(
            EntityKind::HistoricEntityLink.qualified_name(),
            "org.flowable.entitylink.service.impl.persistence.entity.HistoricEntityLinkEntityImpl"
        );
    }

    #[test]
    fn test_suffixed_and_bulk_delete_keys() {
        assert_eq!(
            insert_key(EntityKind::HistoricActivityInstance, 3),
            "org.flowable.engine.impl.persistence.entity.HistoricActivityInstanceEntityImpl-bulk-with-3"
        );
        assert_eq!(
            insert_key(EntityKind::Task, 1),
            "org.flowable.task.service.impl.persistence.entity.TaskEntityImpl"
        );
        assert_eq!(
            qualified_name("Bulk-delete-deleteTasksByExecutionId"),
            "Bulk-delete-deleteTasksByExecutionId"
        );
        assert_eq!(
            select_by_id_key(EntityKind::Job),
            "selectById org.flowable.job.service.impl.persistence.entity.JobEntityImpl"
        );
    }
}
