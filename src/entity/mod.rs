//! Persistent entity model.

pub mod counts;
pub mod history;
pub mod kind;
pub mod naming;
pub mod order;
pub mod runtime;

pub use counts::{CountingPolicy, ExecutionCounts, ExecutionRelation, TaskCounts, TaskRelation};
pub use history::{
    HistoricActivityInstanceEntity, HistoricEntityLinkEntity, HistoricIdentityLinkEntity,
    HistoricProcessInstanceEntity, HistoricTaskInstanceEntity, HistoricTaskLogEntryEntity,
    HistoricVariableInstanceEntity,
};
pub use kind::EntityKind;
pub use runtime::{
    ActivityInstanceEntity, CommentEntity, EntityLinkEntity, EventSubscriptionEntity,
    ExecutionEntity, IdentityLinkEntity, IdentityLinkType, JobEntity, JobHandler,
    ProcessDefinitionEntity, TaskEntity, VariableInstanceEntity, ENTITY_LINK_TYPE_CHILD,
    SCOPE_TYPE_BPMN, SCOPE_TYPE_TASK,
};

macro_rules! entities {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// A persistent row of any kind. The variant names the kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Entity {
            $($variant($ty)),*
        }

        impl Entity {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Entity::$variant(_) => EntityKind::$variant),*
                }
            }

            pub fn id(&self) -> &str {
                match self {
                    $(Entity::$variant(e) => &e.id),*
                }
            }

            pub fn set_id(&mut self, id: String) {
                match self {
                    $(Entity::$variant(e) => e.id = id),*
                }
            }

            pub fn revision(&self) -> i32 {
                match self {
                    $(Entity::$variant(e) => e.revision),*
                }
            }

            pub fn set_revision(&mut self, revision: i32) {
                match self {
                    $(Entity::$variant(e) => e.revision = revision),*
                }
            }
        }
    };
}

entities! {
    ProcessDefinition(ProcessDefinitionEntity),
    Execution(ExecutionEntity),
    ActivityInstance(ActivityInstanceEntity),
    EventSubscription(EventSubscriptionEntity),
    Task(TaskEntity),
    VariableInstance(VariableInstanceEntity),
    Job(JobEntity),
    TimerJob(JobEntity),
    SuspendedJob(JobEntity),
    DeadLetterJob(JobEntity),
    IdentityLink(IdentityLinkEntity),
    EntityLink(EntityLinkEntity),
    Comment(CommentEntity),
    HistoricProcessInstance(HistoricProcessInstanceEntity),
    HistoricActivityInstance(HistoricActivityInstanceEntity),
    HistoricTaskInstance(HistoricTaskInstanceEntity),
    HistoricTaskLogEntry(HistoricTaskLogEntryEntity),
    HistoricVariableInstance(HistoricVariableInstanceEntity),
    HistoricIdentityLink(HistoricIdentityLinkEntity),
    HistoricEntityLink(HistoricEntityLinkEntity),
}

impl Entity {
    /// Wraps a job under one of the four job kinds.
    pub fn job(kind: EntityKind, job: JobEntity) -> Option<Entity> {
        match kind {
            EntityKind::Job => Some(Entity::Job(job)),
            EntityKind::TimerJob => Some(Entity::TimerJob(job)),
            EntityKind::SuspendedJob => Some(Entity::SuspendedJob(job)),
            EntityKind::DeadLetterJob => Some(Entity::DeadLetterJob(job)),
            _ => None,
        }
    }
}

/// Typed access to the payload of an [`Entity`].
pub trait EntityData: Clone + Send + Sync + 'static {
    /// Kind used when the type is persisted or loaded without an explicit kind.
    const KIND: EntityKind;

    fn from_entity(entity: &Entity) -> Option<&Self>;
    fn from_entity_mut(entity: &mut Entity) -> Option<&mut Self>;
    fn into_entity(self) -> Entity;
}

macro_rules! entity_data {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl EntityData for $ty {
                const KIND: EntityKind = EntityKind::$variant;

                fn from_entity(entity: &Entity) -> Option<&Self> {
                    match entity {
                        Entity::$variant(e) => Some(e),
                        _ => None,
                    }
                }

                fn from_entity_mut(entity: &mut Entity) -> Option<&mut Self> {
                    match entity {
                        Entity::$variant(e) => Some(e),
                        _ => None,
                    }
                }

                fn into_entity(self) -> Entity {
                    Entity::$variant(self)
                }
            }
        )*
    };
}

entity_data! {
    ProcessDefinitionEntity => ProcessDefinition,
    ExecutionEntity => Execution,
    ActivityInstanceEntity => ActivityInstance,
    EventSubscriptionEntity => EventSubscription,
    TaskEntity => Task,
    VariableInstanceEntity => VariableInstance,
    IdentityLinkEntity => IdentityLink,
    EntityLinkEntity => EntityLink,
    CommentEntity => Comment,
    HistoricProcessInstanceEntity => HistoricProcessInstance,
    HistoricActivityInstanceEntity => HistoricActivityInstance,
    HistoricTaskInstanceEntity => HistoricTaskInstance,
    HistoricTaskLogEntryEntity => HistoricTaskLogEntry,
    HistoricVariableInstanceEntity => HistoricVariableInstance,
    HistoricIdentityLinkEntity => HistoricIdentityLink,
    HistoricEntityLinkEntity => HistoricEntityLink,
}

impl EntityData for JobEntity {
    const KIND: EntityKind = EntityKind::Job;

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Job(job)
            | Entity::TimerJob(job)
            | Entity::SuspendedJob(job)
            | Entity::DeadLetterJob(job) => Some(job),
            _ => None,
        }
    }

    fn from_entity_mut(entity: &mut Entity) -> Option<&mut Self> {
        match entity {
            Entity::Job(job)
            | Entity::TimerJob(job)
            | Entity::SuspendedJob(job)
            | Entity::DeadLetterJob(job) => Some(job),
            _ => None,
        }
    }

    fn into_entity(self) -> Entity {
        Entity::Job(self)
    }
}
