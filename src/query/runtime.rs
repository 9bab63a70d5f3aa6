use super::{Query, non_empty};
use crate::core::Result;
use crate::engine::ProcessEngine;
use crate::entity::{EntityKind, ExecutionEntity, JobEntity, JobHandler, TaskEntity};
use crate::storage::{EntityQuery, JobCriteria, ProcessInstanceCriteria, TaskCriteria};

pub struct ProcessInstanceQuery {
    engine: ProcessEngine,
    criteria: ProcessInstanceCriteria,
}

impl ProcessInstanceQuery {
    pub fn new(engine: ProcessEngine) -> Self {
        Self {
            engine,
            criteria: ProcessInstanceCriteria::default(),
        }
    }

    pub fn process_instance_id(mut self, id: &str) -> Result<Self> {
        self.criteria.process_instance_id = Some(non_empty("process instance id", id)?);
        Ok(self)
    }

    pub fn process_definition_key(mut self, key: &str) -> Result<Self> {
        self.criteria.process_definition_key = Some(non_empty("process definition key", key)?);
        Ok(self)
    }

    pub fn business_key(mut self, business_key: &str) -> Result<Self> {
        self.criteria.business_key = Some(non_empty("business key", business_key)?);
        Ok(self)
    }

    pub fn super_process_instance_id(mut self, id: &str) -> Result<Self> {
        self.criteria.super_process_instance_id = Some(non_empty("super process instance id", id)?);
        Ok(self)
    }

    pub fn suspended(mut self) -> Self {
        self.criteria.suspended = Some(true);
        self
    }

    pub fn active(mut self) -> Self {
        self.criteria.suspended = Some(false);
        self
    }
}

impl Query for ProcessInstanceQuery {
    type Row = ExecutionEntity;

    fn engine(&self) -> &ProcessEngine {
        &self.engine
    }

    fn name(&self) -> &'static str {
        "org.flowable.engine.impl.ProcessInstanceQueryImpl"
    }

    fn to_entity_query(&self) -> EntityQuery {
        EntityQuery::ProcessInstancesByQueryCriteria(self.criteria.clone())
    }
}

pub struct TaskQuery {
    engine: ProcessEngine,
    criteria: TaskCriteria,
}

impl TaskQuery {
    pub fn new(engine: ProcessEngine) -> Self {
        Self {
            engine,
            criteria: TaskCriteria::default(),
        }
    }

    pub fn task_id(mut self, id: &str) -> Result<Self> {
        self.criteria.task_id = Some(non_empty("task id", id)?);
        Ok(self)
    }

    pub fn process_instance_id(mut self, id: &str) -> Result<Self> {
        self.criteria.process_instance_id = Some(non_empty("process instance id", id)?);
        Ok(self)
    }

    pub fn execution_id(mut self, id: &str) -> Result<Self> {
        self.criteria.execution_id = Some(non_empty("execution id", id)?);
        Ok(self)
    }

    pub fn task_definition_key(mut self, key: &str) -> Result<Self> {
        self.criteria.task_definition_key = Some(non_empty("task definition key", key)?);
        Ok(self)
    }

    pub fn task_name(mut self, name: &str) -> Result<Self> {
        self.criteria.name = Some(non_empty("task name", name)?);
        Ok(self)
    }

    pub fn task_assignee(mut self, assignee: &str) -> Result<Self> {
        self.criteria.assignee = Some(non_empty("assignee", assignee)?);
        Ok(self)
    }

    pub fn task_unassigned(mut self) -> Self {
        self.criteria.unassigned = true;
        self
    }

    pub fn suspended(mut self) -> Self {
        self.criteria.suspended = Some(true);
        self
    }

    pub fn active(mut self) -> Self {
        self.criteria.suspended = Some(false);
        self
    }
}

impl Query for TaskQuery {
    type Row = TaskEntity;

    fn engine(&self) -> &ProcessEngine {
        &self.engine
    }

    fn name(&self) -> &'static str {
        "org.flowable.task.service.impl.TaskQueryImpl"
    }

    fn to_entity_query(&self) -> EntityQuery {
        EntityQuery::TasksByQueryCriteria(self.criteria.clone())
    }
}

/// Query over one of the four job tables.
pub struct JobQuery {
    engine: ProcessEngine,
    kind: EntityKind,
    criteria: JobCriteria,
}

impl JobQuery {
    pub fn new(engine: ProcessEngine, kind: EntityKind) -> Self {
        Self {
            engine,
            kind,
            criteria: JobCriteria::default(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn job_id(mut self, id: &str) -> Result<Self> {
        self.criteria.job_id = Some(non_empty("job id", id)?);
        Ok(self)
    }

    pub fn process_instance_id(mut self, id: &str) -> Result<Self> {
        self.criteria.process_instance_id = Some(non_empty("process instance id", id)?);
        Ok(self)
    }

    pub fn execution_id(mut self, id: &str) -> Result<Self> {
        self.criteria.execution_id = Some(non_empty("execution id", id)?);
        Ok(self)
    }

    pub fn element_id(mut self, id: &str) -> Result<Self> {
        self.criteria.element_id = Some(non_empty("element id", id)?);
        Ok(self)
    }

    pub fn handler(mut self, handler: JobHandler) -> Self {
        self.criteria.handler = Some(handler);
        self
    }

    pub fn with_exception(mut self) -> Self {
        self.criteria.with_exception = true;
        self
    }
}

impl Query for JobQuery {
    type Row = JobEntity;

    fn engine(&self) -> &ProcessEngine {
        &self.engine
    }

    fn name(&self) -> &'static str {
        match self.kind {
            EntityKind::TimerJob => "org.flowable.job.service.impl.TimerJobQueryImpl",
            EntityKind::SuspendedJob => "org.flowable.job.service.impl.SuspendedJobQueryImpl",
            EntityKind::DeadLetterJob => "org.flowable.job.service.impl.DeadLetterJobQueryImpl",
            _ => "org.flowable.job.service.impl.JobQueryImpl",
        }
    }

    fn to_entity_query(&self) -> EntityQuery {
        EntityQuery::JobsByQueryCriteria {
            kind: self.kind,
            criteria: self.criteria.clone(),
        }
    }
}
