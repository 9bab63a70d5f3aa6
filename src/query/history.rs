use super::{Query, non_empty};
use crate::core::Result;
use crate::engine::ProcessEngine;
use crate::entity::{
    HistoricActivityInstanceEntity, HistoricProcessInstanceEntity, HistoricTaskInstanceEntity,
    HistoricVariableInstanceEntity,
};
use crate::storage::{
    EntityQuery, HistoricActivityInstanceCriteria, HistoricProcessInstanceCriteria,
    HistoricTaskInstanceCriteria, HistoricVariableInstanceCriteria,
};

pub struct HistoricProcessInstanceQuery {
    engine: ProcessEngine,
    criteria: HistoricProcessInstanceCriteria,
}

impl HistoricProcessInstanceQuery {
    pub fn new(engine: ProcessEngine) -> Self {
        Self {
            engine,
            criteria: HistoricProcessInstanceCriteria::default(),
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

    pub fn finished(mut self) -> Self {
        self.criteria.finished = Some(true);
        self
    }

    pub fn unfinished(mut self) -> Self {
        self.criteria.finished = Some(false);
        self
    }
}

impl Query for HistoricProcessInstanceQuery {
    type Row = HistoricProcessInstanceEntity;

    fn engine(&self) -> &ProcessEngine {
        &self.engine
    }

    fn name(&self) -> &'static str {
        "org.flowable.engine.impl.HistoricProcessInstanceQueryImpl"
    }

    fn to_entity_query(&self) -> EntityQuery {
        EntityQuery::HistoricProcessInstancesByQueryCriteria(self.criteria.clone())
    }
}

pub struct HistoricActivityInstanceQuery {
    engine: ProcessEngine,
    criteria: HistoricActivityInstanceCriteria,
}

impl HistoricActivityInstanceQuery {
    pub fn new(engine: ProcessEngine) -> Self {
        Self {
            engine,
            criteria: HistoricActivityInstanceCriteria::default(),
        }
    }

    pub fn process_instance_id(mut self, id: &str) -> Result<Self> {
        self.criteria.process_instance_id = Some(non_empty("process instance id", id)?);
        Ok(self)
    }

    pub fn activity_id(mut self, id: &str) -> Result<Self> {
        self.criteria.activity_id = Some(non_empty("activity id", id)?);
        Ok(self)
    }

    pub fn activity_type(mut self, activity_type: &str) -> Result<Self> {
        self.criteria.activity_type = Some(non_empty("activity type", activity_type)?);
        Ok(self)
    }

    pub fn finished(mut self) -> Self {
        self.criteria.finished = Some(true);
        self
    }

    pub fn unfinished(mut self) -> Self {
        self.criteria.finished = Some(false);
        self
    }
}

impl Query for HistoricActivityInstanceQuery {
    type Row = HistoricActivityInstanceEntity;

    fn engine(&self) -> &ProcessEngine {
        &self.engine
    }

    fn name(&self) -> &'static str {
        "org.flowable.engine.impl.HistoricActivityInstanceQueryImpl"
    }

    fn to_entity_query(&self) -> EntityQuery {
        EntityQuery::HistoricActivityInstancesByQueryCriteria(self.criteria.clone())
    }
}

pub struct HistoricTaskInstanceQuery {
    engine: ProcessEngine,
    criteria: HistoricTaskInstanceCriteria,
}

impl HistoricTaskInstanceQuery {
    pub fn new(engine: ProcessEngine) -> Self {
        Self {
            engine,
            criteria: HistoricTaskInstanceCriteria::default(),
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

    pub fn task_definition_key(mut self, key: &str) -> Result<Self> {
        self.criteria.task_definition_key = Some(non_empty("task definition key", key)?);
        Ok(self)
    }

    pub fn task_assignee(mut self, assignee: &str) -> Result<Self> {
        self.criteria.assignee = Some(non_empty("assignee", assignee)?);
        Ok(self)
    }

    pub fn finished(mut self) -> Self {
        self.criteria.finished = Some(true);
        self
    }

    pub fn unfinished(mut self) -> Self {
        self.criteria.finished = Some(false);
        self
    }
}

impl Query for HistoricTaskInstanceQuery {
    type Row = HistoricTaskInstanceEntity;

    fn engine(&self) -> &ProcessEngine {
        &self.engine
    }

    fn name(&self) -> &'static str {
        "org.flowable.task.service.impl.HistoricTaskInstanceQueryImpl"
    }

    fn to_entity_query(&self) -> EntityQuery {
        EntityQuery::HistoricTaskInstancesByQueryCriteria(self.criteria.clone())
    }
}

pub struct HistoricVariableInstanceQuery {
    engine: ProcessEngine,
    criteria: HistoricVariableInstanceCriteria,
}

impl HistoricVariableInstanceQuery {
    pub fn new(engine: ProcessEngine) -> Self {
        Self {
            engine,
            criteria: HistoricVariableInstanceCriteria::default(),
        }
    }

    pub fn process_instance_id(mut self, id: &str) -> Result<Self> {
        self.criteria.process_instance_id = Some(non_empty("process instance id", id)?);
        Ok(self)
    }

    pub fn task_id(mut self, id: &str) -> Result<Self> {
        self.criteria.task_id = Some(non_empty("task id", id)?);
        Ok(self)
    }

    pub fn variable_name(mut self, name: &str) -> Result<Self> {
        self.criteria.variable_name = Some(non_empty("variable name", name)?);
        Ok(self)
    }
}

impl Query for HistoricVariableInstanceQuery {
    type Row = HistoricVariableInstanceEntity;

    fn engine(&self) -> &ProcessEngine {
        &self.engine
    }

    fn name(&self) -> &'static str {
        "org.flowable.variable.service.impl.HistoricVariableInstanceQueryImpl"
    }

    fn to_entity_query(&self) -> EntityQuery {
        EntityQuery::HistoricVariableInstancesByQueryCriteria(self.criteria.clone())
    }
}
