use crate::engine::ProcessEngine;
use crate::query::{
    HistoricActivityInstanceQuery, HistoricProcessInstanceQuery, HistoricTaskInstanceQuery,
    HistoricVariableInstanceQuery,
};

#[derive(Clone)]
pub struct HistoryService {
    engine: ProcessEngine,
}

impl HistoryService {
    pub fn new(engine: ProcessEngine) -> Self {
        Self { engine }
    }

    pub fn create_historic_process_instance_query(&self) -> HistoricProcessInstanceQuery {
        HistoricProcessInstanceQuery::new(self.engine.clone())
    }

    pub fn create_historic_activity_instance_query(&self) -> HistoricActivityInstanceQuery {
        HistoricActivityInstanceQuery::new(self.engine.clone())
    }

    pub fn create_historic_task_instance_query(&self) -> HistoricTaskInstanceQuery {
        HistoricTaskInstanceQuery::new(self.engine.clone())
    }

    pub fn create_historic_variable_instance_query(&self) -> HistoricVariableInstanceQuery {
        HistoricVariableInstanceQuery::new(self.engine.clone())
    }
}
