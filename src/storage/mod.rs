pub mod constraints;
pub mod memory;
pub mod query;

pub use memory::{InMemoryStorage, SharedStorage, Tables};
pub use query::{
    BulkDelete, EntityQuery, HistoricActivityInstanceCriteria, HistoricProcessInstanceCriteria,
    HistoricTaskInstanceCriteria, HistoricVariableInstanceCriteria, JobCriteria,
    ProcessInstanceCriteria, TaskCriteria, VariableScope,
};
