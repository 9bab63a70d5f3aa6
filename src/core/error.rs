use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Optimistic lock failure: {0}")]
    OptimisticLock(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("{kind} '{id}' not found")]
    ObjectNotFound { kind: &'static str, id: String },

    #[error("Task '{task_id}' is already claimed by '{assignee}'")]
    TaskAlreadyClaimed { task_id: String, assignee: String },

    #[error("{0} is suspended")]
    Suspended(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, Self::OptimisticLock(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Model(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = EngineError::not_found("task", "t-1");
        assert_eq!(err.to_string(), "task 't-1' not found");
    }

    #[test]
    fn test_claim_conflict_is_distinct_from_illegal_state() {
        let err = EngineError::TaskAlreadyClaimed {
            task_id: "t-1".into(),
            assignee: "kermit".into(),
        };
        assert!(!matches!(err, EngineError::IllegalState(_)));
        assert!(err.to_string().contains("kermit"));
    }
}
