pub mod clock;
pub mod error;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, Result};
pub use value::VariableValue;

/// Generates a new entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
