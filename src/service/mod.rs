//! Public engine API. Every method runs one command through the engine's
//! interceptor chain.

mod history;
mod management;
mod repository;
mod runtime;
mod task;

pub use history::HistoryService;
pub use management::ManagementService;
pub use repository::RepositoryService;
pub use runtime::RuntimeService;
pub use task::TaskService;
