//! flowdb: the persistence and command layer of a BPMN process engine.
//!
//! Every service call runs as a [`interceptor::Command`] through an
//! interceptor chain. The chain opens a unit-of-work [`session::DbSession`]
//! that caches entities, batches inserts and flushes all statements in one
//! storage transaction when the command finishes. The [`profiler`] records
//! which statements each command issued.
//!
//! ```no_run
//! use flowdb::prelude::*;
//!
//! # async fn run() -> flowdb::core::Result<()> {
//! let engine = ProcessEngine::new(EngineConfig::new())?;
//! let model = ProcessModelBuilder::new("oneTask")
//!     .start_event("start")
//!     .user_task("review", Some("kermit"))
//!     .end_event("end")
//!     .flow("flow1", "start", "review")
//!     .flow("flow2", "review", "end")
//!     .build()?;
//! engine.repository_service().deploy(model).await?;
//! engine.runtime_service().start_process_instance_by_key("oneTask").await?;
//! let task = engine.task_service().create_task_query().single_result().await?;
//! # Ok(())
//! # }
//! ```

pub mod cmd;
pub mod core;
pub mod engine;
pub mod entity;
pub mod interceptor;
pub mod jobexecutor;
pub mod model;
pub mod prelude;
pub mod profiler;
pub mod query;
pub mod service;
pub mod session;
pub mod storage;
pub mod transaction;

pub use crate::core::{EngineError, Result};
pub use engine::{EngineConfig, ProcessEngine};
