//! Shared models and helpers for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use flowdb::entity::naming::qualified_name;
use flowdb::prelude::*;
use flowdb::profiler::CommandStats;

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()))
}

pub fn engine(config: EngineConfig) -> ProcessEngine {
    ProcessEngine::new(config).unwrap()
}

pub async fn deploy(engine: &ProcessEngine, model: ProcessModel) {
    engine.repository_service().deploy(model).await.unwrap();
}

/// Fully qualified entity class name, e.g. `entity("TaskEntityImpl")`.
pub fn entity(short: &str) -> String {
    qualified_name(short)
}

/// Statistics of the command whose qualified name ends with `.command`.
pub fn command_stats(session: &ProfileSession, command: &str) -> CommandStats {
    let suffix = format!(".{}", command);
    session
        .calculate_summary_statistics()
        .into_iter()
        .find(|(name, _)| name.ends_with(&suffix))
        .map(|(_, stats)| stats)
        .unwrap_or_else(|| panic!("no executions of {} were profiled", command))
}

pub fn total_selects_matching(session: &ProfileSession, pattern: &str) -> u64 {
    session
        .calculate_summary_statistics()
        .values()
        .flat_map(|stats| stats.db_selects.iter())
        .filter(|(key, _)| key.contains(pattern))
        .map(|(_, count)| *count)
        .sum()
}

pub fn start_to_end_model() -> ProcessModel {
    ProcessModelBuilder::new("startToEnd")
        .start_event("start")
        .service_task("book", &[("booked", true.into())])
        .end_event("end")
        .flow("flow1", "start", "book")
        .flow("flow2", "book", "end")
        .build()
        .unwrap()
}

pub fn one_task_model() -> ProcessModel {
    ProcessModelBuilder::new("oneTask")
        .start_event("start")
        .candidate_user_task("review", &[], &["management"])
        .end_event("end")
        .flow("flow1", "start", "review")
        .flow("flow2", "review", "end")
        .build()
        .unwrap()
}

pub fn assigned_task_model() -> ProcessModel {
    ProcessModelBuilder::new("assignedTask")
        .start_event("start")
        .user_task("write", Some("kermit"))
        .end_event("end")
        .flow("flow1", "start", "write")
        .flow("flow2", "write", "end")
        .build()
        .unwrap()
}

pub fn parallel_model() -> ProcessModel {
    ProcessModelBuilder::new("parallel")
        .start_event("start")
        .parallel_gateway("fork")
        .service_task("left", &[("left", 1.into())])
        .service_task("right", &[("right", 2.into())])
        .parallel_gateway("join")
        .end_event("end")
        .flow("flow1", "start", "fork")
        .flow("flow2", "fork", "left")
        .flow("flow3", "fork", "right")
        .flow("flow4", "left", "join")
        .flow("flow5", "right", "join")
        .flow("flow6", "join", "end")
        .build()
        .unwrap()
}

pub fn boundary_timer_model() -> ProcessModel {
    ProcessModelBuilder::new("boundaryTimer")
        .start_event("start")
        .user_task("approve", Some("kermit"))
        .boundary_timer("timeout", "approve", "PT5M")
        .end_event("end")
        .end_event("timeoutEnd")
        .flow("flow1", "start", "approve")
        .flow("flow2", "approve", "end")
        .flow("flow3", "timeout", "timeoutEnd")
        .build()
        .unwrap()
}

pub fn async_model(fail: bool) -> ProcessModel {
    let builder = ProcessModelBuilder::new("asyncService").start_event("start");
    let builder = if fail {
        builder.failing_service_task("work", "remote system unavailable")
    } else {
        builder.service_task("work", &[("done", true.into())])
    };
    builder
        .end_event("end")
        .flow("flow1", "start", "work")
        .flow("flow2", "work", "end")
        .async_element("work")
        .build()
        .unwrap()
}
