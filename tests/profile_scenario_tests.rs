/// Database operation profiles of typical process scenarios
///
/// Run with: cargo test --test profile_scenario_tests
mod common;

use common::*;
use flowdb::prelude::*;

const HISTORIC_ACTIVITY_BULK: &str =
    "org.flowable.engine.impl.persistence.entity.HistoricActivityInstanceEntityImpl-bulk-with-";

#[tokio::test]
async fn test_start_to_end_only_writes_history() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, start_to_end_model()).await;
    let profiler = engine.enable_profiling().unwrap();

    let session = profiler.start_profile_session("start to end");
    let instance = engine
        .runtime_service()
        .start_process_instance_by_key("startToEnd")
        .await
        .unwrap();
    profiler.stop_current_profile_session();

    assert!(instance.is_ended);
    let stats = command_stats(&session, "StartProcessInstanceCmd");
    assert_eq!(stats.execution_count, 1);
    assert_eq!(stats.select_count("selectLatestProcessDefinitionByKey"), 1);
    assert!(stats.db_deletes.is_empty(), "unexpected deletes: {:?}", stats.db_deletes);
    assert!(stats.db_updates.is_empty(), "unexpected updates: {:?}", stats.db_updates);
    assert!(
        stats
            .db_inserts
            .keys()
            .all(|key| key.contains("Historic")),
        "runtime rows were written: {:?}",
        stats.db_inserts
    );
    assert_eq!(stats.insert_count(&entity("HistoricProcessInstanceEntityImpl")), 1);

    let historic = engine
        .history_service()
        .create_historic_process_instance_query()
        .process_instance_id(&instance.id)
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(historic.end_activity_id.as_deref(), Some("end"));
    assert!(historic.end_time.is_some());

    let variables = engine
        .history_service()
        .create_historic_variable_instance_query()
        .process_instance_id(&instance.id)
        .unwrap()
        .list()
        .await
        .unwrap();
    assert_eq!(variables.len(), 1);
    assert_eq!(variables[0].value, VariableValue::Boolean(true));
}

#[tokio::test]
async fn test_one_task_profile() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, one_task_model()).await;
    let profiler = engine.enable_profiling().unwrap();
    let runtime = engine.runtime_service();
    let tasks = engine.task_service();

    let session = profiler.start_profile_session("one task");
    let instance = runtime.start_process_instance_by_key("oneTask").await.unwrap();
    let task = tasks
        .create_task_query()
        .process_instance_id(&instance.id)
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .expect("task created");
    tasks.complete(&task.id).await.unwrap();
    profiler.stop_current_profile_session();

    let start = command_stats(&session, "StartProcessInstanceCmd");
    assert_eq!(start.insert_count(&entity("ExecutionEntityImpl-bulk-with-2")), 1);
    assert_eq!(start.insert_count(&entity("TaskEntityImpl")), 1);
    assert_eq!(start.insert_count(&entity("IdentityLinkEntityImpl")), 1);
    assert!(start.db_deletes.is_empty());

    let query = command_stats(&session, "TaskQueryImpl");
    assert_eq!(query.select_count("selectTaskByQueryCriteria"), 1);

    let complete = command_stats(&session, "CompleteTaskCmd");
    assert_eq!(complete.delete_count(&entity("TaskEntityImpl")), 1);
    assert_eq!(complete.delete_count(&entity("IdentityLinkEntityImpl")), 1);
    assert_eq!(complete.delete_count(&entity("ExecutionEntityImpl")), 2);
    assert_eq!(complete.delete_count("Bulk-delete-deleteTasksByExecutionId"), 1);
    assert_eq!(
        complete.delete_count("Bulk-delete-deleteActivityInstancesByProcessInstanceId"),
        1
    );
    assert_eq!(complete.update_count(&entity("HistoricTaskInstanceEntityImpl")), 1);
    assert_eq!(complete.update_count(&entity("HistoricProcessInstanceEntityImpl")), 1);

    assert_eq!(tasks.create_task_query().count().await.unwrap(), 0);
    let finished = engine
        .history_service()
        .create_historic_process_instance_query()
        .finished()
        .count()
        .await
        .unwrap();
    assert_eq!(finished, 1);
}

#[tokio::test]
async fn test_parallel_fork_bulk_inserts_activity_history_once() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, parallel_model()).await;
    let profiler = engine.enable_profiling().unwrap();

    let session = profiler.start_profile_session("parallel");
    let instance = engine
        .runtime_service()
        .start_process_instance_by_key("parallel")
        .await
        .unwrap();
    profiler.stop_current_profile_session();
    assert!(instance.is_ended);

    let activities = engine
        .history_service()
        .create_historic_activity_instance_query()
        .process_instance_id(&instance.id)
        .unwrap()
        .list()
        .await
        .unwrap();
    assert!(activities.iter().all(|activity| activity.end_time.is_some()));
    assert!(activities.iter().any(|activity| activity.activity_type == "sequenceFlow"));

    let stats = command_stats(&session, "StartProcessInstanceCmd");
    let bulk: Vec<(&String, &u64)> = stats
        .db_inserts
        .iter()
        .filter(|(key, _)| key.starts_with(HISTORIC_ACTIVITY_BULK))
        .collect();
    assert_eq!(bulk.len(), 1, "inserts: {:?}", stats.db_inserts);
    let (key, calls) = bulk[0];
    assert_eq!(*calls, 1);
    assert_eq!(key, &format!("{}{}", HISTORIC_ACTIVITY_BULK, activities.len()));
}

#[tokio::test]
async fn test_completing_task_removes_boundary_timer() {
    let clock = manual_clock();
    let engine = engine(EngineConfig::new().clock(clock.clone()));
    deploy(&engine, boundary_timer_model()).await;
    let profiler = engine.enable_profiling().unwrap();
    let management = engine.management_service();

    let instance = engine
        .runtime_service()
        .start_process_instance_by_key("boundaryTimer")
        .await
        .unwrap();
    let timers = management.create_timer_job_query().list().await.unwrap();
    assert_eq!(timers.len(), 1);
    assert_eq!(timers[0].due_date, Some(clock.now() + chrono::Duration::minutes(5)));

    let task = engine
        .task_service()
        .create_task_query()
        .single_result()
        .await
        .unwrap()
        .unwrap();

    let session = profiler.start_profile_session("boundary timer");
    engine.task_service().complete(&task.id).await.unwrap();
    profiler.stop_current_profile_session();

    let complete = command_stats(&session, "CompleteTaskCmd");
    assert_eq!(complete.delete_count(&entity("TaskEntityImpl")), 1);
    assert_eq!(complete.delete_count(&entity("TimerJobEntityImpl")), 1);
    assert_eq!(complete.delete_count(&entity("ExecutionEntityImpl")), 3);
    assert_eq!(complete.delete_count("Bulk-delete-deleteTasksByExecutionId"), 1);
    assert_eq!(
        complete.delete_count("Bulk-delete-deleteEntityLinksByRootScopeIdAndRootScopeType"),
        1
    );

    assert_eq!(management.create_timer_job_query().count().await.unwrap(), 0);
    assert_eq!(
        engine
            .runtime_service()
            .create_process_instance_query()
            .process_instance_id(&instance.id)
            .unwrap()
            .count()
            .await
            .unwrap(),
        0
    );
    let cancelled = engine
        .history_service()
        .create_historic_activity_instance_query()
        .activity_id("timeout")
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert!(cancelled.delete_reason.is_some());
}

#[tokio::test]
async fn test_commands_outside_a_session_are_not_profiled() {
    let engine = engine(EngineConfig::new());
    let profiler = engine.enable_profiling().unwrap();
    deploy(&engine, one_task_model()).await;
    assert!(profiler.profile_sessions().is_empty());

    let session = profiler.start_profile_session("empty");
    profiler.stop_current_profile_session();
    assert!(session.calculate_summary_statistics().is_empty());
    assert!(session.is_stopped());
}

#[tokio::test]
async fn test_eager_execution_tree_fetching() {
    let clock = manual_clock();
    let engine = engine(
        EngineConfig::new()
            .clock(clock)
            .enable_eager_execution_tree_fetching(true),
    );
    deploy(&engine, one_task_model()).await;
    deploy(&engine, boundary_timer_model()).await;
    let profiler = engine.enable_profiling().unwrap();
    let tasks = engine.task_service();

    for key in ["oneTask", "boundaryTimer"] {
        let instance = engine
            .runtime_service()
            .start_process_instance_by_key(key)
            .await
            .unwrap();
        let task = tasks
            .create_task_query()
            .process_instance_id(&instance.id)
            .unwrap()
            .single_result()
            .await
            .unwrap()
            .unwrap();

        let session = profiler.start_profile_session(key);
        tasks.complete(&task.id).await.unwrap();
        profiler.stop_current_profile_session();

        let complete = command_stats(&session, "CompleteTaskCmd");
        assert_eq!(
            complete.select_count("selectExecutionsWithSameRootProcessInstanceId"),
            1,
            "{}: {:?}",
            key,
            complete.db_selects
        );
        assert_eq!(
            complete.select_count("selectExecutionsByParentExecutionId"),
            0,
            "{}: {:?}",
            key,
            complete.db_selects
        );
        assert_eq!(
            engine
                .runtime_service()
                .create_process_instance_query()
                .process_instance_id(&instance.id)
                .unwrap()
                .count()
                .await
                .unwrap(),
            0
        );
    }
}
