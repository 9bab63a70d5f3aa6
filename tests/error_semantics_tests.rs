/// Error semantics tests
///
/// Argument validation, missing objects, single results and rollback of
/// failed commands.
/// Run with: cargo test --test error_semantics_tests
mod common;

use common::*;
use flowdb::prelude::*;

#[tokio::test]
async fn test_empty_query_arguments_are_rejected() {
    let engine = engine(EngineConfig::new());

    let err = engine.task_service().create_task_query().task_id("").err().unwrap();
    assert!(matches!(err, EngineError::IllegalArgument(_)));

    let err = engine
        .runtime_service()
        .create_process_instance_query()
        .process_instance_id("  ")
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::IllegalArgument(_)));

    let err = engine
        .history_service()
        .create_historic_variable_instance_query()
        .variable_name("")
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::IllegalArgument(_)));
}

#[tokio::test]
async fn test_blank_ids_fail_before_storage() {
    let engine = engine(EngineConfig::new());
    let profiler = engine.enable_profiling().unwrap();
    let session = profiler.start_profile_session("blank");

    let err = engine.task_service().complete("").await.unwrap_err();
    assert!(matches!(err, EngineError::IllegalArgument(_)));
    profiler.stop_current_profile_session();

    let stats = command_stats(&session, "CompleteTaskCmd");
    assert_eq!(stats.failed_count, 1);
    assert!(stats.db_selects.is_empty());
}

#[tokio::test]
async fn test_missing_objects() {
    let engine = engine(EngineConfig::new());

    let err = engine
        .runtime_service()
        .start_process_instance_by_key("unknown")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ObjectNotFound { .. }));

    let err = engine.task_service().complete("no-such-task").await.unwrap_err();
    assert!(matches!(err, EngineError::ObjectNotFound { kind: "task", .. }));

    let err = engine
        .management_service()
        .execute_job("no-such-job")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ObjectNotFound { .. }));

    let err = engine
        .management_service()
        .move_timer_to_executable_job("no-such-timer")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ObjectNotFound { .. }));
}

#[tokio::test]
async fn test_single_result_with_several_rows_fails() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, one_task_model()).await;
    let tasks = engine.task_service();
    assert!(tasks.create_task_query().single_result().await.unwrap().is_none());

    for _ in 0..2 {
        engine
            .runtime_service()
            .start_process_instance_by_key("oneTask")
            .await
            .unwrap();
    }
    let err = tasks.create_task_query().single_result().await.unwrap_err();
    assert!(matches!(err, EngineError::IllegalState(_)));
    assert_eq!(tasks.create_task_query().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_failed_command_leaves_no_trace() {
    let engine = engine(EngineConfig::new());
    let model = ProcessModelBuilder::new("broken")
        .start_event("start")
        .user_task("first", Some("kermit"))
        .failing_service_task("explode", "boom")
        .end_event("end")
        .flow("flow1", "start", "first")
        .flow("flow2", "first", "explode")
        .flow("flow3", "explode", "end")
        .build()
        .unwrap();
    deploy(&engine, model).await;
    engine
        .runtime_service()
        .start_process_instance_by_key("broken")
        .await
        .unwrap();
    let tasks = engine.task_service();
    let task = tasks.create_task_query().single_result().await.unwrap().unwrap();

    let err = tasks.complete(&task.id).await.unwrap_err();
    assert!(matches!(err, EngineError::ExecutionError(ref message) if message.contains("boom")));

    let still_open = tasks.create_task_query().single_result().await.unwrap().unwrap();
    assert_eq!(still_open.id, task.id);
    assert_eq!(still_open.revision, task.revision);
    assert_eq!(
        engine
            .history_service()
            .create_historic_task_instance_query()
            .finished()
            .count()
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_invalid_models_are_rejected_on_deploy() {
    let engine = engine(EngineConfig::new());
    let err = engine
        .repository_service()
        .deploy_json(r#"{"key": "empty", "elements": []}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Model(_)));

    let err = engine
        .repository_service()
        .deploy_json("not json at all")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Model(_)));
}

#[tokio::test]
async fn test_table_counts_follow_commits() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, one_task_model()).await;
    engine
        .runtime_service()
        .start_process_instance_by_key("oneTask")
        .await
        .unwrap();

    let counts = engine.management_service().table_count().await.unwrap();
    assert_eq!(counts["ProcessDefinitionEntityImpl"], 1);
    assert_eq!(counts["ExecutionEntityImpl"], 2);
    assert_eq!(counts["TaskEntityImpl"], 1);
    assert_eq!(counts["JobEntityImpl"], 0);
}
