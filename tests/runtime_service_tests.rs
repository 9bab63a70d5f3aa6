/// Runtime service tests
///
/// Gateways, wait states, call activities, suspension and deletion of
/// process instances.
/// Run with: cargo test --test runtime_service_tests
mod common;

use common::*;
use flowdb::prelude::*;

/// Execution currently waiting in `activity_id`.
async fn waiting_execution(engine: &ProcessEngine, activity_id: &str) -> String {
    engine
        .history_service()
        .create_historic_activity_instance_query()
        .activity_id(activity_id)
        .unwrap()
        .unfinished()
        .single_result()
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("nothing waits in {}", activity_id))
        .execution_id
}

#[tokio::test]
async fn test_exclusive_gateway_follows_condition_or_default() {
    let engine = engine(EngineConfig::new());
    let model = ProcessModelBuilder::new("approval")
        .start_event("start")
        .exclusive_gateway("decide", Some("toRework"))
        .user_task("book", None)
        .user_task("rework", None)
        .end_event("end")
        .flow("flow1", "start", "decide")
        .conditional_flow("toBook", "decide", "book", "${approved == true}")
        .flow("toRework", "decide", "rework")
        .flow("flow2", "book", "end")
        .flow("flow3", "rework", "end")
        .build()
        .unwrap();
    deploy(&engine, model).await;
    let runtime = engine.runtime_service();

    let mut approved = Variables::new();
    approved.insert("approved".into(), true.into());
    let first = runtime
        .start_process_instance_by_key_with_variables("approval", approved)
        .await
        .unwrap();
    let second = runtime.start_process_instance_by_key("approval").await.unwrap();

    let task_of = |instance: String| {
        let tasks = engine.task_service();
        async move {
            tasks
                .create_task_query()
                .process_instance_id(&instance)
                .unwrap()
                .single_result()
                .await
                .unwrap()
                .unwrap()
        }
    };
    assert_eq!(task_of(first.id).await.task_definition_key.as_deref(), Some("book"));
    assert_eq!(task_of(second.id).await.task_definition_key.as_deref(), Some("rework"));
}

#[tokio::test]
async fn test_receive_task_and_message_catch() {
    let engine = engine(EngineConfig::new());
    let model = ProcessModelBuilder::new("waiting")
        .start_event("start")
        .receive_task("receive")
        .message_catch("catch", "paymentReceived")
        .end_event("end")
        .flow("flow1", "start", "receive")
        .flow("flow2", "receive", "catch")
        .flow("flow3", "catch", "end")
        .build()
        .unwrap();
    deploy(&engine, model).await;
    let runtime = engine.runtime_service();
    let instance = runtime.start_process_instance_by_key("waiting").await.unwrap();

    let receiving = waiting_execution(&engine, "receive").await;
    let err = runtime
        .message_event_received("paymentReceived", &receiving)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ObjectNotFound { .. }));
    runtime.trigger(&receiving).await.unwrap();

    let catching = waiting_execution(&engine, "catch").await;
    let err = runtime
        .message_event_received("somethingElse", &catching)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ObjectNotFound { .. }));
    runtime
        .message_event_received("paymentReceived", &catching)
        .await
        .unwrap();

    let historic = engine
        .history_service()
        .create_historic_process_instance_query()
        .process_instance_id(&instance.id)
        .unwrap()
        .finished()
        .single_result()
        .await
        .unwrap();
    assert!(historic.is_some());
}

#[tokio::test]
async fn test_trigger_rejects_non_wait_states() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, one_task_model()).await;
    engine
        .runtime_service()
        .start_process_instance_by_key("oneTask")
        .await
        .unwrap();
    let execution = waiting_execution(&engine, "review").await;
    let err = engine.runtime_service().trigger(&execution).await.unwrap_err();
    assert!(matches!(err, EngineError::IllegalState(_)));
}

#[tokio::test]
async fn test_call_activity_resumes_parent() {
    let engine = engine(EngineConfig::new());
    let parent = ProcessModelBuilder::new("parent")
        .start_event("start")
        .call_activity("callChild", "child")
        .end_event("end")
        .flow("flow1", "start", "callChild")
        .flow("flow2", "callChild", "end")
        .build()
        .unwrap();
    let child = ProcessModelBuilder::new("child")
        .start_event("childStart")
        .user_task("childTask", Some("kermit"))
        .end_event("childEnd")
        .flow("c1", "childStart", "childTask")
        .flow("c2", "childTask", "childEnd")
        .build()
        .unwrap();
    deploy(&engine, child).await;
    deploy(&engine, parent).await;

    let instance = engine
        .runtime_service()
        .start_process_instance_by_key("parent")
        .await
        .unwrap();
    let instances = engine
        .runtime_service()
        .create_process_instance_query()
        .list()
        .await
        .unwrap();
    assert_eq!(instances.len(), 2);

    let task = engine
        .task_service()
        .create_task_query()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_ne!(task.process_instance_id.as_deref(), Some(instance.id.as_str()));
    engine.task_service().complete(&task.id).await.unwrap();

    let history = engine.history_service();
    assert_eq!(
        history
            .create_historic_process_instance_query()
            .finished()
            .count()
            .await
            .unwrap(),
        2
    );
    let call = history
        .create_historic_activity_instance_query()
        .activity_id("callChild")
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert!(call.called_process_instance_id.is_some());
    assert!(call.end_time.is_some());
}

#[tokio::test]
async fn test_redeploy_starts_latest_version() {
    let engine = engine(EngineConfig::new());
    let first = engine.repository_service().deploy(one_task_model()).await.unwrap();
    let second = engine.repository_service().deploy(one_task_model()).await.unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);

    let instance = engine
        .runtime_service()
        .start_process_instance_by_key("oneTask")
        .await
        .unwrap();
    assert_eq!(instance.process_definition_id, second.id);
}

#[tokio::test]
async fn test_suspend_and_activate() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, one_task_model()).await;
    let runtime = engine.runtime_service();
    let tasks = engine.task_service();
    let instance = runtime.start_process_instance_by_key("oneTask").await.unwrap();

    runtime.suspend_process_instance_by_id(&instance.id).await.unwrap();
    let err = runtime
        .suspend_process_instance_by_id(&instance.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalState(_)));

    let task = tasks
        .create_task_query()
        .suspended()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    let err = tasks.complete(&task.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Suspended(_)));
    assert_eq!(
        runtime
            .create_process_instance_query()
            .suspended()
            .count()
            .await
            .unwrap(),
        1
    );

    runtime.activate_process_instance_by_id(&instance.id).await.unwrap();
    tasks.complete(&task.id).await.unwrap();
    assert_eq!(runtime.create_process_instance_query().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_suspension_moves_timer_jobs() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, boundary_timer_model()).await;
    let runtime = engine.runtime_service();
    let management = engine.management_service();
    let instance = runtime
        .start_process_instance_by_key("boundaryTimer")
        .await
        .unwrap();

    runtime.suspend_process_instance_by_id(&instance.id).await.unwrap();
    assert_eq!(management.create_timer_job_query().count().await.unwrap(), 0);
    assert_eq!(management.create_suspended_job_query().count().await.unwrap(), 1);

    runtime.activate_process_instance_by_id(&instance.id).await.unwrap();
    assert_eq!(management.create_timer_job_query().count().await.unwrap(), 1);
    assert_eq!(management.create_suspended_job_query().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_process_instance() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, boundary_timer_model()).await;
    let runtime = engine.runtime_service();
    let instance = runtime
        .start_process_instance_by_key("boundaryTimer")
        .await
        .unwrap();

    runtime
        .delete_process_instance(&instance.id, Some("no longer needed"))
        .await
        .unwrap();

    assert_eq!(runtime.create_process_instance_query().count().await.unwrap(), 0);
    assert_eq!(engine.task_service().create_task_query().count().await.unwrap(), 0);
    assert_eq!(
        engine
            .management_service()
            .create_timer_job_query()
            .count()
            .await
            .unwrap(),
        0
    );

    let historic = engine
        .history_service()
        .create_historic_process_instance_query()
        .process_instance_id(&instance.id)
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(historic.delete_reason.as_deref(), Some("no longer needed"));

    let task = engine
        .history_service()
        .create_historic_task_instance_query()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.delete_reason.as_deref(), Some("no longer needed"));
}

#[tokio::test]
async fn test_execution_variables() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, one_task_model()).await;
    let runtime = engine.runtime_service();
    let instance = runtime.start_process_instance_by_key("oneTask").await.unwrap();

    let mut variables = Variables::new();
    variables.insert("customer".into(), "Gonzo".into());
    variables.insert("total".into(), 12.5.into());
    runtime.set_variables(&instance.id, variables).await.unwrap();

    let mut update = Variables::new();
    update.insert("total".into(), 20.0.into());
    runtime.set_variables(&instance.id, update).await.unwrap();

    let stored = runtime.get_variables(&instance.id).await.unwrap();
    assert_eq!(stored["customer"], VariableValue::from("Gonzo"));
    assert_eq!(stored["total"], VariableValue::Float(20.0));

    let child = waiting_execution(&engine, "review").await;
    let inherited = runtime.get_variables(&child).await.unwrap();
    assert_eq!(inherited.len(), 2);
}
