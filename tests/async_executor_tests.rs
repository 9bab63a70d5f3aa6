/// Async job executor and timer tests
///
/// Run with: cargo test --test async_executor_tests
mod common;

use std::time::Duration;

use common::*;
use flowdb::prelude::*;

fn executor_config() -> EngineConfig {
    EngineConfig::new()
        .async_executor_poll_interval(Duration::from_millis(10))
        .async_executor_max_concurrent_jobs(2)
}

#[tokio::test]
async fn test_async_continuation_creates_job() {
    let engine = engine(executor_config());
    deploy(&engine, async_model(false)).await;

    let instance = engine
        .runtime_service()
        .start_process_instance_by_key("asyncService")
        .await
        .unwrap();
    assert!(!instance.is_ended);

    let management = engine.management_service();
    let job = management.create_job_query().single_result().await.unwrap().unwrap();
    assert_eq!(job.element_id, "work");
    assert_eq!(job.retries, 3);

    management.execute_job(&job.id).await.unwrap();
    assert_eq!(management.create_job_query().count().await.unwrap(), 0);
    let finished = engine
        .history_service()
        .create_historic_process_instance_query()
        .process_instance_id(&instance.id)
        .unwrap()
        .finished()
        .count()
        .await
        .unwrap();
    assert_eq!(finished, 1);
}

#[tokio::test]
async fn test_executor_runs_async_jobs() {
    let engine = engine(executor_config());
    deploy(&engine, async_model(false)).await;
    for _ in 0..3 {
        engine
            .runtime_service()
            .start_process_instance_by_key("asyncService")
            .await
            .unwrap();
    }
    assert_eq!(engine.management_service().create_job_query().count().await.unwrap(), 3);

    wait_for_job_executor_to_process_all_jobs(&engine, Duration::from_secs(5), Duration::from_millis(20))
        .await
        .unwrap();

    assert_eq!(
        engine
            .history_service()
            .create_historic_process_instance_query()
            .finished()
            .count()
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        engine
            .runtime_service()
            .create_process_instance_query()
            .count()
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_failing_job_ends_as_dead_letter() {
    let engine = engine(executor_config());
    deploy(&engine, async_model(true)).await;
    engine
        .runtime_service()
        .start_process_instance_by_key("asyncService")
        .await
        .unwrap();
    let management = engine.management_service();
    let job = management.create_job_query().single_result().await.unwrap().unwrap();

    for expected_retries in [2, 1] {
        let err = management.execute_job(&job.id).await.unwrap_err();
        assert!(matches!(err, EngineError::ExecutionError(_)));
        let failed = management
            .create_job_query()
            .job_id(&job.id)
            .unwrap()
            .single_result()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.retries, expected_retries);
        assert!(failed.exception_message.unwrap().contains("remote system unavailable"));
    }
    assert!(management.execute_job(&job.id).await.is_err());
    assert_eq!(management.create_job_query().count().await.unwrap(), 0);

    let dead = management
        .create_dead_letter_job_query()
        .with_exception()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dead.id, job.id);
    assert_eq!(dead.retries, 0);

    let err = management
        .move_dead_letter_job_to_executable_job(&dead.id, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalArgument(_)));

    let revived = management
        .move_dead_letter_job_to_executable_job(&dead.id, 2)
        .await
        .unwrap();
    assert_eq!(revived.retries, 2);
    assert_eq!(management.create_dead_letter_job_query().count().await.unwrap(), 0);
    assert_eq!(management.create_job_query().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_executor_retries_until_dead_letter() {
    let engine = engine(executor_config());
    deploy(&engine, async_model(true)).await;
    engine
        .runtime_service()
        .start_process_instance_by_key("asyncService")
        .await
        .unwrap();

    wait_for_job_executor_to_process_all_jobs(&engine, Duration::from_secs(5), Duration::from_millis(20))
        .await
        .unwrap();

    let management = engine.management_service();
    assert_eq!(management.create_job_query().count().await.unwrap(), 0);
    assert_eq!(management.create_dead_letter_job_query().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_due_boundary_timer_interrupts_task() {
    let clock = manual_clock();
    let engine = engine(executor_config().clock(clock.clone()));
    deploy(&engine, boundary_timer_model()).await;
    let instance = engine
        .runtime_service()
        .start_process_instance_by_key("boundaryTimer")
        .await
        .unwrap();

    clock.advance(chrono::Duration::minutes(6));
    wait_for_job_executor_to_process_all_jobs(&engine, Duration::from_secs(5), Duration::from_millis(20))
        .await
        .unwrap();

    assert_eq!(engine.task_service().create_task_query().count().await.unwrap(), 0);
    let history = engine.history_service();
    let historic = history
        .create_historic_process_instance_query()
        .process_instance_id(&instance.id)
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(historic.end_activity_id.as_deref(), Some("timeoutEnd"));

    let task = history
        .create_historic_task_instance_query()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert!(task.delete_reason.unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_wait_times_out_on_pending_timer() {
    let clock = manual_clock();
    let engine = engine(executor_config().clock(clock));
    deploy(&engine, boundary_timer_model()).await;
    engine
        .runtime_service()
        .start_process_instance_by_key("boundaryTimer")
        .await
        .unwrap();

    let err = wait_for_job_executor_to_process_all_jobs(
        &engine,
        Duration::from_millis(200),
        Duration::from_millis(20),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Timeout(_)));
    assert_eq!(
        engine
            .management_service()
            .create_timer_job_query()
            .count()
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_executor_shutdown() {
    let engine = engine(executor_config());
    let executor = AsyncExecutor::start(engine.clone());
    assert!(executor.is_active());
    tokio::time::sleep(Duration::from_millis(30)).await;
    executor.shutdown().await.unwrap();
}
