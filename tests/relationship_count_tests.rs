/// Relationship-count cache tests
///
/// Compares the selects issued with execution/task relationship counting
/// enabled and disabled.
/// Run with: cargo test --test relationship_count_tests
mod common;

use common::*;
use flowdb::prelude::*;

async fn profile_one_task(counts: bool) -> std::sync::Arc<ProfileSession> {
    let engine = engine(EngineConfig::new().enable_relationship_counts(counts));
    deploy(&engine, one_task_model()).await;
    let profiler = engine.enable_profiling().unwrap();
    let tasks = engine.task_service();

    let session = profiler.start_profile_session(if counts { "counts" } else { "no counts" });
    engine
        .runtime_service()
        .start_process_instance_by_key("oneTask")
        .await
        .unwrap();
    let task = tasks.create_task_query().single_result().await.unwrap().unwrap();
    tasks.complete(&task.id).await.unwrap();
    profiler.stop_current_profile_session();
    session
}

#[tokio::test]
async fn test_disabling_counts_never_reduces_related_selects() {
    let with_counts = profile_one_task(true).await;
    let without_counts = profile_one_task(false).await;

    for pattern in ["ByExecutionId", "ByTaskId", "VariablesByQuery", "ByProcessInstance"] {
        let on = total_selects_matching(&with_counts, pattern);
        let off = total_selects_matching(&without_counts, pattern);
        assert!(off >= on, "{pattern}: {off} selects without counts, {on} with counts");
    }

    let on = total_selects_matching(&with_counts, "ByExecutionId");
    let off = total_selects_matching(&without_counts, "ByExecutionId");
    assert!(off > on, "counting saved no execution lookups ({off} vs {on})");
}

#[tokio::test]
async fn test_counts_skip_job_lookups_when_completing() {
    let session = profile_one_task(true).await;
    let complete = command_stats(&session, "CompleteTaskCmd");
    assert_eq!(complete.select_count("selectJobsByExecutionId"), 0);
    assert_eq!(complete.select_count("selectTimerJobsByExecutionId"), 0);
    assert_eq!(complete.select_count("selectEventSubscriptionsByExecution"), 0);
    assert_eq!(complete.select_count("selectTasksByExecutionId"), 0);

    let session = profile_one_task(false).await;
    let complete = command_stats(&session, "CompleteTaskCmd");
    assert!(complete.select_count("selectJobsByExecutionId") > 0);
    assert!(complete.select_count("selectTimerJobsByExecutionId") > 0);
}

#[tokio::test]
async fn test_identity_link_count_tracks_candidates() {
    let engine = engine(EngineConfig::new());
    deploy(&engine, one_task_model()).await;
    engine
        .runtime_service()
        .start_process_instance_by_key("oneTask")
        .await
        .unwrap();
    let tasks = engine.task_service();
    let task = tasks.create_task_query().single_result().await.unwrap().unwrap();
    assert_eq!(task.counts.identity_links, 1);

    assert!(tasks.add_candidate_user(&task.id, "fozzie").await.unwrap());
    let task = tasks.create_task_query().single_result().await.unwrap().unwrap();
    assert_eq!(task.counts.identity_links, 2);

    assert!(tasks.delete_candidate_group(&task.id, "management").await.unwrap());
    assert!(tasks.delete_candidate_user(&task.id, "fozzie").await.unwrap());
    let task = tasks.create_task_query().single_result().await.unwrap().unwrap();
    assert_eq!(task.counts.identity_links, 0);
}
