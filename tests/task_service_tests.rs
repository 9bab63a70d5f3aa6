/// Task service tests
///
/// Claiming, candidate links and task-local variables, with the statements
/// each operation issues.
/// Run with: cargo test --test task_service_tests
mod common;

use common::*;
use flowdb::prelude::*;

async fn started(model: ProcessModel) -> (ProcessEngine, TaskEntity) {
    let engine = engine(EngineConfig::new());
    let key = model.key.clone();
    deploy(&engine, model).await;
    engine
        .runtime_service()
        .start_process_instance_by_key(&key)
        .await
        .unwrap();
    let task = engine
        .task_service()
        .create_task_query()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    (engine, task)
}

#[tokio::test]
async fn test_delete_unlinked_candidate_performs_no_delete() {
    let (engine, task) = started(one_task_model()).await;
    let profiler = engine.enable_profiling().unwrap();
    let tasks = engine.task_service();

    let session = profiler.start_profile_session("unlinked");
    assert!(!tasks.delete_candidate_user(&task.id, "fozzie").await.unwrap());
    assert!(!tasks.delete_candidate_group(&task.id, "sales").await.unwrap());
    profiler.stop_current_profile_session();

    let stats = command_stats(&session, "DeleteIdentityLinkCmd");
    assert_eq!(stats.execution_count, 2);
    assert_eq!(stats.select_count("selectIdentityLinkByTaskUserGroupAndType"), 2);
    assert!(stats.db_deletes.is_empty());
    assert!(stats.db_inserts.is_empty());
    assert!(stats.db_updates.is_empty());
}

#[tokio::test]
async fn test_delete_candidate_without_links_skips_select() {
    let (engine, task) = started(assigned_task_model()).await;
    assert_eq!(task.counts.identity_links, 0);
    let profiler = engine.enable_profiling().unwrap();

    let session = profiler.start_profile_session("no links");
    let removed = engine
        .task_service()
        .delete_candidate_user(&task.id, "fozzie")
        .await
        .unwrap();
    profiler.stop_current_profile_session();
    assert!(!removed);

    let stats = command_stats(&session, "DeleteIdentityLinkCmd");
    assert_eq!(stats.select_count("selectIdentityLinkByTaskUserGroupAndType"), 0);
    assert!(stats.db_deletes.is_empty());
}

#[tokio::test]
async fn test_candidate_links_and_history() {
    let (engine, task) = started(assigned_task_model()).await;
    let tasks = engine.task_service();

    assert!(tasks.add_candidate_user(&task.id, "fozzie").await.unwrap());
    assert!(!tasks.add_candidate_user(&task.id, "fozzie").await.unwrap());
    assert!(tasks.add_candidate_group(&task.id, "management").await.unwrap());

    let links = tasks.get_identity_links_for_task(&task.id).await.unwrap();
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|link| link.link_type == IdentityLinkType::Candidate));

    assert!(tasks.delete_candidate_user(&task.id, "fozzie").await.unwrap());
    let links = tasks.get_identity_links_for_task(&task.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].group_id.as_deref(), Some("management"));
}

#[tokio::test]
async fn test_remove_variables_without_variables_issues_no_statement() {
    let (engine, task) = started(one_task_model()).await;
    let profiler = engine.enable_profiling().unwrap();

    let session = profiler.start_profile_session("remove nothing");
    let removed = engine
        .task_service()
        .remove_variables_local(&task.id, &["a", "b"])
        .await
        .unwrap();
    profiler.stop_current_profile_session();
    assert_eq!(removed, 0);

    let stats = command_stats(&session, "RemoveTaskVariablesCmd");
    assert_eq!(stats.select_count("selectVariablesByQuery"), 0);
    assert!(stats.db_inserts.is_empty());
    assert!(stats.db_updates.is_empty());
    assert!(stats.db_deletes.is_empty());
}

#[tokio::test]
async fn test_task_local_variables() {
    let (engine, task) = started(one_task_model()).await;
    let tasks = engine.task_service();
    let profiler = engine.enable_profiling().unwrap();

    let mut variables = Variables::new();
    variables.insert("amount".into(), 250.into());
    variables.insert("reason".into(), "travel".into());
    tasks.set_variables_local(&task.id, variables).await.unwrap();

    let stored = tasks.get_variables_local(&task.id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored["amount"], VariableValue::Integer(250));

    let session = profiler.start_profile_session("remove");
    let removed = tasks
        .remove_variables_local(&task.id, &["amount", "missing"])
        .await
        .unwrap();
    profiler.stop_current_profile_session();
    assert_eq!(removed, 1);

    let stats = command_stats(&session, "RemoveTaskVariablesCmd");
    assert_eq!(stats.select_count("selectVariablesByQuery"), 1);
    assert_eq!(stats.delete_count(&entity("VariableInstanceEntityImpl")), 1);

    let remaining = tasks.get_variables_local(&task.id).await.unwrap();
    assert_eq!(remaining.keys().collect::<Vec<_>>(), vec!["reason"]);

    let historic = engine
        .history_service()
        .create_historic_variable_instance_query()
        .task_id(&task.id)
        .unwrap()
        .variable_name("amount")
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert!(historic.removed_time.is_some());
}

#[tokio::test]
async fn test_claim_and_unclaim() {
    let (engine, task) = started(one_task_model()).await;
    let tasks = engine.task_service();

    tasks.claim(&task.id, "kermit").await.unwrap();
    tasks.claim(&task.id, "kermit").await.unwrap();

    let err = tasks.claim(&task.id, "fozzie").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::TaskAlreadyClaimed { ref assignee, .. } if assignee == "kermit"
    ));

    tasks.unclaim(&task.id).await.unwrap();
    tasks.claim(&task.id, "fozzie").await.unwrap();

    let claimed = tasks
        .create_task_query()
        .task_assignee("fozzie")
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert!(claimed.claim_time.is_some());

    let historic = engine
        .history_service()
        .create_historic_task_instance_query()
        .task_id(&task.id)
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(historic.assignee.as_deref(), Some("fozzie"));
}

#[tokio::test]
async fn test_complete_with_variables_sets_process_variables() {
    let (engine, task) = started(one_task_model()).await;
    let process_instance_id = task.process_instance_id.clone().unwrap();

    let mut variables = Variables::new();
    variables.insert("approved".into(), true.into());
    engine
        .task_service()
        .complete_with_variables(&task.id, variables)
        .await
        .unwrap();

    let historic = engine
        .history_service()
        .create_historic_variable_instance_query()
        .process_instance_id(&process_instance_id)
        .unwrap()
        .variable_name("approved")
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(historic.value, VariableValue::Boolean(true));

    let finished = engine
        .history_service()
        .create_historic_task_instance_query()
        .finished()
        .count()
        .await
        .unwrap();
    assert_eq!(finished, 1);
}
