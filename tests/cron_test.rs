//! Cron dispatcher tests: identifier routing, the configuration gate, the
//! eligibility threshold, and per-subject failure isolation.

mod common;

use std::sync::Arc;

use taskflow_core::models::CreatedBy;
use taskflow_core::orchestration::cron::{
    CronDispatcher, MemorySynthesisScan, SynthesisCandidateSource, MEMORY_SYNTHESIS_TASK_TYPE,
    NIGHTLY_MEMORY_SYNTHESIS,
};

use common::{build_engine, test_config, FakeSynthesisSource, TestEngine};

fn dispatcher_with_scan(engine: &TestEngine, source: FakeSynthesisSource) -> CronDispatcher {
    let mut dispatcher = CronDispatcher::new(engine.enqueuer.clone(), engine.config.clone());
    dispatcher.register_scan(Arc::new(MemorySynthesisScan::new(
        Arc::new(source) as Arc<dyn SynthesisCandidateSource>,
        engine.config.cron.min_new_memories,
    )));
    dispatcher
}

#[tokio::test]
async fn unknown_identifier_does_nothing() {
    let engine = build_engine(test_config(&[]));
    let dispatcher = CronDispatcher::new(engine.enqueuer.clone(), engine.config.clone());

    let outcome = dispatcher.respond("nightly_cleanup").await.unwrap();

    assert_eq!(outcome.scheduled, 0);
    assert_eq!(engine.store.task_count(), 0);
}

#[tokio::test]
async fn disabled_branch_does_nothing() {
    // memory_synthesis_enabled defaults to off.
    let engine = build_engine(test_config(&[]));
    let dispatcher = dispatcher_with_scan(
        &engine,
        FakeSynthesisSource::new(vec![("user-a", Ok(10))]),
    );

    let outcome = dispatcher.respond(NIGHTLY_MEMORY_SYNTHESIS).await.unwrap();

    assert_eq!(outcome.scheduled, 0);
    assert_eq!(engine.store.task_count(), 0);
}

#[tokio::test]
async fn eligible_users_get_synthesis_tasks() {
    let mut config = test_config(&[]);
    config.cron.memory_synthesis_enabled = true;
    let engine = build_engine(config);

    // Threshold is 5 new memories: user-b falls short.
    let dispatcher = dispatcher_with_scan(
        &engine,
        FakeSynthesisSource::new(vec![
            ("user-a", Ok(5)),
            ("user-b", Ok(2)),
            ("user-c", Ok(7)),
        ]),
    );

    let outcome = dispatcher.respond(NIGHTLY_MEMORY_SYNTHESIS).await.unwrap();
    assert_eq!(outcome.scheduled, 2);

    let tasks = engine.store.all_tasks();
    assert_eq!(tasks.len(), 2);
    let mut users: Vec<&str> = tasks
        .iter()
        .map(|t| t.user_id.as_deref().unwrap())
        .collect();
    users.sort_unstable();
    assert_eq!(users, vec!["user-a", "user-c"]);

    for task in &tasks {
        assert_eq!(task.task_type, MEMORY_SYNTHESIS_TASK_TYPE);
        assert_eq!(task.created_by, CreatedBy::System);
        assert_eq!(
            task.task_data["user_id"].as_str(),
            task.user_id.as_deref()
        );
    }
}

#[tokio::test]
async fn one_failing_subject_does_not_starve_the_rest() {
    let mut config = test_config(&[]);
    config.cron.memory_synthesis_enabled = true;
    let engine = build_engine(config);

    let dispatcher = dispatcher_with_scan(
        &engine,
        FakeSynthesisSource::new(vec![
            ("user-a", Ok(8)),
            ("user-b", Err("memory store unavailable".to_string())),
            ("user-c", Ok(6)),
        ]),
    );

    let outcome = dispatcher.respond(NIGHTLY_MEMORY_SYNTHESIS).await.unwrap();

    assert_eq!(outcome.scheduled, 2);
    assert_eq!(engine.store.task_count(), 2);
}
