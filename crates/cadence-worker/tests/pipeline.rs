// End-to-end scenarios across scheduler → dispatcher → queue → worker →
// broadcast, with a live 1 s tick and real subprocesses.

use rusqlite::Connection;
use tokio::sync::watch;
use tokio::time::{timeout, Duration};

use cadence_notify::ResultBroadcaster;
use cadence_scheduler::{Dispatcher, JobKind, JobStatus, Scheduler};
use cadence_worker::ExecutionQueue;

struct Pipeline {
    scheduler: Scheduler,
    broadcaster: ResultBroadcaster,
    // Dropping the sender stops the dispatcher; keep it for the test's life.
    _shutdown_tx: watch::Sender<bool>,
}

fn start_pipeline() -> Pipeline {
    let scheduler = Scheduler::new(Connection::open_in_memory().unwrap()).unwrap();
    let broadcaster = ResultBroadcaster::new(32);
    let queue = ExecutionQueue::new(
        scheduler.store(),
        scheduler.index(),
        broadcaster.clone(),
        None,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = Dispatcher::new(scheduler.index(), queue);
    tokio::spawn(dispatcher.run(shutdown_rx));
    Pipeline {
        scheduler,
        broadcaster,
        _shutdown_tx: shutdown_tx,
    }
}

fn soon(secs: i64) -> i64 {
    chrono::Utc::now().timestamp() + secs
}

#[tokio::test]
async fn one_time_job_fires_exactly_once() {
    let pipeline = start_pipeline();
    let mut results = pipeline.broadcaster.subscribe();

    pipeline
        .scheduler
        .create_job("ping", JobKind::OneTime, soon(2), None, "echo hi")
        .unwrap();

    let result = timeout(Duration::from_secs(6), results.recv())
        .await
        .expect("job should fire within the bound")
        .unwrap();
    assert_eq!(result.name, "ping");
    assert!(result.success);
    assert!(result.message.contains("hi"));

    // No second event, no leftover index entry, terminal store record.
    assert!(timeout(Duration::from_secs(2), results.recv()).await.is_err());
    assert!(pipeline.scheduler.index().lock().unwrap().is_empty());
    let jobs = pipeline.scheduler.list_jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Completed);
    assert_eq!(jobs[0].runs, 1);
}

#[tokio::test]
async fn recurring_job_fires_again_after_its_interval() {
    let pipeline = start_pipeline();
    let mut results = pipeline.broadcaster.subscribe();

    pipeline
        .scheduler
        .create_job("beat", JobKind::Recurring, soon(1), Some(2), "echo beat")
        .unwrap();

    let first = timeout(Duration::from_secs(5), results.recv())
        .await
        .expect("first occurrence")
        .unwrap();
    assert_eq!(first.name, "beat");

    let second = timeout(Duration::from_secs(5), results.recv())
        .await
        .expect("successor occurrence")
        .unwrap();
    assert_eq!(second.name, "beat");

    // One live record the whole time, advanced by the single reschedule path.
    let jobs = pipeline.scheduler.list_jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].runs >= 2);
    assert_eq!(jobs[0].status, JobStatus::Pending);
}

#[tokio::test]
async fn cancelled_job_never_fires() {
    let pipeline = start_pipeline();
    let mut results = pipeline.broadcaster.subscribe();

    let due = soon(2);
    pipeline
        .scheduler
        .create_job("doomed", JobKind::OneTime, due, None, "echo nope")
        .unwrap();
    pipeline.scheduler.cancel_job("doomed", due).unwrap();

    assert!(pipeline.scheduler.index().lock().unwrap().is_empty());
    assert!(pipeline.scheduler.list_jobs().unwrap().is_empty());
    assert!(
        timeout(Duration::from_secs(4), results.recv()).await.is_err(),
        "cancelled job must not dispatch"
    );
}

#[tokio::test]
async fn clear_all_silences_pending_jobs() {
    let pipeline = start_pipeline();
    let mut results = pipeline.broadcaster.subscribe();

    for i in 0..5 {
        pipeline
            .scheduler
            .create_job(&format!("j{i}"), JobKind::OneTime, soon(2), None, "echo x")
            .unwrap();
    }
    assert_eq!(pipeline.scheduler.clear_all().unwrap(), 5);

    assert!(pipeline.scheduler.index().lock().unwrap().is_empty());
    assert!(pipeline.scheduler.list_jobs().unwrap().is_empty());
    assert!(
        timeout(Duration::from_secs(4), results.recv()).await.is_err(),
        "cleared jobs must produce zero dispatches"
    );
}

#[tokio::test]
async fn failure_notification_carries_the_error() {
    let pipeline = start_pipeline();
    let mut results = pipeline.broadcaster.subscribe();

    pipeline
        .scheduler
        .create_job("broken", JobKind::OneTime, soon(1), None, "exit 7")
        .unwrap();

    let result = timeout(Duration::from_secs(5), results.recv())
        .await
        .expect("failure should still produce a result")
        .unwrap();
    assert_eq!(result.name, "broken");
    assert!(!result.success);
    assert!(result.message.contains("7"));

    // Attempted is recorded as completed regardless of outcome.
    let jobs = pipeline.scheduler.list_jobs().unwrap();
    assert_eq!(jobs[0].status, JobStatus::Completed);
}
