use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::broadcast;

use feedsync::{
    config::SyncConfig,
    core::controller::Controller,
    persist::memory::MemoryStore,
    record::{Record, RecordBody, RecordDraft, UserProfile},
    remote::{RemoteError, RemoteService},
    runtime::{
        events::{FeedEvent, NoticeKind},
        handle::{FeedHandle, spawn_feedsync},
    },
    sync::{
        connectivity::Transition,
        engine::{RunReport, SyncState},
    },
    types::RecordId,
};

/// Remote double with scripted create ids and a switchable failure mode.
#[derive(Default)]
struct ScriptedRemote {
    canonical_ids: Mutex<VecDeque<String>>,
    failing: Mutex<bool>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    updates: Mutex<Vec<(RecordId, Record)>>,
}

impl ScriptedRemote {
    fn with_ids(ids: &[&str]) -> Self {
        Self {
            canonical_ids: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    fn slow(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("lock") = failing;
    }

    async fn call<T>(&self, ok: impl FnOnce() -> T) -> Result<T, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if *self.failing.lock().expect("lock") {
            return Err(RemoteError::Unreachable("offline backend".to_string()));
        }
        Ok(ok())
    }
}

#[async_trait]
impl RemoteService for ScriptedRemote {
    async fn apply_create(&self, _record: &Record) -> Result<RecordId, RemoteError> {
        let next = self.canonical_ids.lock().expect("lock").pop_front();
        let calls = self.calls.load(Ordering::SeqCst);
        self.call(|| RecordId::new(next.unwrap_or_else(|| format!("srv-auto-{calls}"))))
            .await
    }

    async fn apply_update(&self, id: &RecordId, record: &Record) -> Result<(), RemoteError> {
        self.call(|| ()).await?;
        self.updates
            .lock()
            .expect("lock")
            .push((id.clone(), record.clone()));
        Ok(())
    }

    async fn apply_profile_update(&self, _profile: &UserProfile) -> Result<(), RemoteError> {
        self.call(|| ()).await
    }
}

fn config() -> SyncConfig {
    SyncConfig {
        pacing_ms: 0,
        ..SyncConfig::default()
    }
}

fn user() -> UserProfile {
    UserProfile {
        id: "u1".to_string(),
        name: "Sam".to_string(),
        surname: "Ito".to_string(),
        avatar_url: None,
    }
}

fn run_body(km: f64) -> RecordBody {
    RecordBody::Running {
        title: None,
        event_at: None,
        distance_km: km,
        duration_secs: 600,
        path: vec![],
        description: None,
    }
}

async fn offline_handle(remote: Arc<ScriptedRemote>) -> FeedHandle {
    let core = Controller::open(Box::new(MemoryStore::new()), config(), false);
    let handle = spawn_feedsync(core, remote);
    handle.login(user()).await.expect("login");
    handle
}

async fn next_finished(sub: &mut broadcast::Receiver<FeedEvent>) -> RunReport {
    loop {
        let evt = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("event")
            .expect("recv");
        if let FeedEvent::SyncFinished { report } = evt {
            return report;
        }
    }
}

#[tokio::test]
async fn reconnect_syncs_create_and_update_under_canonical_id() {
    let remote = Arc::new(ScriptedRemote::with_ids(&["srv-42"]));
    let handle = offline_handle(Arc::clone(&remote)).await;
    let mut sub = handle.subscribe();

    let rec = handle
        .create_record(RecordDraft::new(run_body(5.0)))
        .await
        .expect("create");
    assert!(rec.id.is_temporary());
    handle
        .update_record(rec.id.clone(), |r| r.liked_by.push("u2".to_string()))
        .await
        .expect("update");

    let edge = handle.set_online(true).await.expect("online");
    assert_eq!(edge, Transition::CameOnline);
    assert!(*handle.connectivity().borrow());

    let report = next_finished(&mut sub).await;
    assert_eq!(report.applied, 2);

    let canonical = RecordId::new("srv-42");
    assert!(handle.get(rec.id.clone()).await.expect("get").is_none());
    let synced = handle.get(canonical.clone()).await.expect("get").expect("record");
    assert!(!synced.offline);
    assert_eq!(synced.liked_by, vec!["u2".to_string()]);
    assert!(handle.queue().await.expect("queue").is_empty());

    let updates = remote.updates.lock().expect("lock").clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, canonical);
    assert_eq!(updates[0].1.liked_by, vec!["u2".to_string()]);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn duplicate_online_reports_do_not_start_runs() {
    let remote = Arc::new(ScriptedRemote::default());
    let handle = offline_handle(Arc::clone(&remote)).await;

    assert_eq!(handle.set_online(false).await.expect("offline"), Transition::Unchanged);
    assert_eq!(handle.set_online(true).await.expect("online"), Transition::CameOnline);
    assert_eq!(handle.set_online(true).await.expect("flap"), Transition::Unchanged);

    let status = handle.status().await.expect("status");
    assert!(status.online);
    assert_eq!(status.pending_entries, 0);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_triggers_never_overlap() {
    let remote = Arc::new(ScriptedRemote::default().slow(Duration::from_millis(20)));
    let handle = offline_handle(Arc::clone(&remote)).await;
    let mut sub = handle.subscribe();
    for km in 1..=4 {
        handle
            .create_record(RecordDraft::new(run_body(f64::from(km))))
            .await
            .expect("create");
    }

    let (edge, a, b) = tokio::join!(handle.set_online(true), handle.sync_now(), handle.sync_now());
    assert_eq!(edge.expect("online"), Transition::CameOnline);
    let reports: Vec<_> = [a.expect("run a"), b.expect("run b")].into_iter().flatten().collect();
    assert!(reports.len() <= 1, "triggers must coalesce into one run");

    let report = next_finished(&mut sub).await;
    assert_eq!(report.applied, 4);
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok(evt) = sub.try_recv() {
        assert!(!matches!(evt, FeedEvent::SyncFinished { .. }), "a second run started");
    }
    assert_eq!(remote.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn sync_now_while_offline_never_calls_the_remote() {
    let remote = Arc::new(ScriptedRemote::default());
    let handle = offline_handle(Arc::clone(&remote)).await;
    let rec = handle
        .create_record(RecordDraft::new(run_body(3.0)))
        .await
        .expect("create");

    for _ in 0..5 {
        assert!(handle.sync_now().await.expect("sync").is_none());
    }
    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);

    let queue = handle.queue().await.expect("queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].retry_count, 0);
    let kept = handle.get(rec.id.clone()).await.expect("get").expect("record");
    assert!(kept.offline);
    assert!(!kept.sync_failed);
}

#[tokio::test]
async fn failing_remote_is_tried_exactly_max_retries_times() {
    let remote = Arc::new(ScriptedRemote::default());
    remote.set_failing(true);
    let handle = offline_handle(Arc::clone(&remote)).await;
    let mut sub = handle.subscribe();
    let rec = handle
        .create_record(RecordDraft::new(run_body(2.0)))
        .await
        .expect("create");

    handle.set_online(true).await.expect("online");
    let first = next_finished(&mut sub).await;
    assert_eq!(first.retried, 1);
    for _ in 0..4 {
        handle.sync_now().await.expect("sync").expect("report");
    }
    assert_eq!(remote.calls.load(Ordering::SeqCst), 3);

    let failed = handle.get(rec.id.clone()).await.expect("get").expect("record");
    assert!(failed.sync_failed);
    assert!(handle.queue().await.expect("queue").is_empty());

    let mut permanent = 0;
    let mut retries = 1;
    while let Ok(evt) = sub.try_recv() {
        match evt {
            FeedEvent::Notice(n) => match n.kind {
                NoticeKind::SyncFailedPermanently { record_id } => {
                    assert_eq!(record_id, Some(rec.id.clone()));
                    assert_eq!(n.dismiss_after, Duration::from_millis(5_000));
                    permanent += 1;
                }
                NoticeKind::RetryScheduled { .. } => {
                    assert_eq!(n.dismiss_after, Duration::from_millis(4_000));
                    retries += 1;
                }
                NoticeKind::StorageDegraded => panic!("store should be healthy"),
            },
            _ => {}
        }
    }
    assert_eq!(permanent, 1);
    assert_eq!(retries, 2);

    // Queuing the retry while online starts a run by itself.
    remote.set_failing(false);
    handle.retry_failed(rec.id.clone()).await.expect("retry");
    let report = next_finished(&mut sub).await;
    assert_eq!(report.applied, 1);
    let list = handle.list().await.expect("list");
    assert_eq!(list.len(), 1);
    assert!(!list[0].id.is_temporary());
    assert!(!list[0].sync_failed);
}

#[tokio::test]
async fn commands_are_served_while_a_run_is_paced() {
    let remote = Arc::new(ScriptedRemote::default());
    let core = Controller::open(
        Box::new(MemoryStore::new()),
        SyncConfig {
            pacing_ms: 200,
            ..SyncConfig::default()
        },
        false,
    );
    let handle = spawn_feedsync(core, Arc::clone(&remote));
    handle.login(user()).await.expect("login");
    let rec = handle
        .create_record(RecordDraft::new(run_body(1.0)))
        .await
        .expect("create");

    let mut sub = handle.subscribe();
    handle.set_online(true).await.expect("online");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = tokio::time::timeout(Duration::from_millis(100), handle.status())
        .await
        .expect("served during pacing")
        .expect("status");
    assert_eq!(status.sync_state, SyncState::Running);
    handle
        .update_record(rec.id.clone(), |r| r.liked_by.push("u9".to_string()))
        .await
        .expect("edit during run");

    // The Create is resolved after the pacing delay, so it already carries the edit.
    let report = next_finished(&mut sub).await;
    assert_eq!(report.applied, 1);
    let list = handle.list().await.expect("list");
    assert_eq!(list[0].liked_by, vec!["u9".to_string()]);
    assert!(!list[0].id.is_temporary());
    assert!(!list[0].offline);
    assert!(handle.queue().await.expect("queue").is_empty());
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn edit_during_remote_create_is_sent_in_a_follow_up_run() {
    let remote = Arc::new(ScriptedRemote::with_ids(&["srv-7"]).slow(Duration::from_millis(150)));
    let handle = offline_handle(Arc::clone(&remote)).await;
    let rec = handle
        .create_record(RecordDraft::new(run_body(4.0)))
        .await
        .expect("create");

    let mut sub = handle.subscribe();
    handle.set_online(true).await.expect("online");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(remote.in_flight.load(Ordering::SeqCst), 1);
    handle
        .update_record(rec.id.clone(), |r| r.liked_by.push("u9".to_string()))
        .await
        .expect("edit while the create is on the wire");

    let created = next_finished(&mut sub).await;
    assert_eq!(created.applied, 1);
    let follow_up = next_finished(&mut sub).await;
    assert_eq!(follow_up.applied, 1);

    let canonical = RecordId::new("srv-7");
    let updates = remote.updates.lock().expect("lock").clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, canonical);
    assert_eq!(updates[0].1.liked_by, vec!["u9".to_string()]);

    let synced = handle.get(canonical).await.expect("get").expect("record");
    assert_eq!(synced.liked_by, vec!["u9".to_string()]);
    assert!(!synced.offline);
    assert!(handle.queue().await.expect("queue").is_empty());
}
