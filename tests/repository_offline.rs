use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use feedsync::{
    config::SyncConfig,
    core::{controller::Controller, repository::RepoError},
    op::{ActionKind, EntryPayload},
    persist::{Collection, DurableStore, StorageError, StorageResult, StoreWrite, memory::MemoryStore},
    record::{ProfilePatch, RecordBody, RecordDraft, RecordStatus, TodoItem, UserProfile},
    runtime::events::{FeedEvent, NoticeKind},
    types::{RecordId, TaskKind},
};

fn user(id: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: "Mina".to_string(),
        surname: "Park".to_string(),
        avatar_url: None,
    }
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0)
        .single()
        .expect("valid time")
}

fn run_body(km: f64) -> RecordBody {
    RecordBody::Running {
        title: Some(format!("{km} km")),
        event_at: None,
        distance_km: km,
        duration_secs: 1_800,
        path: vec![],
        description: None,
    }
}

fn offline_core(store: &MemoryStore) -> Controller {
    let mut core = Controller::open(Box::new(store.clone()), SyncConfig::default(), false);
    core.login(user("u1"));
    core
}

/// Store that reads empty and refuses every write.
struct FullStore;

impl DurableStore for FullStore {
    fn get(&self, _collection: Collection, _key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn scan(&self, _collection: Collection) -> StorageResult<Vec<(String, Vec<u8>)>> {
        Ok(vec![])
    }

    fn write_batch(&mut self, _writes: &[StoreWrite]) -> StorageResult<()> {
        Err(StorageError::Unavailable("disk full".to_string()))
    }

    fn put_all(&mut self, _collection: Collection, _values: &[(String, Vec<u8>)]) -> StorageResult<()> {
        Err(StorageError::Unavailable("disk full".to_string()))
    }
}

#[test]
fn offline_create_gets_temporary_id_and_create_entry() {
    let store = MemoryStore::new();
    let mut core = offline_core(&store);

    let rec = core.create_record(RecordDraft::new(run_body(5.0))).expect("create");
    assert!(rec.id.is_temporary());
    assert!(rec.offline);
    assert_eq!(rec.status(), RecordStatus::Pending);

    let queue = core.queue_snapshot();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].action, ActionKind::Create);
    assert_eq!(queue[0].record_id(), Some(&rec.id));
    assert_eq!(queue[0].retry_count, 0);

    assert_eq!(store.len(Collection::Records), 1);
    assert_eq!(store.len(Collection::Queue), 1);
}

#[test]
fn online_create_needs_no_queue_entry() {
    let store = MemoryStore::new();
    let mut core = Controller::open(Box::new(store.clone()), SyncConfig::default(), true);
    core.login(user("u1"));

    let rec = core.create_record(RecordDraft::new(run_body(3.0))).expect("create");
    assert!(!rec.id.is_temporary());
    assert!(rec.id.as_str().starts_with("rec-"));
    assert!(!rec.offline);
    assert!(core.queue_snapshot().is_empty());
    assert!(!core.take_sync_request());
}

#[test]
fn create_requires_session() {
    let mut core = Controller::open(Box::new(MemoryStore::new()), SyncConfig::default(), false);
    let err = core
        .create_record(RecordDraft::new(run_body(1.0)))
        .expect_err("no session");
    assert_eq!(err, RepoError::NoSession);
}

#[test]
fn second_wake_up_on_same_day_is_rejected() {
    let store = MemoryStore::new();
    let mut core = offline_core(&store);

    let first = core
        .create_record(RecordDraft::at(RecordBody::WakeUp { description: None }, at(2, 5)))
        .expect("first");
    let err = core
        .create_record(RecordDraft::at(RecordBody::WakeUp { description: None }, at(2, 9)))
        .expect_err("duplicate");
    match err {
        RepoError::DuplicateForDay { kind, day, existing } => {
            assert_eq!(kind, TaskKind::WakeUp);
            assert_eq!(day, NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"));
            assert_eq!(existing, first.id);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    core.create_record(RecordDraft::at(RecordBody::WakeUp { description: None }, at(3, 5)))
        .expect("next day is fine");
    core.create_record(RecordDraft::at(run_body(2.0), at(2, 10)))
        .expect("runs are not singletons");
    assert_eq!(core.list().len(), 3);
}

#[test]
fn plan_singleton_uses_plan_date() {
    let store = MemoryStore::new();
    let mut core = offline_core(&store);
    let plan_day = NaiveDate::from_ymd_opt(2026, 3, 10).expect("date");
    let plan = |todos: Vec<TodoItem>| RecordBody::DailyPlan {
        plan_date: plan_day,
        todos,
    };

    core.create_record(RecordDraft::at(plan(vec![]), at(1, 8))).expect("plan");
    let err = core
        .create_record(RecordDraft::at(plan(vec![]), at(9, 8)))
        .expect_err("same plan date");
    assert!(matches!(err, RepoError::DuplicateForDay { kind: TaskKind::DailyPlan, .. }));
}

#[test]
fn offline_updates_queue_post_mutation_snapshots() {
    let store = MemoryStore::new();
    let mut core = offline_core(&store);
    let rec = core.create_record(RecordDraft::new(run_body(5.0))).expect("create");

    core.update_record(&rec.id, |r| {
        if let RecordBody::Running { distance_km, .. } = &mut r.body {
            *distance_km = 6.5;
        }
    })
    .expect("update");

    let queue = core.queue_snapshot();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[1].action, ActionKind::Update);
    let EntryPayload::Record(snapshot) = &queue[1].payload else {
        panic!("record payload expected");
    };
    assert!(matches!(snapshot.body, RecordBody::Running { distance_km, .. } if distance_km == 6.5));
    assert!(queue[0].order_key() < queue[1].order_key());
}

#[test]
fn update_of_missing_record_fails() {
    let mut core = offline_core(&MemoryStore::new());
    let err = core
        .update_record(&RecordId::new("nope"), |_| {})
        .expect_err("missing");
    assert_eq!(err, RepoError::MissingRecord(RecordId::new("nope")));
}

#[test]
fn update_cannot_change_identity() {
    let mut core = offline_core(&MemoryStore::new());
    let rec = core.create_record(RecordDraft::new(run_body(1.0))).expect("create");
    let err = core
        .update_record(&rec.id, |r| r.owner_id = "mallory".to_string())
        .expect_err("owner change");
    assert_eq!(err, RepoError::IdentityChanged(rec.id.clone()));
    assert_eq!(core.get(&rec.id).expect("record").owner_id, "u1");
    assert_eq!(core.queue_snapshot().len(), 1);
}

#[test]
fn delete_purges_queue_entries() {
    let store = MemoryStore::new();
    let mut core = offline_core(&store);
    let keep = core.create_record(RecordDraft::new(run_body(1.0))).expect("keep");
    let gone = core.create_record(RecordDraft::new(run_body(2.0))).expect("gone");
    core.toggle_like(&gone.id).expect("like");

    core.delete_record(&gone.id).expect("delete");

    let queue = core.queue_snapshot();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].record_id(), Some(&keep.id));
    assert!(core.get(&gone.id).is_none());
    assert_eq!(store.len(Collection::Records), 1);
    assert_eq!(store.len(Collection::Queue), 1);
}

#[test]
fn creating_an_activity_completes_mandatory_plan_items() {
    let store = MemoryStore::new();
    let mut core = offline_core(&store);
    let plan = core
        .create_record(RecordDraft::at(
            RecordBody::DailyPlan {
                plan_date: NaiveDate::from_ymd_opt(2026, 3, 4).expect("date"),
                todos: vec![
                    TodoItem {
                        id: "t-run".to_string(),
                        text: "Run".to_string(),
                        is_completed: false,
                        mandatory_for: Some(TaskKind::Running),
                    },
                    TodoItem {
                        id: "t-read".to_string(),
                        text: "Read".to_string(),
                        is_completed: false,
                        mandatory_for: Some(TaskKind::BookReading),
                    },
                ],
            },
            at(4, 6),
        ))
        .expect("plan");

    core.create_record(RecordDraft::at(run_body(4.0), at(4, 7))).expect("run");

    let plan = core.get(&plan.id).expect("plan").clone();
    let RecordBody::DailyPlan { todos, .. } = &plan.body else {
        panic!("plan body expected");
    };
    assert!(todos[0].is_completed);
    assert!(!todos[1].is_completed);

    let actions: Vec<_> = core.queue_snapshot().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![ActionKind::Create, ActionKind::Create, ActionKind::Update]);
}

#[test]
fn mandatory_todos_cannot_be_toggled_by_hand() {
    let mut core = offline_core(&MemoryStore::new());
    let plan = core
        .create_record(RecordDraft::new(RecordBody::DailyPlan {
            plan_date: NaiveDate::from_ymd_opt(2026, 3, 5).expect("date"),
            todos: vec![
                TodoItem {
                    id: "m".to_string(),
                    text: "Wake up".to_string(),
                    is_completed: false,
                    mandatory_for: Some(TaskKind::WakeUp),
                },
                TodoItem {
                    id: "free".to_string(),
                    text: "Call mom".to_string(),
                    is_completed: false,
                    mandatory_for: None,
                },
            ],
        }))
        .expect("plan");

    core.toggle_todo(&plan.id, "m").expect("toggle mandatory");
    let rec = core.toggle_todo(&plan.id, "free").expect("toggle free");
    let RecordBody::DailyPlan { todos, .. } = &rec.body else {
        panic!("plan body expected");
    };
    assert!(!todos[0].is_completed);
    assert!(todos[1].is_completed);
}

#[test]
fn likes_and_comments_go_through_update_path() {
    let mut core = offline_core(&MemoryStore::new());
    let rec = core.create_record(RecordDraft::new(run_body(1.0))).expect("create");

    let liked = core.toggle_like(&rec.id).expect("like");
    assert_eq!(liked.liked_by, vec!["u1".to_string()]);
    let unliked = core.toggle_like(&rec.id).expect("unlike");
    assert!(unliked.liked_by.is_empty());

    let blank = core.add_comment(&rec.id, "   ").expect("blank");
    assert!(blank.comments.is_empty());
    let commented = core.add_comment(&rec.id, "  nice pace ").expect("comment");
    assert_eq!(commented.comments.len(), 1);
    assert_eq!(commented.comments[0].text, "nice pace");
    assert_eq!(commented.comments[0].author_id, "u1");

    // create + like + unlike + comment
    assert_eq!(core.queue_snapshot().len(), 4);
}

#[test]
fn offline_profile_update_is_queued() {
    let store = MemoryStore::new();
    let mut core = offline_core(&store);

    let profile = core
        .update_profile(ProfilePatch {
            name: "Mina".to_string(),
            surname: "Kim".to_string(),
            avatar_url: Some("https://img.example/u1.png".to_string()),
        })
        .expect("profile");
    assert_eq!(profile.surname, "Kim");
    assert_eq!(core.state().users.get("u1"), Some(&profile));

    let queue = core.queue_snapshot();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].action, ActionKind::ProfileUpdate);
    assert_eq!(queue[0].record_id(), None);

    core.logout();
    let err = core.update_profile(ProfilePatch::default()).expect_err("logged out");
    assert_eq!(err, RepoError::NoSession);
}

#[test]
fn retry_of_healthy_record_is_rejected() {
    let mut core = offline_core(&MemoryStore::new());
    let rec = core.create_record(RecordDraft::new(run_body(1.0))).expect("create");
    assert_eq!(core.retry_failed(&rec.id), Err(RepoError::NotFailed(rec.id.clone())));
}

#[test]
fn state_survives_restart() {
    let store = MemoryStore::new();
    let (rec, pending) = {
        let mut core = offline_core(&store);
        let rec = core.create_record(RecordDraft::new(run_body(8.0))).expect("create");
        core.add_comment(&rec.id, "first!").expect("comment");
        (rec, core.queue_snapshot())
    };

    let mut reopened = Controller::open(Box::new(store.clone()), SyncConfig::default(), false);
    assert_eq!(reopened.state().current_user().map(|u| u.id.as_str()), Some("u1"));
    assert_eq!(reopened.queue_snapshot(), pending);
    assert_eq!(reopened.get(&rec.id).expect("record").comments.len(), 1);

    // Entry ids keep increasing after a restart.
    reopened.toggle_like(&rec.id).expect("like");
    let queue = reopened.queue_snapshot();
    assert_eq!(queue.len(), 3);
    assert!(queue[2].entry_id > queue[1].entry_id);
}

#[test]
fn online_reopen_with_pending_work_requests_sync() {
    let store = MemoryStore::new();
    {
        let mut core = offline_core(&store);
        core.create_record(RecordDraft::new(run_body(1.0))).expect("create");
    }
    let mut reopened = Controller::open(Box::new(store), SyncConfig::default(), true);
    assert!(reopened.take_sync_request());
    assert!(!reopened.take_sync_request());
}

#[test]
fn storage_failure_degrades_to_memory_only() {
    let mut core = Controller::open(Box::new(FullStore), SyncConfig::default(), false);
    core.login(user("u1"));
    let rec = core.create_record(RecordDraft::new(run_body(2.0))).expect("create");
    core.toggle_like(&rec.id).expect("like");

    assert!(core.is_degraded());
    assert_eq!(core.get(&rec.id).expect("record").liked_by.len(), 1);
    assert_eq!(core.queue_snapshot().len(), 2);

    let degraded_notices = core
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, FeedEvent::Notice(n) if n.kind == NoticeKind::StorageDegraded))
        .count();
    assert_eq!(degraded_notices, 1);
}
