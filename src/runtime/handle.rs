use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::{
    core::{controller::Controller, repository::RepoError},
    op::MutationEntry,
    record::{ProfilePatch, Record, RecordDraft, UserProfile},
    remote::{RemoteError, RemoteService},
    sync::{
        connectivity::Transition,
        engine::{Dispatch, EngineLink, EntryCheck, RemoteAck, RunReport, SyncEngine, SyncOutcome, SyncState},
    },
    types::{EntryId, RecordId},
};

use super::events::FeedEvent;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("runtime channel closed")]
    ChannelClosed,
}

/// Point-in-time view of the sync core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub online: bool,
    pub sync_state: SyncState,
    pub pending_entries: usize,
    pub degraded: bool,
    pub session: Option<UserProfile>,
}

type Mutator = Box<dyn FnOnce(&mut Record) + Send>;
type Reply<T> = oneshot::Sender<Result<T, RuntimeError>>;

/// Async front door to the runtime task. Cheap to clone.
#[derive(Clone)]
pub struct FeedHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<FeedEvent>,
    connectivity: watch::Receiver<bool>,
}

enum Command {
    Login {
        profile: UserProfile,
        resp: oneshot::Sender<()>,
    },
    Logout {
        resp: oneshot::Sender<()>,
    },
    Create {
        draft: RecordDraft,
        resp: Reply<Record>,
    },
    Update {
        id: RecordId,
        mutator: Mutator,
        resp: Reply<Record>,
    },
    Delete {
        id: RecordId,
        resp: Reply<Record>,
    },
    UpdateProfile {
        patch: ProfilePatch,
        resp: Reply<UserProfile>,
    },
    ToggleLike {
        id: RecordId,
        resp: Reply<Record>,
    },
    AddComment {
        id: RecordId,
        text: String,
        resp: Reply<Record>,
    },
    ToggleTodo {
        id: RecordId,
        todo_id: String,
        resp: Reply<Record>,
    },
    RetryFailed {
        id: RecordId,
        resp: Reply<Record>,
    },
    SetOnline {
        online: bool,
        resp: oneshot::Sender<Transition>,
    },
    SyncNow {
        resp: oneshot::Sender<Result<Option<RunReport>, RuntimeError>>,
    },
    Get {
        id: RecordId,
        resp: oneshot::Sender<Option<Record>>,
    },
    List {
        resp: oneshot::Sender<Vec<Record>>,
    },
    Queue {
        resp: oneshot::Sender<Vec<MutationEntry>>,
    },
    Status {
        resp: oneshot::Sender<StatusReport>,
    },
    Engine(EngineCommand),
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Steps issued by the engine task against the state owner.
enum EngineCommand {
    Begin {
        resp: oneshot::Sender<Option<Vec<EntryId>>>,
    },
    Check {
        entry_id: EntryId,
        resp: oneshot::Sender<EntryCheck>,
    },
    Dispatch {
        entry_id: EntryId,
        resp: oneshot::Sender<Option<Dispatch>>,
    },
    Complete {
        entry_id: EntryId,
        result: Result<RemoteAck, RemoteError>,
        resp: oneshot::Sender<SyncOutcome>,
    },
    Finish {
        resp: oneshot::Sender<RunReport>,
    },
}

/// Moves `controller` into a single-writer task and returns its handle.
///
/// Runs start on the connectivity online edge, on [`FeedHandle::sync_now`],
/// and after local work is queued while online. At most one run is active.
pub fn spawn_feedsync<R: RemoteService>(mut controller: Controller, remote: Arc<R>) -> FeedHandle {
    let config = controller.config().clone();
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<FeedEvent>(config.event_buffer);
    let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<()>();

    controller.connectivity_mut().on_online(move || {
        let _ = trigger_tx.send(());
    });
    let connectivity = controller.connectivity().subscribe();

    let engine = Arc::new(SyncEngine::new(remote, &config));
    let link = EngineChannel {
        cmd_tx: cmd_tx.downgrade(),
    };
    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut controller = controller;
        if controller.take_sync_request() {
            spawn_run(&engine, &link, None);
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    let done = handle_command(cmd, &mut controller, &engine, &link);
                    publish(&mut controller, &events_tx_loop);
                    if done {
                        break;
                    }
                }
                Some(()) = trigger_rx.recv() => {
                    controller.request_sync();
                }
            }

            if controller.take_sync_request() {
                spawn_run(&engine, &link, None);
            }
        }
        debug!("feedsync runtime stopped");
    });

    FeedHandle {
        cmd_tx,
        events_tx,
        connectivity,
    }
}

impl FeedHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events_tx.subscribe()
    }

    /// Online state as last reported through [`FeedHandle::set_online`].
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity.clone()
    }

    pub async fn login(&self, profile: UserProfile) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Login { profile, resp }).await
    }

    pub async fn logout(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Logout { resp }).await
    }

    pub async fn create_record(&self, draft: RecordDraft) -> Result<Record, RuntimeError> {
        self.request(|resp| Command::Create { draft, resp }).await?
    }

    pub async fn update_record<F>(&self, id: RecordId, mutator: F) -> Result<Record, RuntimeError>
    where
        F: FnOnce(&mut Record) + Send + 'static,
    {
        self.request(|resp| Command::Update {
            id,
            mutator: Box::new(mutator),
            resp,
        })
        .await?
    }

    pub async fn delete_record(&self, id: RecordId) -> Result<Record, RuntimeError> {
        self.request(|resp| Command::Delete { id, resp }).await?
    }

    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<UserProfile, RuntimeError> {
        self.request(|resp| Command::UpdateProfile { patch, resp }).await?
    }

    pub async fn toggle_like(&self, id: RecordId) -> Result<Record, RuntimeError> {
        self.request(|resp| Command::ToggleLike { id, resp }).await?
    }

    pub async fn add_comment(&self, id: RecordId, text: impl Into<String>) -> Result<Record, RuntimeError> {
        let text = text.into();
        self.request(|resp| Command::AddComment { id, text, resp }).await?
    }

    pub async fn toggle_todo(&self, id: RecordId, todo_id: impl Into<String>) -> Result<Record, RuntimeError> {
        let todo_id = todo_id.into();
        self.request(|resp| Command::ToggleTodo { id, todo_id, resp }).await?
    }

    pub async fn retry_failed(&self, id: RecordId) -> Result<Record, RuntimeError> {
        self.request(|resp| Command::RetryFailed { id, resp }).await?
    }

    /// Feeds a connectivity observation. An offline→online edge starts a run.
    pub async fn set_online(&self, online: bool) -> Result<Transition, RuntimeError> {
        self.request(|resp| Command::SetOnline { online, resp }).await
    }

    /// Runs the engine now and waits for it. `None` while offline or if a run
    /// was already active.
    pub async fn sync_now(&self) -> Result<Option<RunReport>, RuntimeError> {
        self.request(|resp| Command::SyncNow { resp }).await?
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<Record>, RuntimeError> {
        self.request(|resp| Command::Get { id, resp }).await
    }

    /// Records, newest first.
    pub async fn list(&self) -> Result<Vec<Record>, RuntimeError> {
        self.request(|resp| Command::List { resp }).await
    }

    /// Pending entries in FIFO order.
    pub async fn queue(&self) -> Result<Vec<MutationEntry>, RuntimeError> {
        self.request(|resp| Command::Queue { resp }).await
    }

    pub async fn status(&self) -> Result<StatusReport, RuntimeError> {
        self.request(|resp| Command::Status { resp }).await
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Shutdown { resp }).await
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(build(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

fn handle_command<R: RemoteService>(
    cmd: Command,
    controller: &mut Controller,
    engine: &Arc<SyncEngine<R>>,
    link: &EngineChannel,
) -> bool {
    match cmd {
        Command::Login { profile, resp } => {
            controller.login(profile);
            let _ = resp.send(());
        }
        Command::Logout { resp } => {
            controller.logout();
            let _ = resp.send(());
        }
        Command::Create { draft, resp } => {
            let _ = resp.send(controller.create_record(draft).map_err(RuntimeError::from));
        }
        Command::Update { id, mutator, resp } => {
            let _ = resp.send(controller.update_record(&id, mutator).map_err(RuntimeError::from));
        }
        Command::Delete { id, resp } => {
            let _ = resp.send(controller.delete_record(&id).map_err(RuntimeError::from));
        }
        Command::UpdateProfile { patch, resp } => {
            let _ = resp.send(controller.update_profile(patch).map_err(RuntimeError::from));
        }
        Command::ToggleLike { id, resp } => {
            let _ = resp.send(controller.toggle_like(&id).map_err(RuntimeError::from));
        }
        Command::AddComment { id, text, resp } => {
            let _ = resp.send(controller.add_comment(&id, &text).map_err(RuntimeError::from));
        }
        Command::ToggleTodo { id, todo_id, resp } => {
            let _ = resp.send(controller.toggle_todo(&id, &todo_id).map_err(RuntimeError::from));
        }
        Command::RetryFailed { id, resp } => {
            let _ = resp.send(controller.retry_failed(&id).map_err(RuntimeError::from));
        }
        Command::SetOnline { online, resp } => {
            let _ = resp.send(controller.set_online(online));
        }
        Command::SyncNow { resp } => {
            if controller.is_online() {
                spawn_run(engine, link, Some(resp));
            } else {
                debug!("sync request ignored while offline");
                let _ = resp.send(Ok(None));
            }
        }
        Command::Get { id, resp } => {
            let _ = resp.send(controller.state().records.get_cloned(&id));
        }
        Command::List { resp } => {
            let _ = resp.send(controller.list());
        }
        Command::Queue { resp } => {
            let _ = resp.send(controller.queue_snapshot());
        }
        Command::Status { resp } => {
            let _ = resp.send(StatusReport {
                online: controller.is_online(),
                sync_state: controller.sync_state(),
                pending_entries: controller.state().queue.len(),
                degraded: controller.is_degraded(),
                session: controller.state().session.clone(),
            });
        }
        Command::Engine(step) => handle_engine_step(step, controller),
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}

fn handle_engine_step(step: EngineCommand, controller: &mut Controller) {
    match step {
        EngineCommand::Begin { resp } => {
            let _ = resp.send(controller.begin_sync());
        }
        EngineCommand::Check { entry_id, resp } => {
            let _ = resp.send(controller.check_entry(entry_id));
        }
        EngineCommand::Dispatch { entry_id, resp } => {
            let _ = resp.send(controller.dispatch(entry_id));
        }
        EngineCommand::Complete {
            entry_id,
            result,
            resp,
        } => {
            let _ = resp.send(controller.complete(entry_id, result));
        }
        EngineCommand::Finish { resp } => {
            let _ = resp.send(controller.finish_sync());
        }
    }
}

fn publish(controller: &mut Controller, events_tx: &broadcast::Sender<FeedEvent>) {
    for event in controller.drain_events() {
        let _ = events_tx.send(event);
    }
}

/// Runs the engine on its own task so the loop keeps serving commands.
fn spawn_run<R: RemoteService>(
    engine: &Arc<SyncEngine<R>>,
    link: &EngineChannel,
    resp: Option<oneshot::Sender<Result<Option<RunReport>, RuntimeError>>>,
) {
    let engine = Arc::clone(engine);
    let link = link.clone();
    tokio::spawn(async move {
        let result = engine.run(&link).await;
        if let Err(err) = &result {
            warn!(error = %err, "sync run aborted");
        }
        if let Some(resp) = resp {
            let _ = resp.send(result);
        }
    });
}

/// [`EngineLink`] over the runtime command channel. Holds a weak sender so an
/// in-progress run never keeps the runtime alive on its own.
#[derive(Clone)]
struct EngineChannel {
    cmd_tx: mpsc::WeakSender<Command>,
}

impl EngineChannel {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, RuntimeError> {
        let cmd_tx = self.cmd_tx.upgrade().ok_or(RuntimeError::ChannelClosed)?;
        let (tx, rx) = oneshot::channel();
        cmd_tx
            .send(Command::Engine(build(tx)))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        drop(cmd_tx);
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

#[async_trait]
impl EngineLink for EngineChannel {
    async fn begin(&self) -> Result<Option<Vec<EntryId>>, RuntimeError> {
        self.request(|resp| EngineCommand::Begin { resp }).await
    }

    async fn check(&self, entry_id: EntryId) -> Result<EntryCheck, RuntimeError> {
        self.request(|resp| EngineCommand::Check { entry_id, resp }).await
    }

    async fn dispatch(&self, entry_id: EntryId) -> Result<Option<Dispatch>, RuntimeError> {
        self.request(|resp| EngineCommand::Dispatch { entry_id, resp }).await
    }

    async fn complete(
        &self,
        entry_id: EntryId,
        result: Result<RemoteAck, RemoteError>,
    ) -> Result<SyncOutcome, RuntimeError> {
        self.request(|resp| EngineCommand::Complete {
            entry_id,
            result,
            resp,
        })
        .await
    }

    async fn finish(&self) -> Result<RunReport, RuntimeError> {
        self.request(|resp| EngineCommand::Finish { resp }).await
    }
}
