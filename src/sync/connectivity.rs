use tokio::sync::watch;
use tracing::info;

/// Result of feeding one connectivity observation to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// offline → online; callbacks fired.
    CameOnline,
    /// online → offline.
    WentOffline,
    /// Same state as before (a flap or a duplicate report).
    Unchanged,
}

type OnlineCallback = Box<dyn FnMut() + Send>;

/// Tracks online state and fires callbacks on each offline→online edge only.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    on_online: Vec<OnlineCallback>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self {
            state,
            on_online: Vec::new(),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    pub fn on_online(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_online.push(Box::new(callback));
    }

    pub fn observe(&mut self, online: bool) -> Transition {
        if self.is_online() == online {
            return Transition::Unchanged;
        }
        self.state.send_replace(online);
        if !online {
            info!("connectivity lost");
            return Transition::WentOffline;
        }

        info!(callbacks = self.on_online.len(), "connectivity restored");
        for callback in &mut self.on_online {
            callback();
        }
        Transition::CameOnline
    }
}
