use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use rusqlite::Connection;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::Config;
use crate::remote::RemoteClient;
use crate::store::GroupStore;
use crate::sync::{Poller, SyncSlot, SyncStatus};
use crate::view::ViewController;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// `None` until the initial load of the selected workspace finishes.
    pub store: Option<GroupStore>,
    pub view: ViewController,
    pub sync: SyncStatus,
    pub poller: Option<Poller>,
}

pub type SharedState = Arc<Mutex<AppState>>;

/// Lines written to stdout: responses and unsolicited events.
pub type Outbox = UnboundedSender<serde_json::Value>;

/// Everything a handler needs. Cheap to clone; spawned work carries its own copy.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub state: SharedState,
    pub remote: Option<RemoteClient>,
    pub slot: SyncSlot,
    pub outbox: Outbox,
}

impl Context {
    pub fn new(config: Config, outbox: Outbox) -> anyhow::Result<Self> {
        let remote = RemoteClient::from_config(&config)?;
        let state = AppState {
            sync: SyncStatus {
                is_online: config.start_online,
                ..Default::default()
            },
            ..Default::default()
        };
        Ok(Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
            remote,
            slot: SyncSlot::default(),
            outbox,
        })
    }

    /// Never held across an await.
    pub fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn emit(&self, event: serde_json::Value) {
        let _ = self.outbox.send(event);
    }
}

/// How a handler answers: right away, or once its network work completes.
pub enum Dispatch {
    Ready(serde_json::Value),
    Deferred(BoxFuture<'static, serde_json::Value>),
}

impl Dispatch {
    pub fn deferred<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = serde_json::Value> + Send + 'static,
    {
        Dispatch::Deferred(fut.boxed())
    }
}
