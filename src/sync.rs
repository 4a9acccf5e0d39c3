use crate::remote::RemoteError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("a sync is already in progress")]
    AlreadySyncing,
    #[error("offline")]
    Offline,
    #[error("remote sync is not configured")]
    NotConfigured,
    #[error("pulled data discarded: local changes were made while the pull was in flight")]
    Stale,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::AlreadySyncing => "already_syncing",
            SyncError::Offline => "offline",
            SyncError::NotConfigured => "remote_not_configured",
            SyncError::Stale => "stale",
            SyncError::Remote(_) => "sync_failed",
        }
    }
}

/// Single-slot in-flight token. Whoever holds the `SyncToken` owns the only
/// running sync cycle; the slot frees itself when the token drops.
#[derive(Clone, Default)]
pub struct SyncSlot(Arc<Mutex<()>>);

pub struct SyncToken(#[allow(dead_code)] OwnedMutexGuard<()>);

impl SyncSlot {
    pub fn try_claim(&self) -> Option<SyncToken> {
        self.0.clone().try_lock_owned().ok().map(SyncToken)
    }

    /// Waits for the running cycle, if any, to finish.
    pub async fn claim(&self) -> SyncToken {
        SyncToken(self.0.clone().lock_owned().await)
    }

    pub fn is_busy(&self) -> bool {
        self.0.try_lock().is_err()
    }
}

/// Connectivity and last-sync bookkeeping. `is_syncing` is not stored here;
/// it is read from the `SyncSlot` when a snapshot is taken.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    pub is_online: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub is_online: bool,
    pub is_syncing: bool,
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SyncStatus {
    pub fn snapshot(&self, slot: &SyncSlot) -> SyncState {
        SyncState {
            is_online: self.is_online,
            is_syncing: slot.is_busy(),
            last_sync_timestamp: self.last_sync,
            last_error: self.last_error.clone(),
        }
    }
}

/// Periodic task with an explicit lifecycle.
///
/// The first tick fires one full period after `start`. A tick that is running
/// when `stop` is called completes; no further ticks are issued. Dropping the
/// poller stops it as well.
pub struct Poller {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn start<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel, mut cancelled) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                tokio::select! {
                    // Err means the sender is gone, which also stops us. The
                    // borrowed value must not outlive this branch.
                    _ = async { let _ = cancelled.wait_for(|stop| *stop).await; } => break,
                    _ = interval.tick() => tick().await,
                }
            }
            log::debug!("poller stopped");
        });
        Self { cancel, handle }
    }

    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
