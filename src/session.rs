//! Operations that span the store, local persistence and the remote proxy.

use chrono::Utc;
use im::Vector;
use serde::Serialize;
use serde_json::json;

use crate::ipc::types::{AppState, Context};
use crate::local;
use crate::model::{default_groups, Group};
use crate::store::{GroupStore, StoreError};
use crate::sync::{Poller, SyncError};
use crate::view::ViewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadSource {
    Remote,
    Local,
    Seed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Poll,
    User,
}

#[derive(Debug, Clone)]
pub struct PullOutcome {
    pub groups: Vector<Group>,
    pub changed: bool,
}

/// One pull cycle: fetch, then adopt and write through to local storage.
///
/// Nothing is applied or persisted unless the whole payload is good. The
/// pulled roster is also dropped when the local roster changed since the pull
/// started, or while a confirmed edit is still being pushed.
pub async fn pull_cycle(ctx: &Context, trigger: Trigger) -> Result<PullOutcome, SyncError> {
    let remote = ctx.remote.as_ref().ok_or(SyncError::NotConfigured)?;
    if !ctx.lock().sync.is_online {
        return Err(SyncError::Offline);
    }
    // A workspace load needs a roster, so it queues behind a running cycle.
    let _token = match trigger {
        Trigger::Startup => ctx.slot.claim().await,
        Trigger::Poll | Trigger::User => match ctx.slot.try_claim() {
            Some(token) => token,
            None => {
                log::debug!("{trigger:?} pull skipped: already syncing");
                return Err(SyncError::AlreadySyncing);
            }
        },
    };
    let started_at = ctx.lock().store.as_ref().map(GroupStore::revision);

    log::info!("pulling roster ({trigger:?})");
    let pulled = remote.pull().await;

    let mut guard = ctx.lock();
    let state = &mut *guard;
    let groups = match pulled {
        Ok(groups) => groups,
        Err(e) => {
            log::warn!("{trigger:?} pull failed: {e}");
            state.sync.last_error = Some(e.to_string());
            return Err(e.into());
        }
    };

    let current = state.store.as_ref().map(GroupStore::revision);
    if current != started_at || state.view.is_saving() {
        log::info!("{trigger:?} pull discarded: local roster changed meanwhile");
        return Err(SyncError::Stale);
    }

    let now = Utc::now();
    if let Some(conn) = state.db.as_ref() {
        local::save_groups(conn, &groups);
        local::save_last_sync(conn, now);
    }
    let groups: Vector<Group> = groups.into_iter().collect();
    let changed = match state.store.as_mut() {
        Some(store) => {
            let changed = store.groups() != &groups;
            store.replace(groups.clone());
            changed
        }
        None => {
            state.store = Some(GroupStore::new(groups.clone()));
            true
        }
    };
    state.view.reconcile(&groups);
    state.sync.last_sync = Some(now);
    state.sync.last_error = None;
    log::info!("pulled {} groups (changed: {changed})", groups.len());
    Ok(PullOutcome { groups, changed })
}

/// Startup precedence: remote (when online), then local storage, then the
/// default roster, which is persisted right away.
pub async fn load_initial(ctx: &Context) -> LoadSource {
    if ctx.remote.is_some() && ctx.lock().sync.is_online {
        match pull_cycle(ctx, Trigger::Startup).await {
            Ok(_) => return LoadSource::Remote,
            Err(e) => log::warn!("falling back to local data: {e}"),
        }
    }

    let mut guard = ctx.lock();
    let state = &mut *guard;
    let stored = state.db.as_ref().and_then(local::load_groups);
    let (source, groups) = match stored {
        Some(groups) => (LoadSource::Local, groups),
        None => {
            log::info!("no stored roster, seeding defaults");
            let seed = default_groups();
            if let Some(conn) = state.db.as_ref() {
                local::save_groups(conn, &seed);
            }
            (LoadSource::Seed, seed)
        }
    };
    let store = GroupStore::new(groups);
    state.view.reconcile(store.groups());
    state.store = Some(store);
    source
}

pub async fn poll_tick(ctx: Context) {
    if !ctx.lock().sync.is_online {
        log::debug!("poll skipped: offline");
        return;
    }
    match pull_cycle(&ctx, Trigger::Poll).await {
        Ok(outcome) if outcome.changed => ctx.emit(json!({
            "event": "groups.changed",
            "source": "poll",
            "groups": outcome.groups,
        })),
        Ok(_) | Err(SyncError::AlreadySyncing | SyncError::Stale | SyncError::Offline) => {}
        Err(e) => {
            let sync = {
                let state = ctx.lock();
                state.sync.snapshot(&ctx.slot)
            };
            ctx.emit(json!({
                "event": "sync.error",
                "code": e.code(),
                "message": e.to_string(),
                "sync": sync,
            }));
        }
    }
}

/// Replaces any running poller. Local-only setups have nothing to poll.
pub fn start_poller(ctx: &Context) {
    if ctx.remote.is_none() {
        return;
    }
    let tick_ctx = ctx.clone();
    let poller = Poller::start(ctx.config.poll_interval, move || poll_tick(tick_ctx.clone()));
    ctx.lock().poller = Some(poller);
}

pub fn stop_poller(ctx: &Context) {
    let poller = ctx.lock().poller.take();
    if let Some(p) = poller {
        p.stop();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("workspace not loaded")]
    NotReady,
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConfirmError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfirmError::NotReady => "not_ready",
            ConfirmError::View(e) => e.code(),
            ConfirmError::Store(_) => "not_found",
        }
    }
}

/// A confirmed edit that is already applied and saved locally.
#[derive(Debug, Clone)]
pub struct AppliedEdit {
    pub group: Group,
    pub student_name: String,
    pub value: u32,
    pub snapshot: Vector<Group>,
}

/// Synchronous half of confirm. `Ok(None)` means a save is already running
/// and the request is ignored.
pub fn apply_confirm(state: &mut AppState) -> Result<Option<AppliedEdit>, ConfirmError> {
    let AppState {
        store, view, db, ..
    } = state;
    let Some(store) = store.as_mut() else {
        return Err(ConfirmError::NotReady);
    };
    let Some(edit) = view.begin_confirm()? else {
        return Ok(None);
    };
    let group = match store.set_ticket_count(&edit.group_id, &edit.student_id, edit.pending_value)
    {
        Ok(g) => g.clone(),
        Err(e) => {
            view.abort_confirm();
            return Err(e.into());
        }
    };
    if let Some(conn) = db.as_ref() {
        local::save_groups(conn, store.groups());
    }
    log::info!(
        "{} ({}) set to {}",
        edit.student_name,
        group.name,
        edit.pending_value
    );
    Ok(Some(AppliedEdit {
        group,
        student_name: edit.student_name,
        value: edit.pending_value,
        snapshot: store.snapshot(),
    }))
}

/// Best-effort remote half of confirm: push, then audit log. Returns whether
/// the proxy acknowledged the push.
pub async fn push_confirmed(ctx: &Context, edit: &AppliedEdit) -> bool {
    let Some(remote) = ctx.remote.as_ref() else {
        return false;
    };
    if !ctx.lock().sync.is_online {
        log::info!("offline: change kept locally only");
        return false;
    }

    let pushed = {
        let _token = ctx.slot.claim().await;
        match remote.push(&edit.snapshot).await {
            Ok(true) => true,
            Ok(false) => {
                log::warn!("remote did not acknowledge the save");
                false
            }
            Err(e) => {
                log::warn!("push failed, local data stays authoritative: {e}");
                false
            }
        }
    };
    if pushed {
        let now = Utc::now();
        let mut state = ctx.lock();
        state.sync.last_sync = Some(now);
        if let Some(conn) = state.db.as_ref() {
            local::save_last_sync(conn, now);
        }
    }

    remote
        .log_change(&edit.group.name, &edit.student_name, edit.value)
        .await;
    pushed
}
