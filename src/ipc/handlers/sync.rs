use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{loaded, required_bool};
use crate::ipc::types::{Context, Dispatch, Request};
use crate::session::{self, Trigger};
use crate::sync::SyncError;
use serde_json::json;

fn sync_json(ctx: &Context) -> serde_json::Value {
    let state = ctx.lock();
    json!(state.sync.snapshot(&ctx.slot))
}

fn handle_status(ctx: &Context, req: &Request) -> serde_json::Value {
    ok(&req.id, sync_json(ctx))
}

fn handle_dismiss_error(ctx: &Context, req: &Request) -> serde_json::Value {
    ctx.lock().sync.last_error = None;
    ok(&req.id, sync_json(ctx))
}

fn handle_set_online(ctx: &Context, req: &Request) -> serde_json::Value {
    let online = match required_bool(req, "online") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    {
        let mut state = ctx.lock();
        if state.sync.is_online != online {
            log::info!("network is now {}", if online { "online" } else { "offline" });
        }
        state.sync.is_online = online;
    }
    ok(&req.id, sync_json(ctx))
}

fn handle_sync_now(ctx: &Context, req: &Request) -> Dispatch {
    {
        let state = ctx.lock();
        if let Err(resp) = loaded(&state, req) {
            return Dispatch::Ready(resp);
        }
    }
    // Answer the no-op case without spawning anything.
    if ctx.slot.is_busy() {
        return Dispatch::Ready(ok(
            &req.id,
            json!({ "status": "alreadySyncing", "sync": sync_json(ctx) }),
        ));
    }

    let ctx = ctx.clone();
    let id = req.id.clone();
    Dispatch::deferred(async move {
        match session::pull_cycle(&ctx, Trigger::User).await {
            Ok(outcome) => ok(
                &id,
                json!({
                    "status": "synced",
                    "changed": outcome.changed,
                    "groups": outcome.groups,
                    "sync": sync_json(&ctx),
                }),
            ),
            Err(SyncError::AlreadySyncing) => ok(
                &id,
                json!({ "status": "alreadySyncing", "sync": sync_json(&ctx) }),
            ),
            Err(SyncError::Stale) => ok(
                &id,
                json!({ "status": "stale", "sync": sync_json(&ctx) }),
            ),
            Err(e) => err(
                &id,
                e.code(),
                e.to_string(),
                Some(json!({ "sync": sync_json(&ctx) })),
            ),
        }
    })
}

pub fn try_handle(ctx: &Context, req: &Request) -> Option<Dispatch> {
    let resp = match req.method.as_str() {
        "sync.status" => handle_status(ctx, req),
        "sync.dismissError" => handle_dismiss_error(ctx, req),
        "network.setOnline" => handle_set_online(ctx, req),
        "sync.now" => return Some(handle_sync_now(ctx, req)),
        _ => return None,
    };
    Some(Dispatch::Ready(resp))
}
