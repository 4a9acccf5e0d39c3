use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{Context, Dispatch, Request};
use crate::local;
use crate::session;
use crate::view::ViewController;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(ctx: &Context, req: &Request) -> Dispatch {
    let state = ctx.lock();
    Dispatch::Ready(ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "remoteConfigured": ctx.config.remote_configured(),
            "pollerRunning": state.poller.as_ref().is_some_and(|p| !p.is_finished()),
        }),
    ))
}

fn handle_workspace_select(ctx: &Context, req: &Request) -> Dispatch {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return Dispatch::Ready(resp),
    };

    // A confirm still pushing would finish against the new workspace.
    if ctx.lock().view.is_saving() {
        return Dispatch::Ready(err(
            &req.id,
            "busy",
            "a save is in progress; retry once it completes",
            None,
        ));
    }

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return Dispatch::Ready(err(&req.id, "db_open_failed", format!("{e:#}"), None)),
    };

    session::stop_poller(ctx);
    {
        let mut state = ctx.lock();
        state.sync.last_sync = local::load_last_sync(&conn);
        state.sync.last_error = None;
        state.workspace = Some(path.clone());
        state.db = Some(conn);
        state.store = None;
        state.view = ViewController::default();
    }
    log::info!("workspace selected: {}", path.to_string_lossy());

    let ctx = ctx.clone();
    let id = req.id.clone();
    Dispatch::deferred(async move {
        let source = session::load_initial(&ctx).await;
        session::start_poller(&ctx);

        let state = ctx.lock();
        let groups = state.store.as_ref().map(|s| s.snapshot()).unwrap_or_default();
        log::info!("loaded {} groups from {source:?}", groups.len());
        ok(
            &id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "source": source,
                "groups": groups,
                "sync": state.sync.snapshot(&ctx.slot),
            }),
        )
    })
}

pub fn try_handle(ctx: &Context, req: &Request) -> Option<Dispatch> {
    match req.method.as_str() {
        "health" => Some(handle_health(ctx, req)),
        "workspace.select" => Some(handle_workspace_select(ctx, req)),
        _ => None,
    }
}
