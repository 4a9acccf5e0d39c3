use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{loaded, required_str, view_json};
use crate::ipc::types::{AppState, Context, Dispatch, Request};
use crate::view::{Tab, ViewError};

fn respond(state: &AppState, req: &Request, res: Result<(), ViewError>) -> serde_json::Value {
    match res {
        Ok(()) => ok(&req.id, view_json(state)),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_view_get(ctx: &Context, req: &Request) -> serde_json::Value {
    ok(&req.id, view_json(&ctx.lock()))
}

fn handle_select_group(ctx: &Context, req: &Request) -> serde_json::Value {
    let group_id = match required_str(req, "groupId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mut guard = ctx.lock();
    let state = &mut *guard;
    let groups = match loaded(state, req) {
        Ok(s) => s.snapshot(),
        Err(resp) => return resp,
    };
    let res = state.view.select_group(&groups, group_id);
    respond(state, req, res)
}

fn handle_back(ctx: &Context, req: &Request) -> serde_json::Value {
    let mut state = ctx.lock();
    let res = state.view.back();
    respond(&state, req, res)
}

fn handle_switch_tab(ctx: &Context, req: &Request) -> serde_json::Value {
    let tab = match required_str(req, "tab") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(tab) = Tab::parse(tab) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown tab: {tab}"),
            Some(serde_json::json!({ "allowed": ["classes", "report"] })),
        );
    };
    let mut state = ctx.lock();
    let res = state.view.switch_tab(tab);
    respond(&state, req, res)
}

pub fn try_handle(ctx: &Context, req: &Request) -> Option<Dispatch> {
    let resp = match req.method.as_str() {
        "view.get" => handle_view_get(ctx, req),
        "view.selectGroup" => handle_select_group(ctx, req),
        "view.back" => handle_back(ctx, req),
        "view.switchTab" => handle_switch_tab(ctx, req),
        _ => return None,
    };
    Some(Dispatch::Ready(resp))
}
