use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{loaded, required_str};
use crate::ipc::types::{Context, Dispatch, Request};
use crate::model::GroupSummary;
use serde_json::json;

fn handle_groups_list(ctx: &Context, req: &Request) -> serde_json::Value {
    let state = ctx.lock();
    let store = match loaded(&state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let groups: Vec<GroupSummary> = store.groups().iter().map(|g| g.summary()).collect();
    let total: u64 = groups.iter().map(|g| g.total_tickets).sum();
    ok(&req.id, json!({ "groups": groups, "totalTickets": total }))
}

fn handle_groups_get(ctx: &Context, req: &Request) -> serde_json::Value {
    let group_id = match required_str(req, "groupId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let state = ctx.lock();
    let store = match loaded(&state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.group(group_id) {
        Some(group) => ok(&req.id, json!({ "group": group })),
        None => err(&req.id, "not_found", "group not found", None),
    }
}

pub fn try_handle(ctx: &Context, req: &Request) -> Option<Dispatch> {
    let resp = match req.method.as_str() {
        "groups.list" => handle_groups_list(ctx, req),
        "groups.get" => handle_groups_get(ctx, req),
        _ => return None,
    };
    Some(Dispatch::Ready(resp))
}
