use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::store::GroupStore;
use serde_json::json;

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing params.{key}"), None))
}

pub fn required_bool(req: &Request, key: &str) -> Result<bool, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing params.{key}"), None))
}

pub fn loaded<'a>(state: &'a AppState, req: &Request) -> Result<&'a GroupStore, serde_json::Value> {
    state.store.as_ref().ok_or_else(|| {
        err(
            &req.id,
            "not_ready",
            "select a workspace and wait for it to load",
            None,
        )
    })
}

/// View state plus the selected class, so the shell can redraw from one reply.
pub fn view_json(state: &AppState) -> serde_json::Value {
    let selected = state
        .view
        .selected_group_id()
        .and_then(|id| state.store.as_ref()?.group(id));
    json!({
        "view": state.view,
        "selectedGroup": selected,
    })
}
