use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{loaded, required_str, view_json};
use crate::ipc::types::{Context, Dispatch, Request};
use crate::session;
use crate::view::{ModalAction, ViewError};
use serde_json::json;

fn handle_open(ctx: &Context, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mut guard = ctx.lock();
    let state = &mut *guard;
    let groups = match loaded(state, req) {
        Ok(s) => s.snapshot(),
        Err(resp) => return resp,
    };
    match state.view.tap_student(&groups, student_id) {
        Ok(()) => ok(&req.id, view_json(state)),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_modal_action(
    ctx: &Context,
    req: &Request,
    action: impl FnOnce(&mut crate::view::ViewController) -> Result<ModalAction, ViewError>,
) -> serde_json::Value {
    let mut state = ctx.lock();
    match action(&mut state.view) {
        Ok(outcome) => {
            let mut result = view_json(&state);
            result["ignored"] = json!(outcome == ModalAction::Ignored);
            ok(&req.id, result)
        }
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_confirm(ctx: &Context, req: &Request) -> Dispatch {
    let applied = {
        let mut state = ctx.lock();
        session::apply_confirm(&mut state)
    };
    let edit = match applied {
        Ok(Some(edit)) => edit,
        Ok(None) => {
            log::debug!("confirm ignored: a save is already running");
            let mut result = view_json(&ctx.lock());
            result["ignored"] = json!(true);
            return Dispatch::Ready(ok(&req.id, result));
        }
        Err(e) => return Dispatch::Ready(err(&req.id, e.code(), e.to_string(), None)),
    };

    let ctx = ctx.clone();
    let id = req.id.clone();
    Dispatch::deferred(async move {
        let pushed = session::push_confirmed(&ctx, &edit).await;

        let mut state = ctx.lock();
        state.view.finish_confirm();
        let group = state
            .store
            .as_ref()
            .and_then(|s| s.group(&edit.group.id))
            .cloned()
            .unwrap_or(edit.group);
        let mut result = view_json(&state);
        result["ignored"] = json!(false);
        result["group"] = json!(group);
        result["pushed"] = json!(pushed);
        ok(&id, result)
    })
}

pub fn try_handle(ctx: &Context, req: &Request) -> Option<Dispatch> {
    let resp = match req.method.as_str() {
        "modal.open" => handle_open(ctx, req),
        "modal.increment" => handle_modal_action(ctx, req, |v| v.increment()),
        "modal.decrement" => handle_modal_action(ctx, req, |v| v.decrement()),
        "modal.cancel" => handle_modal_action(ctx, req, |v| v.cancel()),
        "modal.confirm" => return Some(handle_confirm(ctx, req)),
        _ => return None,
    };
    Some(Dispatch::Ready(resp))
}
