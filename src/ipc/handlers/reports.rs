use crate::ipc::error::ok;
use crate::ipc::helpers::loaded;
use crate::ipc::types::{Context, Dispatch, Request};
use crate::report::compute_report;

fn handle_report_get(ctx: &Context, req: &Request) -> serde_json::Value {
    let state = ctx.lock();
    let store = match loaded(&state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let report = compute_report(store.groups());
    ok(
        &req.id,
        serde_json::to_value(report).unwrap_or(serde_json::Value::Null),
    )
}

pub fn try_handle(ctx: &Context, req: &Request) -> Option<Dispatch> {
    match req.method.as_str() {
        "report.get" => Some(Dispatch::Ready(handle_report_get(ctx, req))),
        _ => None,
    }
}
