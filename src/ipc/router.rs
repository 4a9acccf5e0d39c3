use super::handlers;
use super::types::{Context, Dispatch, Request};
use crate::ipc::error::err;

pub fn handle_request(ctx: &Context, req: Request) -> Dispatch {
    if let Some(resp) = handlers::core::try_handle(ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::groups::try_handle(ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::view::try_handle(ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::modal::try_handle(ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::sync::try_handle(ctx, &req) {
        return resp;
    }

    Dispatch::Ready(err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    ))
}
