mod config;
mod db;
mod ipc;
mod local;
mod model;
mod remote;
mod report;
mod session;
mod store;
mod sync;
mod view;

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; diagnostics go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = config::Config::from_env()?;
    log::info!(
        "bilhetesd {} starting (remote: {}, poll every {:?})",
        env!("CARGO_PKG_VERSION"),
        config
            .endpoint_url
            .as_ref()
            .map(|u| u.as_str())
            .unwrap_or("disabled"),
        config.poll_interval
    );

    let (outbox, mut lines_out) = mpsc::unbounded_channel::<serde_json::Value>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(msg) = lines_out.recv().await {
            let line = serde_json::to_string(&msg).unwrap_or_else(|_| "{\"ok\":false}".to_string());
            if stdout.write_all(line.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
                || stdout.flush().await.is_err()
            {
                break;
            }
        }
    });

    let ctx = ipc::Context::new(config, outbox.clone())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(v)) => v,
            Ok(None) => break,
            Err(e) => {
                log::warn!("stdin closed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let _ = outbox.send(serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }));
                continue;
            }
        };

        log::debug!("request {} {}", req.id, req.method);
        match ipc::handle_request(&ctx, req) {
            ipc::Dispatch::Ready(resp) => {
                let _ = outbox.send(resp);
            }
            ipc::Dispatch::Deferred(fut) => {
                let outbox = outbox.clone();
                tokio::spawn(async move {
                    let _ = outbox.send(fut.await);
                });
            }
        }
    }

    log::info!("stdin closed, shutting down");
    session::stop_poller(&ctx);
    drop(ctx);
    drop(outbox);
    // Let in-flight replies drain; a stuck remote call must not hold the process.
    let _ = tokio::time::timeout(Duration::from_secs(5), writer).await;
    Ok(())
}
