#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const WAIT: Duration = Duration::from_secs(15);

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// A running `bilhetesd` with its stdout drained on a background thread, so
/// replies can arrive out of order and interleave with events.
pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<Value>,
    replies: HashMap<String, Value>,
    pub events: Vec<Value>,
}

impl Sidecar {
    pub fn spawn(env: &[(&str, &str)]) -> Self {
        let exe = env!("CARGO_BIN_EXE_bilhetesd");
        let mut cmd = Command::new(exe);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .env_remove("BILHETES_ENDPOINT_URL");
        for (k, v) in env {
            cmd.env(k, v);
        }
        let mut child = cmd.spawn().expect("spawn bilhetesd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");

        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let value: Value = serde_json::from_str(line.trim()).expect("parse output json");
                if tx.send(value).is_err() {
                    break;
                }
            }
        });

        Self {
            child,
            stdin,
            lines,
            replies: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn send(&mut self, id: &str, method: &str, params: Value) {
        let payload = json!({ "id": id, "method": method, "params": params });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write raw line");
        self.stdin.flush().expect("flush raw line");
    }

    fn next_line(&mut self, deadline: Instant, what: &str) -> Value {
        let left = deadline.saturating_duration_since(Instant::now());
        match self.lines.recv_timeout(left) {
            Ok(v) => v,
            Err(RecvTimeoutError::Timeout) => panic!("timed out waiting for {what}"),
            Err(RecvTimeoutError::Disconnected) => panic!("sidecar exited while waiting for {what}"),
        }
    }

    /// Next line without an `id`.
    pub fn next_unkeyed(&mut self) -> Value {
        let deadline = Instant::now() + WAIT;
        loop {
            let v = self.next_line(deadline, "an unkeyed line");
            match v.get("id").and_then(|v| v.as_str()) {
                Some(id) => {
                    self.replies.insert(id.to_string(), v);
                }
                None => return v,
            }
        }
    }

    pub fn wait_reply(&mut self, id: &str) -> Value {
        if let Some(v) = self.replies.remove(id) {
            return v;
        }
        let deadline = Instant::now() + WAIT;
        loop {
            let v = self.next_line(deadline, id);
            match v.get("id").and_then(|v| v.as_str()) {
                Some(got) if got == id => return v,
                Some(other) => {
                    self.replies.insert(other.to_string(), v);
                }
                None => self.events.push(v),
            }
        }
    }

    pub fn wait_event(&mut self, name: &str) -> Value {
        if let Some(pos) = self.events.iter().position(|e| e["event"] == name) {
            return self.events.remove(pos);
        }
        let deadline = Instant::now() + WAIT;
        loop {
            let v = self.next_line(deadline, name);
            if let Some(id) = v.get("id").and_then(|v| v.as_str()) {
                self.replies.insert(id.to_string(), v);
            } else if v["event"] == name {
                return v;
            } else {
                self.events.push(v);
            }
        }
    }

    pub fn request(&mut self, id: &str, method: &str, params: Value) -> Value {
        self.send(id, method, params);
        let value = self.wait_reply(id);
        if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
            let code = value["error"]["code"].as_str().unwrap_or("unknown");
            assert_ne!(code, "not_implemented", "unexpected unknown method for {}", method);
        }
        value
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: Value) -> Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(Value::Null)
    }

    pub fn request_err(&mut self, id: &str, method: &str, params: Value) -> Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value.get("error").cloned().unwrap_or(Value::Null)
    }

    pub fn select_workspace(&mut self, path: &std::path::Path) -> Value {
        self.request_ok(
            "select",
            "workspace.select",
            json!({ "path": path.to_string_lossy() }),
        )
    }

    /// Closes stdin and waits for a clean exit.
    pub fn shutdown(mut self) {
        drop(self.stdin);
        let deadline = Instant::now() + WAIT;
        loop {
            match self.child.try_wait().expect("wait child") {
                Some(status) => {
                    assert!(status.success(), "bilhetesd exited with {status}");
                    return;
                }
                None if Instant::now() > deadline => {
                    let _ = self.child.kill();
                    panic!("bilhetesd did not exit after stdin closed");
                }
                None => std::thread::sleep(Duration::from_millis(20)),
            }
        }
    }
}

/// Spreadsheet proxy double with the same controls as the crate's in-process
/// `remote::mock::MockProxy`. The sidecar tests drive a child process with
/// blocking IO and have no runtime of their own, so `serve` runs axum on a
/// dedicated thread instead of the caller's runtime.
#[derive(Clone)]
pub struct MockProxy(Arc<Mutex<MockState>>);

struct MockState {
    pull_status: u16,
    pull_body: String,
    pull_delay: Duration,
    post_delay: Duration,
    pulls: Vec<HashMap<String, String>>,
    posts: Vec<(String, Value)>,
}

impl MockProxy {
    pub fn with_groups(groups: Value) -> Self {
        Self(Arc::new(Mutex::new(MockState {
            pull_status: 200,
            pull_body: json!({ "success": true, "groups": groups }).to_string(),
            pull_delay: Duration::ZERO,
            post_delay: Duration::ZERO,
            pulls: Vec::new(),
            posts: Vec::new(),
        })))
    }

    pub fn set_pull(&self, status: u16, body: impl Into<String>) {
        let mut s = self.0.lock().expect("mock lock");
        s.pull_status = status;
        s.pull_body = body.into();
    }

    pub fn set_pull_delay(&self, delay: Duration) {
        self.0.lock().expect("mock lock").pull_delay = delay;
    }

    pub fn set_post_delay(&self, delay: Duration) {
        self.0.lock().expect("mock lock").post_delay = delay;
    }

    pub fn pulls(&self) -> Vec<HashMap<String, String>> {
        self.0.lock().expect("mock lock").pulls.clone()
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.0.lock().expect("mock lock").posts.clone()
    }

    /// Starts serving and returns the endpoint URL.
    pub fn serve(&self) -> String {
        use axum::routing::get;
        use axum::Router;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("mock addr");
        let app = Router::new()
            .route("/exec", get(on_get).post(on_post))
            .with_state(self.clone());
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("mock runtime");
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                let _ = axum::serve(listener, app).await;
            });
        });
        format!("http://{addr}/exec")
    }
}

async fn on_get(
    State(proxy): State<MockProxy>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let (status, body, delay) = {
        let mut s = proxy.0.lock().expect("mock lock");
        s.pulls.push(query);
        (s.pull_status, s.pull_body.clone(), s.pull_delay)
    };
    tokio::time::sleep(delay).await;
    (StatusCode::from_u16(status).expect("status"), body)
}

async fn on_post(
    State(proxy): State<MockProxy>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> (StatusCode, String) {
    let delay = proxy.0.lock().expect("mock lock").post_delay;
    tokio::time::sleep(delay).await;
    let action = query.get("action").cloned().unwrap_or_default();
    let parsed = serde_json::from_str(&body).unwrap_or(Value::String(body));
    proxy.0.lock().expect("mock lock").posts.push((action, parsed));
    (StatusCode::OK, json!({ "success": true }).to_string())
}
