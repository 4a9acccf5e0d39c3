mod test_support;

use serde_json::json;
use test_support::{temp_dir, Sidecar};

#[test]
fn first_start_seeds_default_roster_and_persists_it() {
    let workspace = temp_dir("bilhetes-startup-seed");

    let mut sidecar = Sidecar::spawn(&[]);
    let health = sidecar.request_ok("1", "health", json!({}));
    assert_eq!(health["remoteConfigured"], false);
    assert!(health["workspacePath"].is_null());

    let loaded = sidecar.select_workspace(&workspace);
    assert_eq!(loaded["source"], "seed");
    let groups = loaded["groups"].as_array().expect("groups");
    let shape: Vec<(&str, usize)> = groups
        .iter()
        .map(|g| {
            (
                g["name"].as_str().expect("name"),
                g["students"].as_array().expect("students").len(),
            )
        })
        .collect();
    assert_eq!(shape, vec![("10 A", 3), ("10 B", 2), ("11 A", 4)]);
    assert!(groups
        .iter()
        .flat_map(|g| g["students"].as_array().expect("students").iter())
        .all(|s| s["ticketCount"] == 0));
    assert_eq!(loaded["sync"]["isOnline"], true);
    assert_eq!(loaded["sync"]["isSyncing"], false);
    assert!(loaded["sync"]["lastSyncTimestamp"].is_null());
    assert!(workspace.join("bilhetes.sqlite3").is_file());

    let health = sidecar.request_ok("2", "health", json!({}));
    assert_eq!(health["pollerRunning"], false);
    sidecar.shutdown();

    let mut sidecar = Sidecar::spawn(&[]);
    let reloaded = sidecar.select_workspace(&workspace);
    assert_eq!(reloaded["source"], "local");
    assert_eq!(reloaded["groups"], loaded["groups"]);
    sidecar.shutdown();
}

#[test]
fn requests_before_loading_are_rejected() {
    let mut sidecar = Sidecar::spawn(&[]);

    for (i, method) in ["groups.list", "report.get", "sync.now"].iter().enumerate() {
        let error = sidecar.request_err(&format!("pre-{i}"), method, json!({}));
        assert_eq!(error["code"], "not_ready", "{method}");
    }
    let error = sidecar.request_err("sel", "view.selectGroup", json!({ "groupId": "1" }));
    assert_eq!(error["code"], "not_ready");

    let view = sidecar.request_ok("view", "view.get", json!({}));
    assert_eq!(view["view"]["screen"], "classList");
    assert!(view["selectedGroup"].is_null());
    sidecar.shutdown();
}

#[test]
fn malformed_input_gets_structured_errors() {
    let workspace = temp_dir("bilhetes-startup-errors");
    let mut sidecar = Sidecar::spawn(&[]);

    sidecar.send_raw("{ not json");
    let reply = sidecar.next_unkeyed();
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["error"]["code"], "bad_json");

    sidecar.send("u1", "tickets.explode", json!({}));
    let reply = sidecar.wait_reply("u1");
    assert_eq!(reply["error"]["code"], "not_implemented");

    let error = sidecar.request_err("p1", "workspace.select", json!({}));
    assert_eq!(error["code"], "bad_params");

    let blocked = workspace.join("not-a-dir");
    std::fs::write(&blocked, b"file").expect("write blocker");
    let error = sidecar.request_err(
        "p2",
        "workspace.select",
        json!({ "path": blocked.to_string_lossy() }),
    );
    assert_eq!(error["code"], "db_open_failed");

    sidecar.select_workspace(&workspace);
    let error = sidecar.request_err("p3", "groups.get", json!({}));
    assert_eq!(error["code"], "bad_params");
    let error = sidecar.request_err("p4", "groups.get", json!({ "groupId": "nope" }));
    assert_eq!(error["code"], "not_found");
    let error = sidecar.request_err("p5", "network.setOnline", json!({ "online": "yes" }));
    assert_eq!(error["code"], "bad_params");
    sidecar.shutdown();
}

#[test]
fn corrupt_local_payload_falls_back_to_seed() {
    let workspace = temp_dir("bilhetes-startup-corrupt");
    {
        let mut sidecar = Sidecar::spawn(&[]);
        sidecar.select_workspace(&workspace);
        sidecar.shutdown();
    }
    let conn = rusqlite::Connection::open(workspace.join("bilhetes.sqlite3")).expect("open db");
    conn.execute(
        "UPDATE kv_store SET value = ? WHERE key = 'escola-bilhetes'",
        ["{\"truncated\": ["],
    )
    .expect("corrupt payload");
    drop(conn);

    let mut sidecar = Sidecar::spawn(&[]);
    let loaded = sidecar.select_workspace(&workspace);
    assert_eq!(loaded["source"], "seed");
    assert_eq!(loaded["groups"].as_array().expect("groups").len(), 3);
    sidecar.shutdown();
}
