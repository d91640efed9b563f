mod test_support;

use serde_json::json;
use std::io::Write;
use test_support::{
    connect_memory, error_code, read_line, request, request_err, request_ok, spawn_sidecar,
    temp_dir,
};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("schoold-router-smoke");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health.get("version").and_then(|v| v.as_str()),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert_eq!(health.get("connected").and_then(|v| v.as_bool()), Some(false));

    let unknown = request_err(&mut stdin, &mut reader, "2", "results.frobnicate", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    // Every family answers its own methods, even when preconditions fail.
    for (i, method) in [
        "results.list",
        "results.reviewGroups",
        "results.setStatus",
        "results.forStudent",
        "resources.list",
        "drafts.list",
        "drafts.submit",
    ]
    .into_iter()
    .enumerate()
    {
        let id = format!("fam-{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, json!({}));
        let code = resp
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        assert_ne!(code, "not_implemented", "{} not routed", method);
    }

    let no_session = request_err(&mut stdin, &mut reader, "3", "results.list", json!({}));
    assert_eq!(error_code(&no_session), "no_session");
    let no_workspace = request_err(&mut stdin, &mut reader, "4", "drafts.list", json!({}));
    assert_eq!(error_code(&no_workspace), "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(workspace.join("schoold.sqlite3").is_file());

    let status = connect_memory(&mut stdin, &mut reader, "6", "admin", "principal");
    assert_eq!(status.get("role").and_then(|v| v.as_str()), Some("admin"));
    assert_eq!(status.get("backend").and_then(|v| v.as_str()), Some("memory"));
    assert_eq!(status.get("requestsSent").and_then(|v| v.as_u64()), Some(0));

    let listed = request_ok(&mut stdin, &mut reader, "7", "results.list", json!({}));
    assert_eq!(listed.get("count").and_then(|v| v.as_u64()), Some(0));

    let gone = request_ok(&mut stdin, &mut reader, "8", "session.disconnect", json!({}));
    assert_eq!(gone.get("disconnected").and_then(|v| v.as_bool()), Some(true));
    let status = request_ok(&mut stdin, &mut reader, "9", "session.status", json!({}));
    assert_eq!(status.get("connected").and_then(|v| v.as_bool()), Some(false));
}

#[test]
fn bad_json_line_is_answered_without_id() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    writeln!(stdin, "{{not json").expect("write");
    stdin.flush().expect("flush");
    let resp = read_line(&mut reader);
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert!(resp.get("id").is_none());
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("bad_json")
    );

    // The loop keeps serving after a bad line.
    let _ = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
}

#[test]
fn session_connect_rejects_bad_parameters() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let missing_role = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "session.connect",
        json!({ "backend": "memory" }),
    );
    assert_eq!(error_code(&missing_role), "bad_params");

    let bad_role = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "session.connect",
        json!({ "backend": "memory", "role": "janitor" }),
    );
    assert_eq!(error_code(&bad_role), "bad_params");

    let bad_backend = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "session.connect",
        json!({ "backend": "carrier-pigeon", "role": "admin" }),
    );
    assert_eq!(error_code(&bad_backend), "bad_params");

    let bad_pages = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "session.connect",
        json!({ "backend": "memory", "role": "admin", "maxPages": 0 }),
    );
    assert_eq!(error_code(&bad_pages), "bad_params");

    // An HTTP session only builds a client; nothing is sent until a read.
    let http = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "session.connect",
        json!({ "role": "teacher", "apiBase": "http://127.0.0.1:9/api/", "timeoutSecs": 1 }),
    );
    assert_eq!(http.get("backend").and_then(|v| v.as_str()), Some("http"));
    assert_eq!(
        http.get("target").and_then(|v| v.as_str()),
        Some("http://127.0.0.1:9/api")
    );

    let unreachable = request_err(&mut stdin, &mut reader, "6", "results.list", json!({}));
    assert_eq!(error_code(&unreachable), "network_error");
}
