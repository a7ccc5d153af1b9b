use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tempfile::TempDir;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn clipvault_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("clipvault");
    path
}

/// Find an available port for the test server.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Write a config pointing at temp paths and return it with its TempDir.
fn setup_env(port: u16) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[db]
path = "{root}/data/clips.sqlite"

[storage]
root = "{root}/uploads"
public_base_url = "/uploads"

[server]
bind = "127.0.0.1:{port}"
max_body_bytes = 52428800

[analysis]
provider = "disabled"

[ingest]
max_file_bytes = 10485760
"#,
        root = root.display(),
        port = port,
    );

    let config_path = root.join("clipvault.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_clipvault(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = clipvault_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run clipvault binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Start the server in the background; callers must kill the child.
fn start_server(config_path: &Path) -> Child {
    let binary = clipvault_binary();
    Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("serve")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to start server: {}", e))
}

/// Wait for the server to be ready by polling the health endpoint.
fn wait_for_server(port: u16) {
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        std::thread::sleep(std::time::Duration::from_millis(100));
        if let Ok(resp) = reqwest::blocking::get(&url) {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn api_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api/clips", port)
}

fn upload_body(id: &str, filename: &str, file_type: &str, bytes: &[u8]) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "filename": filename,
        "file_type": file_type,
        "file_size": bytes.len(),
        "data_base64": BASE64.encode(bytes),
        "ai_summary": format!("summary of {}", filename),
        "ai_tags": ["first", "second"],
        "ai_category": "misc",
        "extracted_text": if file_type == "image" {
            serde_json::Value::Null
        } else {
            serde_json::Value::String("extracted".to_string())
        },
    })
}

fn post_clip(port: u16, body: &serde_json::Value) -> reqwest::blocking::Response {
    reqwest::blocking::Client::new()
        .post(api_url(port))
        .json(body)
        .send()
        .unwrap()
}

// ============ CLI ============

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_env(find_free_port());

    let (stdout, stderr, success) = run_clipvault(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/clips.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_env(find_free_port());

    let (_, _, success1) = run_clipvault(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_clipvault(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_search_empty_database() {
    let (_tmp, config_path) = setup_env(find_free_port());

    run_clipvault(&config_path, &["init"]);
    let (stdout, _, success) = run_clipvault(&config_path, &["search"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_cli_ingest_aborts_when_analysis_disabled() {
    let (tmp, config_path) = setup_env(find_free_port());
    run_clipvault(&config_path, &["init"]);

    let note = tmp.path().join("note.txt");
    fs::write(&note, "remember to water the plants").unwrap();

    let (_, stderr, success) = run_clipvault(&config_path, &["ingest", note.to_str().unwrap()]);
    assert!(!success, "ingest must fail with the disabled provider");
    assert!(
        stderr.contains("disabled"),
        "Should mention the disabled provider, got: {}",
        stderr
    );

    // A failed analysis leaves no row and no blob behind.
    let (stdout, _, _) = run_clipvault(&config_path, &["search"]);
    assert!(stdout.contains("No results"));
    let uploads: Vec<_> = fs::read_dir(tmp.path().join("uploads"))
        .map(|d| d.collect())
        .unwrap_or_default();
    assert!(uploads.is_empty(), "no blob may be written");
}

#[test]
fn test_cli_ingest_rejects_oversized_file() {
    let (tmp, config_path) = setup_env(find_free_port());

    // Shrink the ingest ceiling so the fixture stays small.
    let config_content = fs::read_to_string(&config_path)
        .unwrap()
        .replace("max_file_bytes = 10485760", "max_file_bytes = 16");
    fs::write(&config_path, config_content).unwrap();

    run_clipvault(&config_path, &["init"]);

    let big = tmp.path().join("big.txt");
    fs::write(&big, "this file is larger than sixteen bytes").unwrap();

    let (_, stderr, success) = run_clipvault(&config_path, &["ingest", big.to_str().unwrap()]);
    assert!(!success);
    assert!(
        stderr.contains("limit"),
        "Should mention the size limit, got: {}",
        stderr
    );
}

#[test]
fn test_cli_rm_missing_clip_fails() {
    let (_tmp, config_path) = setup_env(find_free_port());
    run_clipvault(&config_path, &["init"]);

    let (_, stderr, success) = run_clipvault(&config_path, &["rm", "ghost"]);
    assert!(!success);
    assert!(
        stderr.contains("not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_stats_on_empty_database() {
    let (_tmp, config_path) = setup_env(find_free_port());
    run_clipvault(&config_path, &["init"]);

    let (stdout, _, success) = run_clipvault(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Clips:"));
}

// ============ HTTP ============

#[test]
fn test_server_health() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    let resp = reqwest::blocking::get(format!("http://127.0.0.1:{}/health", port)).unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_upload_and_list_roundtrip() {
    let port = find_free_port();
    let (tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    let bytes = b"\x89PNG\r\n\x1a\nfake image bytes";
    let resp = post_clip(port, &upload_body("img1", "pixel.png", "image", bytes));
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["success"], true);

    let resp = reqwest::blocking::get(api_url(port)).unwrap();
    assert_eq!(resp.status(), 200);
    let clips: serde_json::Value = resp.json().unwrap();
    let clips = clips.as_array().unwrap();
    assert_eq!(clips.len(), 1);

    let clip = &clips[0];
    assert_eq!(clip["id"], "img1");
    assert_eq!(clip["filename"], "pixel.png");
    assert_eq!(clip["file_type"], "image");
    assert_eq!(clip["file_size"], bytes.len() as i64);
    assert_eq!(clip["storage_path"], "img1-pixel.png");
    assert_eq!(clip["thumbnail_url"], "/uploads/img1-pixel.png");
    assert_eq!(clip["ai_summary"], "summary of pixel.png");
    assert_eq!(
        clip["ai_tags"],
        serde_json::json!(["first", "second"]),
        "tags come back as an ordered array"
    );
    assert_eq!(clip["ai_category"], "misc");
    assert!(clip["created_at"].is_string());

    // The blob is written and served at the thumbnail address.
    assert!(tmp.path().join("uploads/img1-pixel.png").exists());
    let blob = reqwest::blocking::get(format!(
        "http://127.0.0.1:{}/uploads/img1-pixel.png",
        port
    ))
    .unwrap();
    assert_eq!(blob.status(), 200);
    assert_eq!(blob.bytes().unwrap().as_ref(), bytes);

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_text_clip_has_no_thumbnail() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    let resp = post_clip(port, &upload_body("t1", "note.txt", "text", b"hello"));
    assert_eq!(resp.status(), 201);

    let clips: serde_json::Value = reqwest::blocking::get(api_url(port)).unwrap().json().unwrap();
    assert!(clips[0]["thumbnail_url"].is_null());
    assert_eq!(clips[0]["extracted_text"], "extracted");

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_search_filters_combine_query_and_type() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    assert_eq!(
        post_clip(port, &upload_body("a", "foo-report.pdf", "pdf", b"p1")).status(),
        201
    );
    assert_eq!(
        post_clip(port, &upload_body("b", "foo-photo.png", "image", b"p2")).status(),
        201
    );
    assert_eq!(
        post_clip(port, &upload_body("c", "bar-notes.pdf", "pdf", b"p3")).status(),
        201
    );

    let client = reqwest::blocking::Client::new();

    // type alone
    let clips: serde_json::Value = client
        .get(api_url(port))
        .query(&[("type", "pdf")])
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(clips.as_array().unwrap().len(), 2);

    // query alone (case-insensitive)
    let clips: serde_json::Value = client
        .get(api_url(port))
        .query(&[("query", "FOO")])
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(clips.as_array().unwrap().len(), 2);

    // query AND type
    let clips: serde_json::Value = client
        .get(api_url(port))
        .query(&[("query", "foo"), ("type", "pdf")])
        .send()
        .unwrap()
        .json()
        .unwrap();
    let clips = clips.as_array().unwrap();
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0]["id"], "a");

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_listing_is_newest_first() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    // created_at has second granularity; spread the uploads out.
    for id in ["first", "second", "third"] {
        let body = upload_body(id, &format!("{}.txt", id), "text", b"x");
        assert_eq!(post_clip(port, &body).status(), 201);
        std::thread::sleep(std::time::Duration::from_millis(1100));
    }

    let clips: serde_json::Value = reqwest::blocking::get(api_url(port)).unwrap().json().unwrap();
    let ids: Vec<&str> = clips
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["third", "second", "first"]);

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_delete_removes_row_and_blob() {
    let port = find_free_port();
    let (tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    assert_eq!(
        post_clip(port, &upload_body("gone", "note.txt", "text", b"bye")).status(),
        201
    );
    assert!(tmp.path().join("uploads/gone-note.txt").exists());

    let client = reqwest::blocking::Client::new();
    let resp = client
        .delete(format!("{}/gone", api_url(port)))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["success"], true);

    assert!(!tmp.path().join("uploads/gone-note.txt").exists());
    let clips: serde_json::Value = reqwest::blocking::get(api_url(port)).unwrap().json().unwrap();
    assert!(clips.as_array().unwrap().is_empty());

    // Deleting again is a 404 with the fixed message.
    let resp = client
        .delete(format!("{}/gone", api_url(port)))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"], "Clip not found");

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_duplicate_id_is_conflict_and_leaves_first_clip_intact() {
    let port = find_free_port();
    let (tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    assert_eq!(
        post_clip(port, &upload_body("dup", "original.txt", "text", b"one")).status(),
        201
    );

    let resp = post_clip(port, &upload_body("dup", "imposter.txt", "text", b"two"));
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().unwrap();
    assert!(body["error"].is_string());

    // One row, one blob; no blob was written for the loser.
    let clips: serde_json::Value = reqwest::blocking::get(api_url(port)).unwrap().json().unwrap();
    let clips = clips.as_array().unwrap();
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0]["filename"], "original.txt");
    assert!(tmp.path().join("uploads/dup-original.txt").exists());
    assert!(!tmp.path().join("uploads/dup-imposter.txt").exists());

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_unknown_type_filter_is_bad_request() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    let resp = reqwest::blocking::Client::new()
        .get(api_url(port))
        .query(&[("type", "video")])
        .send()
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert!(body["error"].is_string());

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_invalid_base64_is_bad_request() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    let mut body = upload_body("bad", "note.txt", "text", b"x");
    body["data_base64"] = serde_json::json!("%%% not base64 %%%");
    let resp = post_clip(port, &body);
    assert_eq!(resp.status(), 400);

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_validation_failure_writes_nothing() {
    let port = find_free_port();
    let (tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    let mut body = upload_body("v1", "note.txt", "text", b"x");
    body["ai_summary"] = serde_json::json!("");
    let resp = post_clip(port, &body);
    assert_eq!(resp.status(), 400);

    let clips: serde_json::Value = reqwest::blocking::get(api_url(port)).unwrap().json().unwrap();
    assert!(clips.as_array().unwrap().is_empty());
    let uploads: Vec<_> = fs::read_dir(tmp.path().join("uploads")).unwrap().collect();
    assert!(uploads.is_empty(), "rejected upload must not leave a blob");

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_path_traversal_filename_rejected() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    let resp = post_clip(port, &upload_body("esc", "../escape.txt", "text", b"x"));
    assert_eq!(resp.status(), 400);

    server.kill().ok();
    server.wait().ok();
}

#[test]
fn test_cli_rm_after_http_upload() {
    let port = find_free_port();
    let (tmp, config_path) = setup_env(port);
    run_clipvault(&config_path, &["init"]);

    let mut server = start_server(&config_path);
    wait_for_server(port);

    assert_eq!(
        post_clip(port, &upload_body("x1", "note.txt", "text", b"hi")).status(),
        201
    );

    server.kill().ok();
    server.wait().ok();

    let (stdout, stderr, success) = run_clipvault(&config_path, &["rm", "x1"]);
    assert!(success, "rm failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("removed x1"));
    assert!(!tmp.path().join("uploads/x1-note.txt").exists());

    let (stdout, _, _) = run_clipvault(&config_path, &["search"]);
    assert!(stdout.contains("No results"));
}
