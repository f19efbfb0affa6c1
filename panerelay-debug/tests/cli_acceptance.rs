use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn fixture(dir: &str, name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../panerelay-core/tests/fixtures")
        .join(dir)
        .join(name)
}

fn bin_path(bin_name: &str) -> PathBuf {
    match bin_name {
        "panerelay-debug-tail" => PathBuf::from(assert_cmd::cargo::cargo_bin!("panerelay-debug-tail")),
        "panerelay-debug-screen" => {
            PathBuf::from(assert_cmd::cargo::cargo_bin!("panerelay-debug-screen"))
        }
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    }
}

fn run_bin(home: &TempDir, bin_name: &str, args: &[&str]) -> Output {
    Command::new(bin_path(bin_name))
        .args(args)
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("xdg-config"))
        .env("XDG_DATA_HOME", home.path().join("xdg-data"))
        .env("XDG_STATE_HOME", home.path().join("xdg-state"))
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn write_config(home: &TempDir, contents: &str) {
    let dir = home.path().join("xdg-config/panerelay");
    fs::create_dir_all(&dir).expect("failed to create config dir");
    fs::write(dir.join("config.toml"), contents).expect("failed to write config");
}

fn parse_batch(output: &Output) -> serde_json::Value {
    serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim())
        .expect("stdout should be one JSON document")
}

fn assert_success(bin_name: &str, output: &Output) {
    if output.status.success() {
        return;
    }
    panic!(
        "{bin_name} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn tail_prints_decoded_claude_messages() {
    let home = TempDir::new().expect("failed to create temp dir");
    let path = fixture("claude-code", "tool-session.jsonl");
    let path_str = path.to_string_lossy().to_string();

    let output = run_bin(
        &home,
        "panerelay-debug-tail",
        &[&path_str, "--memory", "--compact"],
    );
    assert_success("panerelay-debug-tail", &output);

    let batch = parse_batch(&output);

    assert_eq!(batch["session_id"], "tool-session");
    assert_eq!(batch["outcome"], "read");
    assert_eq!(batch["lines"], 7);
    let messages = batch["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0]["text"], "Hello, can you list the files?");
    assert!(batch.get("pending_tools").is_none());
}

#[test]
fn tail_persists_offsets_in_database() {
    let home = TempDir::new().expect("failed to create temp dir");
    let db_path = home.path().join("state.db");
    let db_str = db_path.to_string_lossy().to_string();
    let path = fixture("claude-code", "tool-session.jsonl");
    let path_str = path.to_string_lossy().to_string();
    let args = [path_str.as_str(), "--db", db_str.as_str(), "--compact"];

    assert_success("panerelay-debug-tail", &run_bin(&home, "panerelay-debug-tail", &args));

    // Second run resumes at the stored offset
    let output = run_bin(&home, "panerelay-debug-tail", &args);
    assert_success("panerelay-debug-tail", &output);
    let batch = parse_batch(&output);
    assert_eq!(batch["lines"], 0);
    assert_eq!(batch["messages"].as_array().map(Vec::len), Some(0));
}

#[test]
fn tail_defaults_to_database_in_data_dir() {
    let home = TempDir::new().expect("failed to create temp dir");
    let path = fixture("claude-code", "tool-session.jsonl");
    let path_str = path.to_string_lossy().to_string();
    let args = [path_str.as_str(), "--compact"];

    let output = run_bin(&home, "panerelay-debug-tail", &args);
    assert_success("panerelay-debug-tail", &output);
    assert_eq!(parse_batch(&output)["lines"], 7);
    assert!(home.path().join("xdg-data/panerelay/state.db").exists());

    let output = run_bin(&home, "panerelay-debug-tail", &args);
    assert_success("panerelay-debug-tail", &output);
    assert_eq!(parse_batch(&output)["lines"], 0);
}

#[test]
fn tail_honors_config_database_path_and_start_at_end() {
    let home = TempDir::new().expect("failed to create temp dir");
    let db_path = home.path().join("configured/relay.db");
    write_config(
        &home,
        &format!(
            "[tailer]\nstart_at_end = true\n\n[state]\ndatabase_path = {:?}\n",
            db_path
        ),
    );
    let path = fixture("claude-code", "tool-session.jsonl");
    let path_str = path.to_string_lossy().to_string();

    let output = run_bin(&home, "panerelay-debug-tail", &[&path_str, "--compact"]);
    assert_success("panerelay-debug-tail", &output);

    let batch = parse_batch(&output);
    assert_eq!(batch["lines"], 0);
    assert_eq!(batch["from_offset"], batch["to_offset"]);
    assert!(batch["to_offset"].as_u64().unwrap() > 0);
    assert!(db_path.exists());
    assert!(!home.path().join("xdg-data/panerelay/state.db").exists());
}

#[test]
fn tail_rejects_invalid_config() {
    let home = TempDir::new().expect("failed to create temp dir");
    write_config(&home, "[providers]\ndefault = \"aider\"\n");
    let path = fixture("claude-code", "tool-session.jsonl");
    let path_str = path.to_string_lossy().to_string();

    let output = run_bin(&home, "panerelay-debug-tail", &[&path_str, "--memory"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid config"));
}

#[test]
fn tail_rejects_provider_without_transcript() {
    let home = TempDir::new().expect("failed to create temp dir");
    let path = fixture("claude-code", "tool-session.jsonl");
    let path_str = path.to_string_lossy().to_string();

    let output = run_bin(
        &home,
        "panerelay-debug-tail",
        &[&path_str, "--memory", "--provider", "gemini"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("structured transcript"));
}

#[test]
fn screen_classifies_permission_prompt() {
    let home = TempDir::new().expect("failed to create temp dir");
    let path = fixture("screens", "permission.txt");
    let path_str = path.to_string_lossy().to_string();

    let output = run_bin(&home, "panerelay-debug-screen", &[&path_str, "--compact"]);
    assert_success("panerelay-debug-screen", &output);

    let result: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert_eq!(result["provider"], "claude");
    assert_eq!(result["interactive"], true);
    assert_eq!(result["status"]["ui_type"], "PermissionPrompt");
}

#[test]
fn screen_uses_configured_default_provider() {
    let home = TempDir::new().expect("failed to create temp dir");
    write_config(&home, "[providers]\ndefault = \"codex\"\n");
    let path = fixture("screens", "spinner.txt");
    let path_str = path.to_string_lossy().to_string();

    let output = run_bin(&home, "panerelay-debug-screen", &[&path_str, "--compact"]);
    assert_success("panerelay-debug-screen", &output);
    assert_eq!(parse_batch(&output)["provider"], "codex");
}

#[test]
fn screen_reads_stdin() {
    let home = TempDir::new().expect("failed to create temp dir");
    let mut child = Command::new(bin_path("panerelay-debug-screen"))
        .args(["--compact"])
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("xdg-config"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn panerelay-debug-screen");

    let text = fs::read_to_string(fixture("screens", "spinner.txt")).unwrap();
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(text.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert_success("panerelay-debug-screen", &output);

    let result: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert_eq!(result["interactive"], false);
    assert_eq!(result["status"]["display_label"], "Reading file…");
}
