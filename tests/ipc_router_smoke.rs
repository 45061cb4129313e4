use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar_with_env(vars: &[(&str, &str)]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut cmd = Command::new(exe);
    for (k, v) in vars {
        cmd.env(k, v);
    }
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn read_response(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let value = read_response(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar_with_env(&[]);

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["result"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(health["result"]["sessions"], 0);

    let _ = request(&mut stdin, &mut reader, "2", "grades.deriveLetter", json!({ "marks": 75 }));
    let _ = request(&mut stdin, &mut reader, "3", "grades.computeGpa", json!({ "grades": [] }));
    let _ = request(&mut stdin, &mut reader, "4", "grades.scale", json!({}));
    let _ = request(&mut stdin, &mut reader, "5", "grades.reconcile", json!({ "grades": [] }));
    let _ = request(&mut stdin, &mut reader, "6", "transcript.summarize", json!({ "grades": [] }));
    let _ = request(&mut stdin, &mut reader, "7", "entry.open", json!({}));
    let _ = request(&mut stdin, &mut reader, "8", "entry.state", json!({ "sessionId": "missing" }));

    let enr = request(
        &mut stdin,
        &mut reader,
        "9",
        "requests.enrollments",
        json!({ "studentId": "S 001" }),
    );
    assert_eq!(
        enr["result"]["request"],
        json!({ "method": "GET", "path": "/enrollments/S%20001", "body": null })
    );

    let all = request(&mut stdin, &mut reader, "10", "requests.grades", json!({}));
    assert_eq!(all["result"]["request"]["path"], "/grades");
    let one = request(
        &mut stdin,
        &mut reader,
        "11",
        "requests.grades",
        json!({ "studentId": "S001" }),
    );
    assert_eq!(one["result"]["request"]["path"], "/grades/S001");

    let del = request(
        &mut stdin,
        &mut reader,
        "12",
        "requests.deleteGrade",
        json!({ "studentId": "S001", "courseId": "CS101", "semesterNo": "2" }),
    );
    assert_eq!(del["result"]["request"]["method"], "DELETE");
    assert_eq!(del["result"]["request"]["path"], "/grades/S001/CS101/2");

    let unknown = {
        writeln!(stdin, "{}", json!({ "id": "13", "method": "nope.nothing" })).expect("write");
        stdin.flush().expect("flush");
        read_response(&mut reader)
    };
    assert_eq!(unknown["error"]["code"], "not_implemented");

    writeln!(stdin, "this is not json").expect("write garbage");
    stdin.flush().expect("flush");
    let garbage = read_response(&mut reader);
    assert_eq!(garbage["ok"], false);
    assert_eq!(garbage["error"]["code"], "bad_json");

    let still_alive = request(&mut stdin, &mut reader, "14", "health", json!({}));
    assert_eq!(still_alive["ok"], true);
    assert_eq!(still_alive["result"]["sessions"], 1);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn session_cap_comes_from_environment() {
    let (mut child, mut stdin, mut reader) =
        spawn_sidecar_with_env(&[("GRADEBOOKD_MAX_SESSIONS", "1")]);

    let first = request(&mut stdin, &mut reader, "1", "entry.open", json!({}));
    assert_eq!(first["ok"], true);
    let second = request(&mut stdin, &mut reader, "2", "entry.open", json!({}));
    assert_eq!(second["error"]["code"], "too_many_sessions");

    let sid = first["result"]["sessionId"].as_str().expect("sessionId").to_string();
    let closed = request(&mut stdin, &mut reader, "3", "entry.close", json!({ "sessionId": sid }));
    assert_eq!(closed["ok"], true);
    let third = request(&mut stdin, &mut reader, "4", "entry.open", json!({}));
    assert_eq!(third["ok"], true);

    drop(stdin);
    let _ = child.wait();
}
