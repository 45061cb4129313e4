use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, parse_list};
use crate::ipc::types::{AppState, Request};
use crate::records::GradeRow;
use serde_json::json;

fn handle_transcript_summarize(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match optional_str(req, "studentId") {
        Ok(v) => v.map(str::trim),
        Err(resp) => return resp,
    };
    let rows: Vec<GradeRow> = match parse_list(req, "grades") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // A transcript is one student's; mixing rows would blend GPAs.
    if let Some(sid) = student_id {
        if let Some(other) = rows.iter().find(|r| r.student_id.trim() != sid) {
            return err(
                &req.id,
                "bad_params",
                format!("grade row for student {} in transcript of {sid}", other.student_id),
                Some(json!({ "studentId": other.student_id })),
            );
        }
    }

    let summary = calc::summarize_transcript(&rows);
    if summary.stale_count > 0 {
        tracing::info!(
            stale = summary.stale_count,
            "transcript has stored letters that disagree with marks"
        );
    }
    match serde_json::to_value(&summary) {
        Ok(mut v) => {
            v["studentId"] = json!(student_id);
            ok(&req.id, v)
        }
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "transcript.summarize" => Some(handle_transcript_summarize(state, req)),
        _ => None,
    }
}
