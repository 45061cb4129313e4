use crate::calc::{self, GpaEntry, LetterGrade};
use crate::ipc::error::{err, ok, record_err};
use crate::ipc::helpers::{parse_list, required_array};
use crate::ipc::types::{AppState, Request};
use crate::records::{parse_number, validate_credits, GradeRow, RecordError};
use serde_json::json;

fn handle_derive_letter(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("marks") else {
        return err(&req.id, "bad_params", "missing marks", None);
    };
    // Range is the caller's concern here; only the number itself is checked.
    let marks = match parse_number("marks", raw) {
        Ok(v) => v,
        Err(e) => return record_err(&req.id, &e, None),
    };
    let letter = calc::derive_letter(marks);
    ok(
        &req.id,
        json!({
            "marks": marks,
            "letter": letter,
            "points": letter.points(),
            "tier": letter.tier(),
        }),
    )
}

fn handle_compute_gpa(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let items = match required_array(req, "grades") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut entries: Vec<GpaEntry> = Vec::with_capacity(items.len());
    let mut unknown: Vec<String> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let Some(letter) = item.get("letter").and_then(|v| v.as_str()) else {
            return err(
                &req.id,
                "bad_params",
                format!("grades[{i}].letter must be a string"),
                Some(json!({ "index": i })),
            );
        };
        let credits = match item
            .get("credits")
            .ok_or(RecordError::NotNumeric { field: "credits" })
            .and_then(|v| parse_number("credits", v))
            .and_then(validate_credits)
        {
            Ok(v) => v,
            Err(e) => return record_err(&req.id, &e, Some(json!({ "index": i }))),
        };
        if letter.parse::<LetterGrade>().is_err() {
            unknown.push(letter.to_string());
        }
        entries.push(GpaEntry::new(letter, credits));
    }
    if !unknown.is_empty() {
        tracing::warn!(?unknown, "unknown letters count as zero points");
    }

    ok(
        &req.id,
        json!({
            "gpa": calc::compute_gpa(&entries),
            "totalCredits": entries.iter().map(|e| e.credits).sum::<f64>(),
            "count": entries.len(),
            "unknownLetters": unknown,
        }),
    )
}

fn handle_scale(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "bands": calc::letter_scale() }))
}

fn handle_reconcile(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let rows: Vec<GradeRow> = match parse_list(req, "grades") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let derived: Vec<_> = rows.iter().map(calc::reconcile).collect();
    let stale_count = derived.iter().filter(|d| d.stale).count();
    ok(
        &req.id,
        json!({
            "grades": derived,
            "staleCount": stale_count,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.deriveLetter" => Some(handle_derive_letter(state, req)),
        "grades.computeGpa" => Some(handle_compute_gpa(state, req)),
        "grades.scale" => Some(handle_scale(state, req)),
        "grades.reconcile" => Some(handle_reconcile(state, req)),
        _ => None,
    }
}
