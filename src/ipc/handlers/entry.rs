use crate::entry::GradeEntry;
use crate::ipc::error::{entry_err, err, ok, record_err};
use crate::ipc::helpers::{optional_i64, parse_list, parse_object, required_str};
use crate::ipc::types::{AppState, Request};
use crate::records::{parse_marks, Enrollment, GradeRow};
use serde_json::json;
use uuid::Uuid;

fn session<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<(String, &'a mut GradeEntry), serde_json::Value> {
    let session_id = required_str(req, "sessionId")?.to_string();
    match state.sessions.get_mut(&session_id) {
        Some(entry) => Ok((session_id, entry)),
        None => Err(err(
            &req.id,
            "unknown_session",
            "grade entry session not found",
            Some(json!({ "sessionId": session_id })),
        )),
    }
}

fn handle_entry_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.sessions.len() >= state.config.max_sessions {
        return err(
            &req.id,
            "too_many_sessions",
            "close a grade entry session before opening another",
            Some(json!({ "maxSessions": state.config.max_sessions })),
        );
    }
    let session_id = Uuid::new_v4().to_string();
    let entry = GradeEntry::new();
    let snapshot = entry.snapshot();
    state.sessions.insert(session_id.clone(), entry);
    tracing::info!(session_id = %session_id, open = state.sessions.len(), "grade entry opened");
    ok(
        &req.id,
        json!({ "sessionId": session_id, "entry": snapshot }),
    )
}

fn handle_entry_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (session_id, entry) = match session(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    ok(
        &req.id,
        json!({ "sessionId": session_id, "entry": entry.snapshot() }),
    )
}

fn handle_entry_select_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let enrollments: Vec<Enrollment> = match parse_list(req, "enrollments") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session_id, entry) = match session(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(e) = entry.select_student(student_id, enrollments) {
        return entry_err(&req.id, &e);
    }

    let courses: Vec<serde_json::Value> = entry
        .course_options()
        .iter()
        .map(|e| {
            json!({
                "courseId": e.course_id,
                "courseName": e.course_name,
                "semesterNo": e.semester_no,
                "academicYear": e.academic_year,
                "credits": e.credits,
            })
        })
        .collect();
    ok(
        &req.id,
        json!({
            "sessionId": session_id,
            "courses": courses,
            "noEnrollments": courses.is_empty(),
            "entry": entry.snapshot(),
        }),
    )
}

fn handle_entry_select_course(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let semester_no = match optional_i64(req, "semesterNo") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session_id, entry) = match session(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(e) = entry.select_course(course_id, semester_no) {
        return entry_err(&req.id, &e);
    }
    ok(
        &req.id,
        json!({ "sessionId": session_id, "entry": entry.snapshot() }),
    )
}

fn handle_entry_set_marks(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("marks") else {
        return err(&req.id, "bad_params", "missing marks", None);
    };
    let marks = match parse_marks(raw) {
        Ok(v) => v,
        Err(e) => return record_err(&req.id, &e, Some(json!({ "field": "marks" }))),
    };
    let (session_id, entry) = match session(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let letter = match entry.set_marks(marks) {
        Ok(v) => v,
        Err(e) => return entry_err(&req.id, &e),
    };
    ok(
        &req.id,
        json!({
            "sessionId": session_id,
            "letter": letter,
            "points": letter.points(),
            "tier": letter.tier(),
            "entry": entry.snapshot(),
        }),
    )
}

fn handle_entry_begin_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let row: GradeRow = match parse_object(req, "grade") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session_id, entry) = match session(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let derived = match entry.begin_edit(&row) {
        Ok(v) => v,
        Err(e) => return entry_err(&req.id, &e),
    };
    ok(
        &req.id,
        json!({
            "sessionId": session_id,
            "letter": derived.letter,
            "storedLetter": derived.stored_letter,
            "stale": derived.stale,
            "entry": entry.snapshot(),
        }),
    )
}

fn handle_entry_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (session_id, entry) = match session(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let request = match entry.submit() {
        Ok(v) => v,
        Err(e) => return entry_err(&req.id, &e),
    };
    tracing::info!(
        session_id = %session_id,
        method = request.method().as_str(),
        path = %request.path(),
        "grade ready to send"
    );
    ok(
        &req.id,
        json!({
            "sessionId": session_id,
            "request": request.to_json(),
            "entry": entry.snapshot(),
        }),
    )
}

fn handle_entry_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (session_id, entry) = match session(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    entry.reset();
    ok(
        &req.id,
        json!({ "sessionId": session_id, "entry": entry.snapshot() }),
    )
}

fn handle_entry_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session_id = match required_str(req, "sessionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if state.sessions.remove(session_id).is_none() {
        return err(
            &req.id,
            "unknown_session",
            "grade entry session not found",
            Some(json!({ "sessionId": session_id })),
        );
    }
    tracing::info!(session_id, open = state.sessions.len(), "grade entry closed");
    ok(&req.id, json!({ "sessionId": session_id, "closed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "entry.open" => Some(handle_entry_open(state, req)),
        "entry.state" => Some(handle_entry_state(state, req)),
        "entry.selectStudent" => Some(handle_entry_select_student(state, req)),
        "entry.selectCourse" => Some(handle_entry_select_course(state, req)),
        "entry.setMarks" => Some(handle_entry_set_marks(state, req)),
        "entry.beginEdit" => Some(handle_entry_begin_edit(state, req)),
        "entry.submit" => Some(handle_entry_submit(state, req)),
        "entry.reset" => Some(handle_entry_reset(state, req)),
        "entry.close" => Some(handle_entry_close(state, req)),
        _ => None,
    }
}
