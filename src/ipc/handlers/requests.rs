use crate::api::ApiRequest;
use crate::ipc::error::{ok, record_err};
use crate::ipc::helpers::{optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::records::{require_id, GradeKey};
use serde_json::json;

fn handle_enrollments(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = match require_id("studentId", raw) {
        Ok(v) => v,
        Err(e) => return record_err(&req.id, &e, None),
    };
    let r = ApiRequest::StudentEnrollments { student_id };
    ok(&req.id, json!({ "request": r.to_json() }))
}

fn handle_grades(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let r = match optional_str(req, "studentId") {
        Ok(None) => ApiRequest::AllGrades,
        Ok(Some(raw)) => match require_id("studentId", raw) {
            Ok(student_id) => ApiRequest::StudentGrades { student_id },
            Err(e) => return record_err(&req.id, &e, None),
        },
        Err(resp) => return resp,
    };
    ok(&req.id, json!({ "request": r.to_json() }))
}

fn handle_delete_grade(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_raw = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_raw = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let semester_no = match required_i64(req, "semesterNo") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let key = match require_id("studentId", student_raw)
        .and_then(|s| require_id("courseId", course_raw).map(|c| (s, c)))
    {
        Ok((student_id, course_id)) => GradeKey {
            student_id,
            course_id,
            semester_no,
        },
        Err(e) => return record_err(&req.id, &e, None),
    };
    ok(
        &req.id,
        json!({ "request": ApiRequest::DeleteGrade(key).to_json() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "requests.enrollments" => Some(handle_enrollments(state, req)),
        "requests.grades" => Some(handle_grades(state, req)),
        "requests.deleteGrade" => Some(handle_delete_grade(state, req)),
        _ => None,
    }
}
