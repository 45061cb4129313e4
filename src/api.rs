//! Descriptions of the records API calls this crate feeds. Nothing here
//! performs I/O; the caller sends the request.

use serde_json::json;
use urlencoding::encode;

use crate::records::{GradeCreate, GradeKey, GradeUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    StudentEnrollments { student_id: String },
    AllGrades,
    StudentGrades { student_id: String },
    CreateGrade(GradeCreate),
    UpdateGrade { key: GradeKey, body: GradeUpdate },
    DeleteGrade(GradeKey),
}

impl ApiRequest {
    pub fn method(&self) -> Method {
        match self {
            ApiRequest::StudentEnrollments { .. }
            | ApiRequest::AllGrades
            | ApiRequest::StudentGrades { .. } => Method::Get,
            ApiRequest::CreateGrade(_) => Method::Post,
            ApiRequest::UpdateGrade { .. } => Method::Put,
            ApiRequest::DeleteGrade(_) => Method::Delete,
        }
    }

    pub fn path(&self) -> String {
        match self {
            ApiRequest::StudentEnrollments { student_id } => {
                format!("/enrollments/{}", encode(student_id))
            }
            ApiRequest::AllGrades | ApiRequest::CreateGrade(_) => "/grades".to_string(),
            ApiRequest::StudentGrades { student_id } => format!("/grades/{}", encode(student_id)),
            ApiRequest::UpdateGrade { key, .. } | ApiRequest::DeleteGrade(key) => grade_path(key),
        }
    }

    pub fn body(&self) -> Option<serde_json::Value> {
        let v = match self {
            ApiRequest::CreateGrade(b) => serde_json::to_value(b),
            ApiRequest::UpdateGrade { body, .. } => serde_json::to_value(body),
            _ => return None,
        };
        // Plain structs of strings and finite numbers always serialize.
        v.ok()
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "method": self.method().as_str(),
            "path": self.path(),
            "body": self.body(),
        })
    }
}

fn grade_path(key: &GradeKey) -> String {
    format!(
        "/grades/{}/{}/{}",
        encode(&key.student_id),
        encode(&key.course_id),
        key.semester_no
    )
}
