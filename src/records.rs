//! Typed records for the JSON the records API hands out and accepts.
//!
//! Read shapes accept the API's column-style keys (`Student_ID`, `Marks`, ...)
//! as well as the snake_case request keys. Numeric columns may arrive as
//! numbers or numeric strings.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::calc::LetterGrade;

pub const MARKS_MIN: f64 = 0.0;
pub const MARKS_MAX: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("{field} must be a number")]
    NotNumeric { field: &'static str },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
    #[error("{field} must be an integer")]
    NotInteger { field: &'static str },
    #[error("marks must be between 0 and 100, got {0}")]
    MarksOutOfRange(f64),
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

impl RecordError {
    pub fn code(&self) -> &'static str {
        match self {
            RecordError::MarksOutOfRange(_) => "bad_marks",
            _ => "bad_params",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(alias = "Student_ID", alias = "student_id")]
    pub student_id: String,
    #[serde(alias = "Course_ID", alias = "course_id")]
    pub course_id: String,
    #[serde(alias = "Course_Name", alias = "course_name")]
    pub course_name: String,
    #[serde(alias = "Semester_No", alias = "semester_no", deserialize_with = "de_int")]
    pub semester_no: i64,
    #[serde(alias = "Academic_Year", alias = "academic_year")]
    pub academic_year: String,
    #[serde(alias = "Credits", deserialize_with = "de_credits")]
    pub credits: f64,
    #[serde(
        default,
        alias = "Enrollment_Date",
        alias = "enrollment_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub enrollment_date: Option<String>,
}

/// A grade as the read paths return it, optionally joined with the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRow {
    #[serde(alias = "Student_ID", alias = "student_id")]
    pub student_id: String,
    #[serde(alias = "Course_ID", alias = "course_id")]
    pub course_id: String,
    #[serde(
        default,
        alias = "Course_Name",
        alias = "course_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub course_name: Option<String>,
    #[serde(alias = "Semester_No", alias = "semester_no", deserialize_with = "de_int")]
    pub semester_no: i64,
    #[serde(alias = "Marks", deserialize_with = "de_number")]
    pub marks: f64,
    #[serde(
        default,
        alias = "Grade_Letter",
        alias = "grade_letter",
        skip_serializing_if = "Option::is_none"
    )]
    pub grade_letter: Option<String>,
    #[serde(
        default,
        alias = "Credits",
        deserialize_with = "de_opt_credits",
        skip_serializing_if = "Option::is_none"
    )]
    pub credits: Option<f64>,
}

impl GradeRow {
    pub fn key(&self) -> GradeKey {
        GradeKey {
            student_id: self.student_id.clone(),
            course_id: self.course_id.clone(),
            semester_no: self.semester_no,
        }
    }
}

/// (student, course, semester): the identity of a grade and of its enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeKey {
    pub student_id: String,
    pub course_id: String,
    pub semester_no: i64,
}

/// `POST /grades` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCreate {
    pub student_id: String,
    pub course_id: String,
    pub semester_no: i64,
    pub marks: f64,
    pub grade_letter: LetterGrade,
}

/// `PUT /grades/{studentId}/{courseId}/{semesterNo}` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeUpdate {
    pub marks: f64,
    pub grade_letter: LetterGrade,
}

pub fn number_from_value(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn parse_number(field: &'static str, v: &serde_json::Value) -> Result<f64, RecordError> {
    let n = number_from_value(v).ok_or(RecordError::NotNumeric { field })?;
    if !n.is_finite() {
        return Err(RecordError::NotFinite { field });
    }
    Ok(n)
}

/// Form-boundary check for entered marks: numeric, finite, within [0, 100].
pub fn parse_marks(v: &serde_json::Value) -> Result<f64, RecordError> {
    let marks = parse_number("marks", v)?;
    validate_marks(marks)
}

pub fn validate_marks(marks: f64) -> Result<f64, RecordError> {
    if !marks.is_finite() {
        return Err(RecordError::NotFinite { field: "marks" });
    }
    if !(MARKS_MIN..=MARKS_MAX).contains(&marks) {
        return Err(RecordError::MarksOutOfRange(marks));
    }
    Ok(marks)
}

pub fn validate_credits(credits: f64) -> Result<f64, RecordError> {
    if !credits.is_finite() {
        return Err(RecordError::NotFinite { field: "credits" });
    }
    if credits < 0.0 {
        return Err(RecordError::Negative {
            field: "credits",
            value: credits,
        });
    }
    Ok(credits)
}

pub fn require_id(field: &'static str, raw: &str) -> Result<String, RecordError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(RecordError::Empty { field });
    }
    Ok(t.to_string())
}

fn de_number<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    number_from_value(&v)
        .filter(|n| n.is_finite())
        .ok_or_else(|| D::Error::custom(format!("expected a number, got {v}")))
}

fn de_opt_number<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    if v.is_null() {
        return Ok(None);
    }
    number_from_value(&v)
        .filter(|n| n.is_finite())
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected a number or null, got {v}")))
}

fn de_credits<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let credits = de_number(d)?;
    validate_credits(credits).map_err(D::Error::custom)
}

fn de_opt_credits<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match de_opt_number(d)? {
        Some(credits) => validate_credits(credits).map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}

fn de_int<'de, D>(d: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    let n = match &v {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    n.ok_or_else(|| D::Error::custom(format!("expected an integer, got {v}")))
}
