//! Grade entry workflow.
//!
//! NoStudentSelected -> StudentSelected -> CourseSelected -> MarksEntered -> Submitted
//!
//! The semester on a new grade always comes from the enrollment the course was
//! picked from. Editing an existing grade starts at MarksEntered with the
//! student, course and semester fixed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::api::ApiRequest;
use crate::calc::{self, DerivedGrade, LetterGrade};
use crate::records::{
    require_id, validate_marks, Enrollment, GradeCreate, GradeKey, GradeRow, GradeUpdate,
    RecordError,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntryError {
    #[error("select a student first")]
    NoStudentSelected,
    #[error("select a course first")]
    NoCourseSelected,
    #[error("enter marks first")]
    NoMarks,
    #[error("student {student_id} is not enrolled in course {course_id}")]
    NotEnrolled {
        student_id: String,
        course_id: String,
        semester_no: Option<i64>,
    },
    #[error("student {student_id} is enrolled in course {course_id} in more than one semester")]
    AmbiguousCourse {
        student_id: String,
        course_id: String,
        semesters: Vec<i64>,
    },
    #[error("{field} cannot change while editing an existing grade")]
    Locked { field: &'static str },
    #[error("grade already submitted; reset the entry to start another")]
    AlreadySubmitted,
    #[error(transparent)]
    Record(#[from] RecordError),
}

impl EntryError {
    pub fn code(&self) -> &'static str {
        match self {
            EntryError::NoStudentSelected => "no_student_selected",
            EntryError::NoCourseSelected => "no_course_selected",
            EntryError::NoMarks => "no_marks",
            EntryError::NotEnrolled { .. } => "not_enrolled",
            EntryError::AmbiguousCourse { .. } => "ambiguous_course",
            EntryError::Locked { .. } => "locked",
            EntryError::AlreadySubmitted => "already_submitted",
            EntryError::Record(e) => e.code(),
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            EntryError::NotEnrolled {
                course_id,
                semester_no,
                ..
            } => Some(json!({ "courseId": course_id, "semesterNo": semester_no })),
            EntryError::AmbiguousCourse {
                course_id,
                semesters,
                ..
            } => Some(json!({ "courseId": course_id, "semesters": semesters })),
            EntryError::Locked { field } => Some(json!({ "field": field })),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    Create,
    Edit,
}

/// Where the grade will land.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeTarget {
    pub student_id: String,
    pub course_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    pub semester_no: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
}

impl GradeTarget {
    fn from_enrollment(e: &Enrollment) -> Self {
        Self {
            student_id: e.student_id.clone(),
            course_id: e.course_id.clone(),
            course_name: Some(e.course_name.clone()),
            semester_no: e.semester_no,
            academic_year: Some(e.academic_year.clone()),
            credits: Some(e.credits),
        }
    }

    fn from_grade(row: &GradeRow, student_id: String, course_id: String) -> Self {
        Self {
            student_id,
            course_id,
            course_name: row.course_name.clone(),
            semester_no: row.semester_no,
            academic_year: None,
            credits: row.credits,
        }
    }

    pub fn key(&self) -> GradeKey {
        GradeKey {
            student_id: self.student_id.clone(),
            course_id: self.course_id.clone(),
            semester_no: self.semester_no,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EntryState {
    NoStudentSelected,
    #[serde(rename_all = "camelCase")]
    StudentSelected {
        student_id: String,
        enrollments: Vec<Enrollment>,
    },
    #[serde(rename_all = "camelCase")]
    CourseSelected {
        student_id: String,
        enrollments: Vec<Enrollment>,
        target: GradeTarget,
    },
    /// In edit mode `enrollments` is empty; the target is fixed.
    #[serde(rename_all = "camelCase")]
    MarksEntered {
        enrollments: Vec<Enrollment>,
        target: GradeTarget,
        marks: f64,
        letter: LetterGrade,
    },
    #[serde(rename_all = "camelCase")]
    Submitted {
        target: GradeTarget,
        marks: f64,
        letter: LetterGrade,
        #[serde(skip)]
        request: ApiRequest,
    },
}

impl EntryState {
    pub fn name(&self) -> &'static str {
        match self {
            EntryState::NoStudentSelected => "noStudentSelected",
            EntryState::StudentSelected { .. } => "studentSelected",
            EntryState::CourseSelected { .. } => "courseSelected",
            EntryState::MarksEntered { .. } => "marksEntered",
            EntryState::Submitted { .. } => "submitted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GradeEntry {
    mode: EntryMode,
    state: EntryState,
    opened_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for GradeEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl GradeEntry {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            mode: EntryMode::Create,
            state: EntryState::NoStudentSelected,
            opened_at: now,
            updated_at: now,
        }
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    fn transition(&mut self, next: EntryState) {
        tracing::debug!(
            from = self.state.name(),
            to = next.name(),
            mode = ?self.mode,
            "grade entry transition"
        );
        self.state = next;
        self.updated_at = Utc::now();
    }

    /// Picks the student and loads their enrollments. Any course or marks
    /// chosen for the previous student are discarded.
    pub fn select_student(
        &mut self,
        student_id: &str,
        enrollments: Vec<Enrollment>,
    ) -> Result<&EntryState, EntryError> {
        if self.mode == EntryMode::Edit {
            return Err(EntryError::Locked { field: "student" });
        }
        if matches!(self.state, EntryState::Submitted { .. }) {
            return Err(EntryError::AlreadySubmitted);
        }
        let student_id = require_id("studentId", student_id)?;

        let total = enrollments.len();
        let enrollments: Vec<Enrollment> = enrollments
            .into_iter()
            .filter(|e| e.student_id.trim() == student_id)
            .collect();
        if enrollments.len() != total {
            tracing::warn!(
                student_id = %student_id,
                dropped = total - enrollments.len(),
                "ignoring enrollments that belong to another student"
            );
        }

        self.transition(EntryState::StudentSelected {
            student_id,
            enrollments,
        });
        Ok(&self.state)
    }

    /// Enrollments the course can be picked from.
    pub fn course_options(&self) -> &[Enrollment] {
        match &self.state {
            EntryState::StudentSelected { enrollments, .. }
            | EntryState::CourseSelected { enrollments, .. }
            | EntryState::MarksEntered { enrollments, .. } => enrollments,
            _ => &[],
        }
    }

    pub fn select_course(
        &mut self,
        course_id: &str,
        semester_no: Option<i64>,
    ) -> Result<&EntryState, EntryError> {
        if self.mode == EntryMode::Edit {
            return Err(EntryError::Locked { field: "course" });
        }
        let course_id = require_id("courseId", course_id)?;

        let (student_id, enrollments) = match &self.state {
            EntryState::NoStudentSelected => return Err(EntryError::NoStudentSelected),
            EntryState::Submitted { .. } => return Err(EntryError::AlreadySubmitted),
            EntryState::StudentSelected {
                student_id,
                enrollments,
            }
            | EntryState::CourseSelected {
                student_id,
                enrollments,
                ..
            } => (student_id.clone(), enrollments),
            EntryState::MarksEntered {
                enrollments,
                target,
                ..
            } => (target.student_id.clone(), enrollments),
        };

        let matches: Vec<&Enrollment> = enrollments
            .iter()
            .filter(|e| e.course_id.trim() == course_id)
            .collect();
        let picked = match (semester_no, matches.as_slice()) {
            (_, []) => None,
            (None, [only]) => Some(*only),
            (None, many) => {
                let mut semesters: Vec<i64> = many.iter().map(|e| e.semester_no).collect();
                semesters.sort_unstable();
                semesters.dedup();
                return Err(EntryError::AmbiguousCourse {
                    student_id,
                    course_id,
                    semesters,
                });
            }
            (Some(n), many) => many.iter().copied().find(|e| e.semester_no == n),
        };
        let Some(enrollment) = picked else {
            return Err(EntryError::NotEnrolled {
                student_id,
                course_id,
                semester_no,
            });
        };

        let target = GradeTarget::from_enrollment(enrollment);
        let enrollments = enrollments.clone();
        let next = match &self.state {
            EntryState::MarksEntered { marks, letter, .. } => EntryState::MarksEntered {
                enrollments,
                target,
                marks: *marks,
                letter: *letter,
            },
            _ => EntryState::CourseSelected {
                student_id,
                enrollments,
                target,
            },
        };
        self.transition(next);
        Ok(&self.state)
    }

    /// Records marks and re-derives the letter. Works in both modes.
    pub fn set_marks(&mut self, marks: f64) -> Result<LetterGrade, EntryError> {
        let (enrollments, target) = match &self.state {
            EntryState::NoStudentSelected => return Err(EntryError::NoStudentSelected),
            EntryState::StudentSelected { .. } => return Err(EntryError::NoCourseSelected),
            EntryState::Submitted { .. } => return Err(EntryError::AlreadySubmitted),
            EntryState::CourseSelected {
                enrollments,
                target,
                ..
            }
            | EntryState::MarksEntered {
                enrollments,
                target,
                ..
            } => (enrollments.clone(), target.clone()),
        };
        let marks = validate_marks(marks)?;
        let letter = calc::derive_letter(marks);
        self.transition(EntryState::MarksEntered {
            enrollments,
            target,
            marks,
            letter,
        });
        Ok(letter)
    }

    /// Loads an existing grade for editing. The letter is derived from the
    /// stored marks; the returned row says whether the stored letter was stale.
    pub fn begin_edit(&mut self, row: &GradeRow) -> Result<DerivedGrade, EntryError> {
        if matches!(self.state, EntryState::Submitted { .. }) {
            return Err(EntryError::AlreadySubmitted);
        }
        let student_id = require_id("studentId", &row.student_id)?;
        let course_id = require_id("courseId", &row.course_id)?;
        let marks = validate_marks(row.marks)?;
        let derived = calc::reconcile(row);
        if derived.stale {
            tracing::info!(
                student_id = %student_id,
                course_id = %course_id,
                semester_no = row.semester_no,
                stored = ?row.grade_letter,
                derived = %derived.letter,
                "stored letter disagrees with marks"
            );
        }

        self.mode = EntryMode::Edit;
        self.transition(EntryState::MarksEntered {
            enrollments: Vec::new(),
            target: GradeTarget::from_grade(row, student_id, course_id),
            marks,
            letter: derived.letter,
        });
        Ok(derived)
    }

    pub fn submit(&mut self) -> Result<ApiRequest, EntryError> {
        let (target, marks, letter) = match &self.state {
            EntryState::NoStudentSelected => return Err(EntryError::NoStudentSelected),
            EntryState::StudentSelected { .. } => return Err(EntryError::NoCourseSelected),
            EntryState::CourseSelected { .. } => return Err(EntryError::NoMarks),
            EntryState::Submitted { .. } => return Err(EntryError::AlreadySubmitted),
            EntryState::MarksEntered {
                target,
                marks,
                letter,
                ..
            } => (target.clone(), *marks, *letter),
        };

        let request = match self.mode {
            EntryMode::Create => ApiRequest::CreateGrade(GradeCreate {
                student_id: target.student_id.clone(),
                course_id: target.course_id.clone(),
                semester_no: target.semester_no,
                marks,
                grade_letter: letter,
            }),
            EntryMode::Edit => ApiRequest::UpdateGrade {
                key: target.key(),
                body: GradeUpdate {
                    marks,
                    grade_letter: letter,
                },
            },
        };

        self.transition(EntryState::Submitted {
            target,
            marks,
            letter,
            request: request.clone(),
        });
        Ok(request)
    }

    pub fn reset(&mut self) {
        self.mode = EntryMode::Create;
        self.transition(EntryState::NoStudentSelected);
    }

    pub fn snapshot(&self) -> serde_json::Value {
        let mut v = serde_json::to_value(&self.state).unwrap_or_else(|_| json!({}));
        v["state"] = json!(self.state.name());
        v["mode"] = json!(self.mode);
        v["openedAt"] = json!(self.opened_at.to_rfc3339());
        v["updatedAt"] = json!(self.updated_at.to_rfc3339());
        if let EntryState::Submitted { request, .. } = &self.state {
            v["request"] = request.to_json();
        }
        v
    }
}
