use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::records::GradeRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    F,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterTier {
    Excellent,
    Good,
    Pass,
    Fail,
}

/// Marks bands, highest first. The first band whose floor is met wins.
const BANDS: [(f64, LetterGrade); 6] = [
    (90.0, LetterGrade::APlus),
    (80.0, LetterGrade::A),
    (70.0, LetterGrade::BPlus),
    (60.0, LetterGrade::B),
    (50.0, LetterGrade::CPlus),
    (40.0, LetterGrade::C),
];

impl LetterGrade {
    pub const ALL: [LetterGrade; 7] = [
        LetterGrade::APlus,
        LetterGrade::A,
        LetterGrade::BPlus,
        LetterGrade::B,
        LetterGrade::CPlus,
        LetterGrade::C,
        LetterGrade::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::F => "F",
        }
    }

    pub fn points(self) -> f64 {
        match self {
            LetterGrade::APlus | LetterGrade::A => 4.0,
            LetterGrade::BPlus => 3.5,
            LetterGrade::B => 3.0,
            LetterGrade::CPlus => 2.5,
            LetterGrade::C => 2.0,
            LetterGrade::F => 0.0,
        }
    }

    pub fn tier(self) -> LetterTier {
        match self {
            LetterGrade::APlus | LetterGrade::A => LetterTier::Excellent,
            LetterGrade::BPlus | LetterGrade::B => LetterTier::Good,
            LetterGrade::CPlus | LetterGrade::C => LetterTier::Pass,
            LetterGrade::F => LetterTier::Fail,
        }
    }

    /// Lowest marks value that still maps to this letter.
    pub fn min_marks(self) -> f64 {
        BANDS
            .iter()
            .find(|(_, l)| *l == self)
            .map(|(floor, _)| *floor)
            .unwrap_or(0.0)
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLetter(pub String);

impl fmt::Display for UnknownLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown letter grade: {:?}", self.0)
    }
}

impl std::error::Error for UnknownLetter {}

impl FromStr for LetterGrade {
    type Err = UnknownLetter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        LetterGrade::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| UnknownLetter(s.to_string()))
    }
}

/// Marks to letter. Total over every f64: anything that meets no band
/// (including NaN) is an F. Range checks belong to the caller.
pub fn derive_letter(marks: f64) -> LetterGrade {
    for (floor, letter) in BANDS {
        if marks >= floor {
            return letter;
        }
    }
    LetterGrade::F
}

/// Point value for a letter as stored by the API. Letters outside the
/// table are worth nothing.
pub fn grade_point(letter: &str) -> f64 {
    letter
        .parse::<LetterGrade>()
        .map(LetterGrade::points)
        .unwrap_or(0.0)
}

/// Half-away-from-zero rounding to 2 decimals. Decimal halves such as 2.675
/// are stored just under the half, so the scaled value is nudged outward by a
/// few ulps before rounding.
pub fn round_2_decimal(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let scaled = x * 100.0;
    let nudge = scaled.abs().max(1.0) * f64::EPSILON * 8.0;
    (scaled + nudge.copysign(scaled)).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpaEntry {
    pub letter: String,
    pub credits: f64,
}

impl GpaEntry {
    pub fn new(letter: impl Into<String>, credits: f64) -> Self {
        Self {
            letter: letter.into(),
            credits,
        }
    }
}

pub fn compute_gpa<'a, I>(grades: I) -> f64
where
    I: IntoIterator<Item = &'a GpaEntry>,
{
    let mut weighted: f64 = 0.0;
    let mut total_credits: f64 = 0.0;
    for g in grades {
        weighted += grade_point(&g.letter) * g.credits;
        total_credits += g.credits;
    }
    if total_credits <= 0.0 {
        return 0.0;
    }
    round_2_decimal(weighted / total_credits)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleBand {
    pub letter: LetterGrade,
    pub min_marks: f64,
    pub points: f64,
    pub tier: LetterTier,
}

pub fn letter_scale() -> Vec<ScaleBand> {
    LetterGrade::ALL
        .into_iter()
        .map(|letter| ScaleBand {
            letter,
            min_marks: letter.min_marks(),
            points: letter.points(),
            tier: letter.tier(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedGrade {
    pub student_id: String,
    pub course_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    pub semester_no: i64,
    pub marks: f64,
    pub letter: LetterGrade,
    pub points: f64,
    pub tier: LetterTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_letter: Option<String>,
    pub stale: bool,
}

/// Recomputes the letter from marks. The stored letter is only reported;
/// a mismatch (including an unparseable letter) marks the row stale.
pub fn reconcile(row: &GradeRow) -> DerivedGrade {
    let letter = derive_letter(row.marks);
    let stale = match row.grade_letter.as_deref() {
        None => false,
        Some(stored) => stored.parse::<LetterGrade>().ok() != Some(letter),
    };
    DerivedGrade {
        student_id: row.student_id.clone(),
        course_id: row.course_id.clone(),
        course_name: row.course_name.clone(),
        semester_no: row.semester_no,
        marks: row.marks,
        letter,
        points: letter.points(),
        tier: letter.tier(),
        credits: row.credits,
        stored_letter: row.grade_letter.clone(),
        stale,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterGpa {
    pub semester_no: i64,
    pub gpa: f64,
    pub credits: f64,
    pub course_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub rows: Vec<DerivedGrade>,
    pub gpa: f64,
    pub total_credits: f64,
    pub semesters: Vec<SemesterGpa>,
    pub stale_count: usize,
    /// Rows without a credit count; shown but left out of every GPA.
    pub uncredited_count: usize,
}

pub fn summarize_transcript(rows: &[GradeRow]) -> TranscriptSummary {
    let derived: Vec<DerivedGrade> = rows.iter().map(reconcile).collect();

    let mut all: Vec<GpaEntry> = Vec::new();
    let mut by_semester: BTreeMap<i64, Vec<GpaEntry>> = BTreeMap::new();
    let mut uncredited_count = 0usize;
    for d in &derived {
        let Some(credits) = d.credits else {
            uncredited_count += 1;
            continue;
        };
        let entry = GpaEntry::new(d.letter.as_str(), credits);
        by_semester
            .entry(d.semester_no)
            .or_default()
            .push(entry.clone());
        all.push(entry);
    }

    let semesters = by_semester
        .into_iter()
        .map(|(semester_no, entries)| SemesterGpa {
            semester_no,
            gpa: compute_gpa(&entries),
            credits: entries.iter().map(|e| e.credits).sum(),
            course_count: entries.len(),
        })
        .collect();

    TranscriptSummary {
        gpa: compute_gpa(&all),
        total_credits: all.iter().map(|e| e.credits).sum(),
        stale_count: derived.iter().filter(|d| d.stale).count(),
        rows: derived,
        semesters,
        uncredited_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(course: &str, semester: i64, marks: f64, stored: Option<&str>, credits: Option<f64>) -> GradeRow {
        GradeRow {
            student_id: "S001".into(),
            course_id: course.into(),
            course_name: None,
            semester_no: semester,
            marks,
            grade_letter: stored.map(str::to_string),
            credits,
        }
    }

    #[test]
    fn derive_letter_band_boundaries() {
        assert_eq!(derive_letter(90.0), LetterGrade::APlus);
        assert_eq!(derive_letter(89.99), LetterGrade::A);
        assert_eq!(derive_letter(80.0), LetterGrade::A);
        assert_eq!(derive_letter(70.0), LetterGrade::BPlus);
        assert_eq!(derive_letter(69.999), LetterGrade::B);
        assert_eq!(derive_letter(50.0), LetterGrade::CPlus);
        assert_eq!(derive_letter(40.0), LetterGrade::C);
        assert_eq!(derive_letter(39.99), LetterGrade::F);
    }

    #[test]
    fn derive_letter_is_total_outside_range() {
        assert_eq!(derive_letter(150.0), LetterGrade::APlus);
        assert_eq!(derive_letter(-5.0), LetterGrade::F);
        assert_eq!(derive_letter(f64::NAN), LetterGrade::F);
        assert_eq!(derive_letter(f64::INFINITY), LetterGrade::APlus);
    }

    #[test]
    fn derive_letter_monotone_in_points() {
        let mut prev = f64::INFINITY;
        let mut x = 100.0;
        while x >= 0.0 {
            let p = derive_letter(x).points();
            assert!(p <= prev, "points rose at marks {x}");
            prev = p;
            x -= 0.25;
        }
    }

    #[test]
    fn derive_letter_is_repeatable() {
        for m in [0.0, 39.99, 55.5, 72.0, 99.0] {
            assert_eq!(derive_letter(m), derive_letter(m));
        }
    }

    #[test]
    fn round_2_decimal_halves_go_away_from_zero() {
        assert_eq!(round_2_decimal(2.675), 2.68);
        assert_eq!(round_2_decimal(1.005), 1.01);
        assert_eq!(round_2_decimal(-2.675), -2.68);
        assert_eq!(round_2_decimal(1.875), 1.88);
        assert_eq!(round_2_decimal(20.0 / 6.0), 3.33);
        assert_eq!(round_2_decimal(2.674), 2.67);
        assert_eq!(round_2_decimal(0.0), 0.0);
        assert_eq!(round_2_decimal(4.0), 4.0);
    }

    #[test]
    fn gpa_zero_when_no_credits() {
        let none: Vec<GpaEntry> = Vec::new();
        assert_eq!(compute_gpa(&none), 0.0);
        assert_eq!(compute_gpa(&[GpaEntry::new("F", 0.0)]), 0.0);
        assert_eq!(compute_gpa(&[GpaEntry::new("A", 0.0)]), 0.0);
    }

    #[test]
    fn gpa_weights_by_credits() {
        let grades = [GpaEntry::new("A", 4.0), GpaEntry::new("C", 2.0)];
        assert_eq!(compute_gpa(&grades), 3.33);
        assert_eq!(compute_gpa(&[GpaEntry::new("B+", 3.0)]), 3.5);
    }

    #[test]
    fn gpa_unknown_letter_counts_zero_points() {
        let grades = [GpaEntry::new("A", 3.0), GpaEntry::new("Z", 3.0)];
        assert_eq!(compute_gpa(&grades), 2.0);
    }

    #[test]
    fn letter_parse_accepts_case_and_spaces() {
        assert_eq!(" a+ ".parse::<LetterGrade>(), Ok(LetterGrade::APlus));
        assert_eq!("c".parse::<LetterGrade>(), Ok(LetterGrade::C));
        assert!("E".parse::<LetterGrade>().is_err());
        assert_eq!(grade_point("b+"), 3.5);
    }

    #[test]
    fn scale_floors_match_bands() {
        let scale = letter_scale();
        assert_eq!(scale.len(), 7);
        for band in &scale {
            assert_eq!(derive_letter(band.min_marks), band.letter);
        }
        assert_eq!(scale[6].min_marks, 0.0);
    }

    #[test]
    fn reconcile_flags_stale_letter() {
        let fresh = reconcile(&row("CS101", 1, 85.0, Some("A"), Some(4.0)));
        assert!(!fresh.stale);
        let stale = reconcile(&row("CS101", 1, 85.0, Some("B"), Some(4.0)));
        assert!(stale.stale);
        assert_eq!(stale.letter, LetterGrade::A);
        let missing = reconcile(&row("CS101", 1, 85.0, None, Some(4.0)));
        assert!(!missing.stale);
    }

    #[test]
    fn transcript_uses_derived_letters_and_groups_semesters() {
        let rows = vec![
            row("CS101", 1, 85.0, Some("C"), Some(4.0)),
            row("MA101", 1, 45.0, Some("C"), Some(2.0)),
            row("PH201", 2, 72.0, Some("B+"), Some(3.0)),
            row("EN100", 2, 95.0, Some("A+"), None),
        ];
        let t = summarize_transcript(&rows);
        assert_eq!(t.stale_count, 1);
        assert_eq!(t.uncredited_count, 1);
        assert_eq!(t.total_credits, 9.0);
        // (4*4 + 2*2 + 3.5*3) / 9
        assert_eq!(t.gpa, 3.39);
        assert_eq!(t.semesters.len(), 2);
        assert_eq!(t.semesters[0].semester_no, 1);
        assert_eq!(t.semesters[0].gpa, 3.33);
        assert_eq!(t.semesters[1].gpa, 3.5);
        assert_eq!(t.semesters[1].course_count, 1);
    }
}
