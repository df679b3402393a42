use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest executor status id that still means "queued or running".
pub const PENDING_STATUS_MAX: u32 = 2;

/// Reported in place of stdout when a finished job printed nothing.
pub const NO_OUTPUT: &str = "No Output";

/// Languages the practice sandbox accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    C,
    Cpp,
    Java,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Python, Language::C, Language::Cpp, Language::Java];

    /// Numeric language id understood by the remote executor
    pub fn executor_id(&self) -> u32 {
        match self {
            Language::Python => 71,
            Language::C => 50,
            Language::Cpp => 54,
            Language::Java => 62,
        }
    }

    /// Guess the language from a source file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Language::Python),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
        };
        f.write_str(name)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "c" => Ok(Language::C),
            "cpp" | "c++" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            other => Err(format!(
                "unsupported language '{}' (expected one of: python, c, cpp, java)",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Classroom backend records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(deserialize_with = "de_id")]
    pub id: i64,
    #[serde(default, deserialize_with = "de_text")]
    pub title: String,
    #[serde(default, deserialize_with = "de_text")]
    pub subject: String,
    #[serde(default, deserialize_with = "de_text")]
    pub description: String,
    #[serde(default, deserialize_with = "de_text")]
    pub due_date: String,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub year: Option<String>,
}

impl Assignment {
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.due_date)
    }

    /// A due date that does not parse is never past due.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at().map(|due| due < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(deserialize_with = "de_id")]
    pub id: i64,
    #[serde(deserialize_with = "de_id")]
    pub assignment_id: i64,
    /// Kept as text: the backend sends either a JSON string or a number.
    /// `null` becomes an empty id, which never matches a viewer.
    #[serde(default, deserialize_with = "de_text")]
    pub student_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub file_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub marks: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentLogin {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherLogin {
    #[serde(rename = "teacherId")]
    pub teacher_id: Option<i64>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarksUpdate {
    pub marks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub email: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailBatch {
    pub emails: Vec<EmailMessage>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    /// Legacy heuristic: four-character ids belong to teachers.
    ///
    /// Only used when the login response does not name a role.
    pub fn from_id_shape(user_id: &str) -> Self {
        if user_id.chars().count() == 4 {
            Role::Teacher
        } else {
            Role::Student
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Teacher => f.write_str("teacher"),
            Role::Student => f.write_str("student"),
        }
    }
}

/// Teachers with an id below this may pick any subject.
pub const OPEN_SUBJECT_TEACHER_ID: i64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    pub authenticated: bool,
    #[serde(default)]
    pub subject: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            authenticated: true,
            subject: None,
        }
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn numeric_user_id(&self) -> Option<i64> {
        parse_int_prefix(&self.user_id)
    }

    /// Whether the subject of a new assignment may be chosen freely instead
    /// of being pinned to the cached subject.
    pub fn subject_editable(&self) -> bool {
        let low_id = self
            .numeric_user_id()
            .map(|id| id < OPEN_SUBJECT_TEACHER_ID)
            .unwrap_or(false);
        low_id || self.subject.is_none()
    }
}

// ---------------------------------------------------------------------------
// Remote code executor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
}

impl JobRequest {
    pub fn new(source_code: impl Into<String>, language: Language) -> Self {
        Self {
            source_code: source_code.into(),
            language_id: language.executor_id(),
            stdin: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobCreated {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobStatusCode {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Queued,
    Running,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobStatusReport {
    pub status: JobStatusCode,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}

impl JobStatusReport {
    pub fn phase(&self) -> JobPhase {
        match self.status.id {
            0 | 1 => JobPhase::Queued,
            id if id <= PENDING_STATUS_MAX => JobPhase::Running,
            _ => JobPhase::Terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase() == JobPhase::Terminal
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse the leading integer of a string the way loosely typed frontends do:
/// leading whitespace is skipped, an optional sign is accepted, and the
/// longest run of digits is taken. `"101abc"` is 101, `"abc"` is `None`.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Accepts RFC 3339, `datetime-local` style values and plain dates.
/// Values without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Loose {
    fn into_text(self) -> String {
        match self {
            Loose::Int(v) => v.to_string(),
            Loose::Float(v) => v.to_string(),
            Loose::Text(v) => v,
        }
    }
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Loose::deserialize(deserializer)? {
        Loose::Int(v) => Ok(v),
        Loose::Float(v) if v.fract() == 0.0 => Ok(v as i64),
        Loose::Float(v) => Err(D::Error::custom(format!("id {} is not an integer", v))),
        Loose::Text(v) => v
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("id '{}' is not an integer", v))),
    }
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(de_opt_text(deserializer)?.unwrap_or_default())
}

fn de_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Loose>::deserialize(deserializer)?.map(Loose::into_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_language_executor_ids() {
        assert_eq!(Language::Python.executor_id(), 71);
        assert_eq!(Language::Cpp.executor_id(), 54);
        assert_eq!(Language::Java.executor_id(), 62);
        assert_eq!(Language::C.executor_id(), 50);
    }

    #[test]
    fn test_language_parse_and_display() {
        for lang in Language::ALL {
            assert_eq!(lang.to_string().parse::<Language>(), Ok(lang));
        }
        assert_eq!("C++".parse::<Language>(), Ok(Language::Cpp));
        assert!("rust".parse::<Language>().is_err());
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("txt"), None);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("101"), Some(101));
        assert_eq!(parse_int_prefix("  101abc"), Some(101));
        assert_eq!(parse_int_prefix("-7"), Some(-7));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(
            parse_timestamp("2024-01-01T05:30:00+05:30"),
            Some(midnight)
        );
        assert_eq!(parse_timestamp("next tuesday"), None);
    }

    #[test]
    fn test_unparsable_due_date_is_never_past_due() {
        let assignment: Assignment =
            serde_json::from_value(serde_json::json!({"id": 1, "dueDate": "soon"})).unwrap();
        assert!(!assignment.is_past_due(Utc::now()));
    }

    #[test]
    fn test_submission_accepts_numeric_and_text_ids() {
        let numeric: Submission = serde_json::from_value(serde_json::json!({
            "id": 4, "assignmentId": 9, "studentId": 101, "fileName": "a.pdf", "marks": 80
        }))
        .unwrap();
        assert_eq!(numeric.student_id, "101");
        assert_eq!(numeric.marks.as_deref(), Some("80"));

        let text: Submission = serde_json::from_value(serde_json::json!({
            "id": "4", "assignmentId": "9", "studentId": "s-101"
        }))
        .unwrap();
        assert_eq!(text.assignment_id, 9);
        assert_eq!(text.student_id, "s-101");
        assert_eq!(text.marks, None);
    }

    #[test]
    fn test_null_fields_do_not_sink_the_list() {
        let submissions: Vec<Submission> = serde_json::from_value(serde_json::json!([
            {"id": 1, "assignmentId": 9, "studentId": 101, "fileName": "a.pdf"},
            {"id": 2, "assignmentId": 9, "studentId": null, "fileName": null, "name": null},
        ]))
        .unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].student_id, "101");
        assert_eq!(submissions[1].student_id, "");
        assert_eq!(submissions[1].file_name, "");
        assert_eq!(parse_int_prefix(&submissions[1].student_id), None);

        let assignments: Vec<Assignment> = serde_json::from_value(serde_json::json!([
            {"id": 1, "title": null, "subject": "Maths", "description": null, "dueDate": null},
        ]))
        .unwrap();
        assert_eq!(assignments[0].title, "");
        assert!(!assignments[0].is_past_due(Utc::now()));
    }

    #[test]
    fn test_role_from_id_shape() {
        assert_eq!(Role::from_id_shape("1234"), Role::Teacher);
        assert_eq!(Role::from_id_shape("12345"), Role::Student);
        assert_eq!(Role::parse("Teacher"), Some(Role::Teacher));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_subject_editable() {
        let mut session = Session::new("1500", Role::Teacher);
        session.subject = Some("Physics".to_string());
        assert!(session.subject_editable());

        session.user_id = "2500".to_string();
        assert!(!session.subject_editable());

        session.subject = None;
        assert!(session.subject_editable());
    }

    #[test]
    fn test_job_phase_threshold() {
        let report = |id| JobStatusReport {
            status: JobStatusCode { id, description: String::new() },
            stdout: None,
            stderr: None,
        };
        assert_eq!(report(1).phase(), JobPhase::Queued);
        assert_eq!(report(2).phase(), JobPhase::Running);
        assert!(report(3).is_terminal());
        assert!(!report(PENDING_STATUS_MAX).is_terminal());
    }
}
