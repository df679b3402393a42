// Form collection and file packaging for uploads.
// Everything here runs before the network is touched.

use crate::error::ValidationError;
use edutrack_common::types::{parse_timestamp, Session};
use std::path::{Path, PathBuf};

pub const MAX_MARKS: u32 = 100;
pub const YEARS: std::ops::RangeInclusive<u8> = 1..=4;

/// A file read into memory, ready for a multipart part.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl FilePayload {
    pub async fn read(path: &Path) -> Result<Self, ValidationError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ValidationError::FileNotFound(path.to_path_buf())
            } else {
                ValidationError::Invalid(format!("could not read {}: {}", path.display(), e))
            }
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            file_name,
            bytes,
            mime: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        })
    }

    pub fn renamed(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

fn require_pdf(path: &Path) -> Result<(), ValidationError> {
    if extension(path).as_deref() == Some("pdf") {
        Ok(())
    } else {
        Err(ValidationError::Invalid(format!(
            "{} is not a PDF file",
            path.display()
        )))
    }
}

/// Name the uploaded assignment file `{title}-{subject}.{ext}`.
pub fn upload_file_name(title: &str, subject: &str, source: &Path) -> String {
    let ext = extension(source).unwrap_or_else(|| "pdf".to_string());
    format!("{}-{}.{}", title.trim(), subject.trim(), ext)
}

#[derive(Debug, Clone)]
pub struct AssignmentForm {
    pub title: String,
    pub subject: Option<String>,
    pub description: String,
    pub due_date: String,
    pub year: u8,
    pub file: PathBuf,
}

impl AssignmentForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        required(&self.title, "title")?;
        required(&self.description, "description")?;
        required(&self.due_date, "due date")?;
        if parse_timestamp(&self.due_date).is_none() {
            return Err(ValidationError::Invalid(format!(
                "due date '{}' is not a valid date (use YYYY-MM-DD or YYYY-MM-DDTHH:MM)",
                self.due_date
            )));
        }
        if !YEARS.contains(&self.year) {
            return Err(ValidationError::Invalid(format!(
                "year must be between {} and {}",
                YEARS.start(),
                YEARS.end()
            )));
        }
        require_pdf(&self.file)
    }

    /// Subject used in the uploaded file name: the cached session subject
    /// when there is one, even if the form subject was editable.
    pub fn file_subject(&self, session: &Session) -> Result<String, ValidationError> {
        match &session.subject {
            Some(subject) if !subject.trim().is_empty() => Ok(subject.trim().to_string()),
            _ => self.resolve_subject(session),
        }
    }

    /// The subject the assignment is filed under. Teachers pinned to a
    /// cached subject always get that subject; everyone else must type one.
    pub fn resolve_subject(&self, session: &Session) -> Result<String, ValidationError> {
        if !session.subject_editable() {
            if let Some(subject) = &session.subject {
                return Ok(subject.clone());
            }
        }
        let subject = self.subject.as_deref().unwrap_or_default();
        required(subject, "subject")?;
        Ok(subject.trim().to_string())
    }
}

/// Multipart body for `POST /api/pdf/upload`
#[derive(Debug, Clone)]
pub struct AssignmentUpload {
    pub title: String,
    pub subject: String,
    pub description: String,
    pub due_date: String,
    pub year: u8,
    pub file: FilePayload,
}

/// Multipart body for `POST /api/submission/upload`
#[derive(Debug, Clone)]
pub struct SubmissionUpload {
    pub assignment_id: i64,
    pub student_id: String,
    pub name: String,
    pub marks: u32,
    pub file: FilePayload,
}

#[derive(Debug, Clone)]
pub struct NewStudentForm {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub year: String,
    pub mobile_no: String,
    pub password: String,
    pub image: Option<PathBuf>,
}

impl NewStudentForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        required(&self.user_id, "user id")?;
        required(&self.name, "name")?;
        required(&self.email, "email")?;
        required(&self.year, "year")?;
        required(&self.mobile_no, "mobile number")?;
        required(&self.password, "password")?;
        if !self.email.contains('@') {
            return Err(ValidationError::Invalid(format!(
                "'{}' is not an email address",
                self.email
            )));
        }
        Ok(())
    }
}

/// Multipart body for `POST /users/post`
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub form: NewStudentForm,
    pub image: Option<FilePayload>,
}

pub fn validate_marks(marks: u32) -> Result<(), ValidationError> {
    if marks > MAX_MARKS {
        return Err(ValidationError::Invalid(format!(
            "marks must be between 0 and {}",
            MAX_MARKS
        )));
    }
    Ok(())
}
