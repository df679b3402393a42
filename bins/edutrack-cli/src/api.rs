// HTTP client for the classroom backend.
//
// Collections are fetched wholesale; all sorting, filtering and paging
// happens client-side (see listing.rs).

use crate::error::ApiError;
use crate::forms::{AssignmentUpload, FilePayload, NewStudent, SubmissionUpload};
use edutrack_common::endpoints;
use edutrack_common::types::{
    Assignment, MarksUpdate, Role, StudentLogin, Submission, TeacherLogin, UserProfile,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

pub type Result<T> = std::result::Result<T, ApiError>;

/// Longest server error body echoed back to the user
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone)]
pub enum Credentials {
    Student { user_id: String, password: String },
    Teacher { user_id: String, password: String },
}

impl Credentials {
    /// Pick the login route from the shape of the id.
    pub fn for_user(user_id: &str, password: &str) -> Self {
        match Role::from_id_shape(user_id) {
            Role::Teacher => Credentials::Teacher {
                user_id: user_id.to_string(),
                password: password.to_string(),
            },
            Role::Student => Credentials::Student {
                user_id: user_id.to_string(),
                password: password.to_string(),
            },
        }
    }

    pub fn implied_role(&self) -> Role {
        match self {
            Credentials::Student { .. } => Role::Student,
            Credentials::Teacher { .. } => Role::Teacher,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Accepted {
        /// Role named by the server, when it sends one
        role: Option<Role>,
        subject: Option<String>,
    },
    Rejected,
}

impl LoginOutcome {
    /// Interpret a login response body. Empty, `false`, `null` and `0`
    /// answers are rejections.
    pub fn from_payload(payload: &Value) -> Self {
        let accepted = match payload {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        };
        if !accepted {
            return LoginOutcome::Rejected;
        }

        let role = payload
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse);
        let subject = payload
            .get("subject")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        LoginOutcome::Accepted { role, subject }
    }
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self.send(self.http.get(&url)).await?;
        Ok(response.json().await?)
    }

    pub async fn list_assignments(&self) -> Result<Vec<Assignment>> {
        self.get_json(endpoints::assignments(&self.base_url)).await
    }

    pub async fn list_submissions(&self) -> Result<Vec<Submission>> {
        self.get_json(endpoints::submissions(&self.base_url)).await
    }

    pub async fn delete_assignment(&self, id: i64) -> Result<()> {
        let url = endpoints::assignment_delete(&self.base_url, id);
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    pub async fn create_assignment(&self, upload: AssignmentUpload) -> Result<()> {
        let form = Form::new()
            .text("title", upload.title)
            .text("subject", upload.subject)
            .text("description", upload.description)
            .text("dueDate", upload.due_date)
            .text("year", upload.year.to_string())
            .part("file", file_part(upload.file)?);

        let url = endpoints::assignment_upload(&self.base_url);
        self.send(self.http.post(url).multipart(form)).await?;
        Ok(())
    }

    pub async fn upload_submission(&self, upload: SubmissionUpload) -> Result<()> {
        let form = Form::new()
            .part("file", file_part(upload.file)?)
            .text("assignmentId", upload.assignment_id.to_string())
            .text("studentId", upload.student_id)
            .text("name", upload.name)
            .text("marks", upload.marks.to_string());

        let url = endpoints::submission_upload(&self.base_url);
        self.send(self.http.post(url).multipart(form)).await?;
        Ok(())
    }

    pub async fn update_marks(&self, submission_id: i64, marks: u32) -> Result<()> {
        let url = endpoints::submission_update(&self.base_url, submission_id);
        self.send(self.http.put(url).json(&MarksUpdate { marks }))
            .await?;
        Ok(())
    }

    pub async fn download_submission(&self, submission_id: i64) -> Result<Vec<u8>> {
        let url = endpoints::submission_view(&self.base_url, submission_id);
        let response = self.send(self.http.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn download_assignment(&self, assignment_id: i64) -> Result<Vec<u8>> {
        let url = endpoints::assignment_view(&self.base_url, assignment_id);
        let response = self.send(self.http.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Server-side rejections come back as `LoginOutcome::Rejected`; only
    /// transport failures are errors.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        let request = match credentials {
            Credentials::Teacher { user_id, password } => {
                let teacher_id = edutrack_common::types::parse_int_prefix(user_id);
                self.http
                    .post(endpoints::teacher_login(&self.base_url))
                    .json(&TeacherLogin {
                        teacher_id,
                        password: password.clone(),
                    })
            }
            Credentials::Student { user_id, password } => self
                .http
                .post(endpoints::student_login(&self.base_url))
                .json(&StudentLogin {
                    user_id: user_id.clone(),
                    password: password.clone(),
                }),
        };

        match self.send(request).await {
            Ok(response) => {
                let body = response.text().await?;
                let payload = serde_json::from_str(&body)
                    .unwrap_or_else(|_| Value::String(body.trim().to_string()));
                Ok(LoginOutcome::from_payload(&payload))
            }
            Err(ApiError::Unauthorized) | Err(ApiError::Status { .. }) => {
                Ok(LoginOutcome::Rejected)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn user_name(&self, user_id: &str) -> Result<String> {
        let url = endpoints::user_by_id(&self.base_url);
        let response = self
            .send(self.http.get(url).query(&[("id", user_id)]))
            .await?;
        let profile: UserProfile = response.json().await?;
        Ok(profile.name)
    }

    pub async fn student_count(&self) -> Result<u64> {
        self.get_json(endpoints::student_count(&self.base_url)).await
    }

    pub async fn add_student(&self, student: NewStudent) -> Result<()> {
        let NewStudent { form, image } = student;
        let mut multipart = Form::new()
            .text("userID", form.user_id)
            .text("name", form.name)
            .text("email", form.email)
            .text("year", form.year)
            .text("mobileNo", form.mobile_no)
            .text("password", form.password);
        if let Some(image) = image {
            multipart = multipart.part("image", file_part(image)?);
        }

        let url = endpoints::add_student(&self.base_url);
        self.send(self.http.post(url).multipart(multipart)).await?;
        Ok(())
    }

    pub async fn student_emails(&self, year: &str) -> Result<Vec<String>> {
        let emails: Vec<String> = self
            .get_json(endpoints::student_emails(&self.base_url, year))
            .await?;
        if emails.is_empty() {
            warn!(year = %year, "No student emails registered for year");
        }
        Ok(emails)
    }
}

fn file_part(file: FilePayload) -> Result<Part> {
    Ok(Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.mime)?)
}

/// Prefer a JSON `message` field; otherwise the raw body, shortened.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no details".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credentials_route_by_id_shape() {
        assert_eq!(Credentials::for_user("1234", "pw").implied_role(), Role::Teacher);
        assert_eq!(Credentials::for_user("202301", "pw").implied_role(), Role::Student);
    }

    #[test]
    fn test_login_payload_truthiness() {
        assert_eq!(LoginOutcome::from_payload(&json!(false)), LoginOutcome::Rejected);
        assert_eq!(LoginOutcome::from_payload(&json!(null)), LoginOutcome::Rejected);
        assert_eq!(LoginOutcome::from_payload(&json!("")), LoginOutcome::Rejected);
        assert_eq!(LoginOutcome::from_payload(&json!(0)), LoginOutcome::Rejected);
        assert_eq!(
            LoginOutcome::from_payload(&json!(true)),
            LoginOutcome::Accepted { role: None, subject: None }
        );
    }

    #[test]
    fn test_login_payload_role_and_subject() {
        let outcome = LoginOutcome::from_payload(&json!({
            "id": 1234, "role": "Teacher", "subject": "Biology"
        }));
        assert_eq!(
            outcome,
            LoginOutcome::Accepted {
                role: Some(Role::Teacher),
                subject: Some("Biology".to_string()),
            }
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message":"User exists"}"#), "User exists");
        assert_eq!(error_message("  "), "no details");
        assert_eq!(error_message(&"x".repeat(500)).len(), MAX_ERROR_BODY);
    }
}
