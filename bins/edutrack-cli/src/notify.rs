// New-assignment email notifications via the email automation webhook.
// Delivery itself is the webhook's business; failures here never fail the
// command that triggered them.

use crate::api::BackendClient;
use edutrack_common::types::{EmailBatch, EmailMessage};
use handlebars::{Handlebars, RenderError};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

pub const NEW_ASSIGNMENT_SUBJECT: &str = "New Assignment Unlocked!";

const NEW_ASSIGNMENT_TEMPLATE: &str = r#"<div style="font-family: Arial, sans-serif; color: #333;">
  <h2>New assignment unlocked</h2>
  <p>Dear Student,</p>
  <p>A new assignment is available on the portal. Please complete it before the due date.</p>
  <ul>
    <li><strong>Subject:</strong> {{subject}}</li>
    <li><strong>Title:</strong> {{title}}</li>
    <li><strong>Due date:</strong> {{due_date}}</li>
  </ul>
  <p>Best regards,<br/>EduTrack</p>
</div>"#;

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentNotice {
    pub subject: String,
    pub title: String,
    pub due_date: String,
    pub year: String,
}

pub fn render_body(notice: &AssignmentNotice) -> Result<String, RenderError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.render_template(NEW_ASSIGNMENT_TEMPLATE, notice)
}

pub fn build_batch(emails: &[String], notice: &AssignmentNotice) -> Result<EmailBatch, RenderError> {
    let body = render_body(notice)?;
    Ok(EmailBatch {
        emails: emails
            .iter()
            .filter(|e| !e.trim().is_empty())
            .map(|email| EmailMessage {
                email: email.clone(),
                subject: NEW_ASSIGNMENT_SUBJECT.to_string(),
                body: body.clone(),
            })
            .collect(),
    })
}

#[derive(Debug, Clone)]
pub struct EmailNotifier {
    http: Client,
    webhook_url: String,
}

impl EmailNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().build()?,
            webhook_url: webhook_url.into(),
        })
    }

    /// Tell every student in the notice's year about a new assignment.
    /// Returns how many addresses were handed to the webhook.
    pub async fn notify_new_assignment(&self, backend: &BackendClient, notice: &AssignmentNotice) -> usize {
        let emails = match backend.student_emails(&notice.year).await {
            Ok(emails) => emails,
            Err(e) => {
                warn!(year = %notice.year, error = %e, "Failed to fetch student emails");
                return 0;
            }
        };

        let batch = match build_batch(&emails, notice) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Failed to render notification email");
                return 0;
            }
        };
        if batch.emails.is_empty() {
            return 0;
        }

        match self.http.post(&self.webhook_url).json(&batch).send().await {
            Ok(response) if response.status().is_success() => {
                info!(recipients = batch.emails.len(), "Assignment notification sent");
                batch.emails.len()
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "Email webhook rejected notification");
                0
            }
            Err(e) => {
                warn!(error = %e, "Failed to reach email webhook");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_notice() -> AssignmentNotice {
        AssignmentNotice {
            subject: "Physics".to_string(),
            title: "Lab <3>".to_string(),
            due_date: "2025-03-01T09:00".to_string(),
            year: "2".to_string(),
        }
    }

    #[test]
    fn test_batch_has_one_message_per_address() {
        let emails = vec![
            "a@example.edu".to_string(),
            " ".to_string(),
            "b@example.edu".to_string(),
        ];
        let batch = build_batch(&emails, &make_notice()).unwrap();
        assert_eq!(batch.emails.len(), 2);
        assert_eq!(batch.emails[1].email, "b@example.edu");
        assert!(batch.emails.iter().all(|m| m.subject == NEW_ASSIGNMENT_SUBJECT));
    }

    #[test]
    fn test_body_mentions_details_escaped() {
        let body = render_body(&make_notice()).unwrap();
        assert!(body.contains("Physics"));
        assert!(body.contains("Lab &lt;3&gt;"));
        assert!(body.contains("2025-03-01T09:00"));
    }

    #[test]
    fn test_batch_serializes_as_webhook_payload() {
        let batch = build_batch(&["a@example.edu".to_string()], &make_notice()).unwrap();
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["emails"][0]["email"], "a@example.edu");
        assert!(value["emails"][0]["body"].is_string());
    }
}
