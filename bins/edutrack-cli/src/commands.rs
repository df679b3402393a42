// CLI commands for the EduTrack classroom client
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use edutrack_common::config::Config;
use edutrack_common::session::SessionStore;
use edutrack_common::types::{Assignment, Language, Role, Session, Submission};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{BackendClient, Credentials, LoginOutcome};
use crate::error::{ApiError, ValidationError};
use crate::forms::{
    upload_file_name, validate_marks, AssignmentForm, AssignmentUpload, FilePayload, NewStudent,
    NewStudentForm, SubmissionUpload,
};
use crate::judge::Judge0Client;
use crate::listing::{
    self, enrich_submissions, filter_by_subject, paginate, search, sort_newest_first,
    subject_options, total_pages, visible_to, ASSIGNMENTS_PER_PAGE, SUBMISSIONS_PER_PAGE,
};
use crate::notify::{AssignmentNotice, EmailNotifier};
use crate::poller::{JobPoller, PollError};
use crate::reconciler::{reconcile, submission_gate, AssignmentStatus};

/// Everything a command needs, built once at startup and passed explicitly.
pub struct AppContext {
    pub config: Config,
    pub session: SessionStore,
    pub backend: BackendClient,
}

impl AppContext {
    pub fn from_config(config: Config) -> Result<Self> {
        let session = SessionStore::load(&config.session_file)
            .context("Failed to open the session store")?;
        let backend = BackendClient::new(config.api_url.clone())
            .context("Failed to build the HTTP client")?;
        Ok(Self {
            config,
            session,
            backend,
        })
    }

    fn require_session(&self) -> Result<Session> {
        self.session
            .get_session()
            .ok_or_else(|| anyhow!("Not signed in. Run `edutrack login` first."))
    }

    fn require_role(&self, role: Role) -> Result<Session> {
        let session = self.require_session()?;
        if session.role != role {
            bail!("Sorry, this command is only available to {}s", role);
        }
        Ok(session)
    }

    /// Turn a backend failure into the single message shown to the user.
    /// A 401 also signs the user out.
    fn api_failure(&self, err: ApiError, what: &str) -> anyhow::Error {
        if err.is_unauthorized() {
            warn!("Backend rejected the cached session; signing out");
            if let Err(e) = self.session.clear_session() {
                warn!(error = %e, "Failed to clear session");
            }
        }
        anyhow::Error::new(err).context(what.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DownloadKind {
    Assignment,
    Submission,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub async fn login(ctx: &AppContext, user_id: &str, password: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(ValidationError::MissingField("user id").into());
    }
    if password.is_empty() {
        return Err(ValidationError::MissingField("password").into());
    }

    ctx.session
        .clear_session()
        .context("Failed to clear the previous session")?;

    let credentials = Credentials::for_user(user_id, password);
    let outcome = ctx
        .backend
        .login(&credentials)
        .await
        .context("Login failed. Please try again.")?;

    let (server_role, subject) = match outcome {
        LoginOutcome::Rejected => bail!("Invalid credentials"),
        LoginOutcome::Accepted { role, subject } => (role, subject),
    };

    let role = match server_role {
        Some(role) => role,
        None => {
            let role = credentials.implied_role();
            warn!(
                user_id = %user_id,
                role = %role,
                "Login response did not name a role; falling back to the id-length rule"
            );
            role
        }
    };

    let mut session = Session::new(user_id, role);
    session.subject = subject;
    ctx.session
        .set_session(session)
        .context("Failed to save the session")?;

    info!(user_id = %user_id, role = %role, "Signed in");
    println!("✅ Signed in as {} ({})", user_id, role);
    Ok(())
}

pub fn logout(ctx: &AppContext) -> Result<()> {
    ctx.session
        .clear_session()
        .context("Failed to clear the session")?;
    println!("👋 Signed out");
    Ok(())
}

pub fn whoami(ctx: &AppContext) -> Result<()> {
    match ctx.session.get_session() {
        Some(session) => {
            println!("👤 {} ({})", session.user_id, session.role);
            if let Some(subject) = &session.subject {
                println!("   Subject: {}", subject);
            }
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

pub async fn dashboard(ctx: &AppContext) -> Result<()> {
    let session = ctx.require_session()?;
    let count = ctx
        .backend
        .student_count()
        .await
        .map_err(|e| ctx.api_failure(e, "Failed to fetch the student count"))?;

    println!("📊 Dashboard for {} ({})", session.user_id, session.role);
    println!("   Total students: {}", count);
    Ok(())
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

pub async fn list_assignments(ctx: &AppContext, subject: &str, page: usize) -> Result<()> {
    let session = ctx.require_session()?;
    let assignments = ctx
        .backend
        .list_assignments()
        .await
        .map_err(|e| ctx.api_failure(e, "Failed to fetch assignments"))?;

    let filtered = filter_by_subject(&assignments, subject);
    let pages = total_pages(filtered.len(), ASSIGNMENTS_PER_PAGE);
    let current = paginate(&filtered, ASSIGNMENTS_PER_PAGE, page);

    println!("📚 Assignments (page {} of {})", page, pages.max(1));
    if current.is_empty() {
        println!("   No assignments on this page");
    }
    for assignment in current {
        println!(
            "  #{} {} | {} | Year {} | Due {}",
            assignment.id,
            assignment.title,
            assignment.subject,
            assignment.year.as_deref().unwrap_or("-"),
            assignment.due_date
        );
        if !assignment.description.is_empty() {
            println!("      {}", assignment.description);
        }
    }

    if listing::has_next_page(filtered.len(), ASSIGNMENTS_PER_PAGE, page) {
        println!("\n   Next: edutrack assignments list --page {}", page + 1);
    }
    if session.is_teacher() {
        println!("\n   Create one with: edutrack assignments create --help");
    }
    Ok(())
}

pub async fn create_assignment(ctx: &AppContext, form: AssignmentForm) -> Result<()> {
    let session = ctx.require_role(Role::Teacher)?;

    form.validate()?;
    let subject = form.resolve_subject(&session)?;
    let file_subject = form.file_subject(&session)?;
    let file = FilePayload::read(&form.file)
        .await?
        .renamed(upload_file_name(&form.title, &file_subject, &form.file));

    println!("📤 Uploading {}...", file.file_name);
    let upload = AssignmentUpload {
        title: form.title.clone(),
        subject: subject.clone(),
        description: form.description.clone(),
        due_date: form.due_date.clone(),
        year: form.year,
        file,
    };
    ctx.backend
        .create_assignment(upload)
        .await
        .map_err(|e| ctx.api_failure(e, "Failed to create assignment"))?;
    info!(title = %form.title, subject = %subject, "Assignment created");
    println!("✅ Assignment created successfully");

    match &ctx.config.email_webhook_url {
        Some(url) => {
            let notifier = EmailNotifier::new(url.clone())
                .context("Failed to build the notification client")?;
            let notice = AssignmentNotice {
                subject,
                title: form.title,
                due_date: form.due_date,
                year: form.year.to_string(),
            };
            let sent = notifier.notify_new_assignment(&ctx.backend, &notice).await;
            if sent > 0 {
                println!("📧 Notified {} students", sent);
            } else {
                println!("⚠️  No notification emails were sent");
            }
        }
        None => info!("EDUTRACK_EMAIL_WEBHOOK not set; skipping notifications"),
    }
    Ok(())
}

pub async fn delete_assignment(ctx: &AppContext, id: i64, yes: bool) -> Result<()> {
    ctx.require_role(Role::Teacher)?;

    if !yes && !confirm(&format!("Are you sure you want to delete assignment #{}?", id))? {
        println!("❌ Aborted");
        return Ok(());
    }

    ctx.backend
        .delete_assignment(id)
        .await
        .map_err(|e| ctx.api_failure(e, "Failed to delete assignment"))?;
    info!(assignment_id = id, "Assignment deleted");
    println!("🗑️  Assignment deleted successfully");
    Ok(())
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// Fetch both collections concurrently. A failed submissions fetch is
/// treated as "no submissions yet"; a failed assignments fetch is an error.
async fn fetch_for_reconcile(
    ctx: &AppContext,
) -> Result<(Vec<Assignment>, Vec<Submission>)> {
    let (assignments, submissions) = tokio::join!(
        ctx.backend.list_assignments(),
        ctx.backend.list_submissions()
    );
    let mut assignments =
        assignments.map_err(|e| ctx.api_failure(e, "Failed to fetch assignments"))?;
    let submissions = submissions_or_empty(submissions)
        .map_err(|e| ctx.api_failure(e, "Failed to fetch submissions"))?;
    sort_newest_first(&mut assignments);
    Ok((assignments, submissions))
}

/// A failed submissions fetch reads as "no submissions yet", except a 401,
/// which must still sign the user out.
fn submissions_or_empty(
    fetched: std::result::Result<Vec<Submission>, ApiError>,
) -> std::result::Result<Vec<Submission>, ApiError> {
    match fetched {
        Err(e) if !e.is_unauthorized() => {
            warn!(error = %e, "Failed to fetch submissions; showing assignments without them");
            Ok(Vec::new())
        }
        other => other,
    }
}

pub async fn submission_status(ctx: &AppContext, page: usize) -> Result<()> {
    let session = ctx.require_role(Role::Student)?;
    let (assignments, submissions) = fetch_for_reconcile(ctx).await?;

    let annotated = reconcile(
        &assignments,
        &submissions,
        session.numeric_user_id(),
        Utc::now(),
    );
    let pages = total_pages(annotated.len(), ASSIGNMENTS_PER_PAGE);

    println!("📝 Your assignments (page {} of {})", page, pages.max(1));
    for entry in paginate(&annotated, ASSIGNMENTS_PER_PAGE, page) {
        let assignment = entry.assignment;
        println!(
            "  #{} {} | {} | Due {} | {}",
            assignment.id, assignment.title, assignment.subject, assignment.due_date, entry.status
        );
        match (entry.status, entry.submission) {
            (AssignmentStatus::Submitted, Some(submission)) => println!(
                "      Submitted {} (view: edutrack submissions download {})",
                submission.file_name, submission.id
            ),
            (AssignmentStatus::PastDue, _) => println!("      Submission closed"),
            _ => println!(
                "      Submit: edutrack submissions submit --assignment-id {} --file <pdf>",
                assignment.id
            ),
        }
    }
    Ok(())
}

pub async fn submit(ctx: &AppContext, assignment_id: i64, file: &Path) -> Result<()> {
    let session = ctx.require_role(Role::Student)?;
    if session.user_id.trim().is_empty() {
        return Err(ValidationError::MissingField("student id").into());
    }
    let payload = FilePayload::read(file).await?;

    let (assignments, submissions) = fetch_for_reconcile(ctx).await?;
    let annotated = reconcile(
        &assignments,
        &submissions,
        session.numeric_user_id(),
        Utc::now(),
    );
    submission_gate(&annotated, assignment_id)?;

    let name = match ctx.backend.user_name(&session.user_id).await {
        Ok(name) => name,
        Err(e) => {
            warn!(user_id = %session.user_id, error = %e, "Failed to look up student name");
            String::new()
        }
    };

    ctx.backend
        .upload_submission(SubmissionUpload {
            assignment_id,
            student_id: session.user_id.clone(),
            name,
            marks: 0,
            file: payload,
        })
        .await
        .map_err(|e| ctx.api_failure(e, "Submission failed"))?;

    info!(assignment_id, student_id = %session.user_id, "Submission uploaded");
    println!("✅ Submission successful!");
    Ok(())
}

pub async fn list_submissions(
    ctx: &AppContext,
    subject: &str,
    query: &str,
    page: usize,
) -> Result<()> {
    let session = ctx.require_session()?;
    let (submissions, assignments) = tokio::join!(
        ctx.backend.list_submissions(),
        ctx.backend.list_assignments()
    );
    let submissions = submissions.map_err(|e| ctx.api_failure(e, "Failed to fetch data"))?;
    let assignments = assignments.map_err(|e| ctx.api_failure(e, "Failed to fetch data"))?;

    let rows = visible_to(enrich_submissions(&submissions, &assignments), &session);
    let subjects = subject_options(&rows);
    let rows = search(&filter_by_subject(&rows, subject), query);

    println!("🗂️  Subjects: {}", subjects.join(", "));
    if rows.is_empty() {
        println!("Oops, there is no submission matching your search criteria.");
        return Ok(());
    }

    let pages = total_pages(rows.len(), SUBMISSIONS_PER_PAGE);
    println!("Page {} of {}", page, pages);
    for row in paginate(&rows, SUBMISSIONS_PER_PAGE, page) {
        let submission = &row.submission;
        println!(
            "  #{} | student {} | {} | {} | {} | marks {}",
            submission.id,
            submission.student_id,
            row.title,
            row.subject,
            submission.file_name,
            submission.marks.as_deref().unwrap_or("-")
        );
    }
    if session.is_teacher() {
        println!("\n   Grade with: edutrack submissions grade <id> --marks <0-100>");
    }
    Ok(())
}

pub async fn grade(ctx: &AppContext, submission_id: i64, marks: u32) -> Result<()> {
    ctx.require_role(Role::Teacher)?;
    validate_marks(marks)?;

    ctx.backend
        .update_marks(submission_id, marks)
        .await
        .map_err(|e| ctx.api_failure(e, "Failed to update marks"))?;
    info!(submission_id, marks, "Marks updated");
    println!("✅ Marks updated successfully");
    Ok(())
}

pub async fn download(
    ctx: &AppContext,
    kind: DownloadKind,
    id: i64,
    out: Option<PathBuf>,
) -> Result<()> {
    ctx.require_session()?;
    let (bytes, default_name) = match kind {
        DownloadKind::Assignment => (
            ctx.backend.download_assignment(id).await,
            format!("assignment-{}.pdf", id),
        ),
        DownloadKind::Submission => (
            ctx.backend.download_submission(id).await,
            format!("submission-{}.pdf", id),
        ),
    };
    let bytes = bytes.map_err(|e| ctx.api_failure(e, "Failed to download the PDF"))?;

    let path = out.unwrap_or_else(|| PathBuf::from(default_name));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("📄 Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

pub async fn add_student(ctx: &AppContext, form: NewStudentForm) -> Result<()> {
    ctx.require_role(Role::Teacher)?;
    form.validate()?;

    let image = match &form.image {
        Some(path) => Some(FilePayload::read(path).await?),
        None => None,
    };
    let user_id = form.user_id.clone();

    ctx.backend
        .add_student(NewStudent { form, image })
        .await
        .map_err(|e| ctx.api_failure(e, "Failed to add student"))?;
    info!(user_id = %user_id, "Student added");
    println!("✅ Student added successfully");
    Ok(())
}

// ---------------------------------------------------------------------------
// Code runner
// ---------------------------------------------------------------------------

fn resolve_language(file: &Path, explicit: Option<&str>) -> Result<Language> {
    if let Some(name) = explicit {
        return name.parse::<Language>().map_err(|e| anyhow!(e));
    }
    file.extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension)
        .ok_or_else(|| {
            anyhow!(
                "Cannot tell the language of {}; pass --language (python, c, cpp, java)",
                file.display()
            )
        })
}

pub async fn run_code(ctx: &AppContext, file: &Path, language: Option<&str>) -> Result<()> {
    ctx.require_session()?;
    let language = resolve_language(file, language)?;
    let source = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if language == Language::Java && !source.contains("class Main") {
        println!("⚠️  Java programs must declare `class Main`");
    }

    let executor = Judge0Client::from_config(&ctx.config)
        .context("Failed to build the executor client")?;
    let poller = JobPoller::new(Arc::new(executor))
        .with_interval(Duration::from_millis(ctx.config.poll_interval_ms));

    println!("▶ Running {} as {}...", file.display(), language);
    let handle = poller
        .submit(&source, language)
        .await
        .context("Failed to submit the code. Please try again.")?;
    let cancellation = handle.cancellation();

    let result = tokio::select! {
        result = handle.wait() => result,
        _ = tokio::signal::ctrl_c() => {
            cancellation.cancel();
            Err(PollError::Cancelled(String::new()))
        }
    };

    let result = match result {
        Ok(result) => result,
        Err(PollError::Cancelled(_)) => {
            println!("⏹  Run cancelled");
            return Ok(());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Error fetching the result.")),
    };

    println!("\n── Output ({}) ──", result.status);
    println!("{}", result.stdout);
    if !result.stderr.is_empty() {
        println!("\n── Error ──");
        println!("{}", result.stderr);
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("⚠️  {} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
