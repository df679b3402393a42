/// Endpoint semantics for the classroom backend and the code executor.
/// Every URL the client calls is built here so paths never drift between
/// commands.

pub const ASSIGNMENTS_PREFIX: &str = "/api/pdf";
pub const SUBMISSIONS_PREFIX: &str = "/api/submission";
pub const EXECUTOR_SUBMISSIONS: &str = "/submissions";

fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

pub fn assignments(base: &str) -> String {
    join(base, &format!("{}/files", ASSIGNMENTS_PREFIX))
}

pub fn assignment_upload(base: &str) -> String {
    join(base, &format!("{}/upload", ASSIGNMENTS_PREFIX))
}

pub fn assignment_delete(base: &str, id: i64) -> String {
    join(base, &format!("{}/delete/{}", ASSIGNMENTS_PREFIX, id))
}

pub fn assignment_view(base: &str, id: i64) -> String {
    join(base, &format!("{}/view/{}", ASSIGNMENTS_PREFIX, id))
}

pub fn submissions(base: &str) -> String {
    join(base, &format!("{}/files", SUBMISSIONS_PREFIX))
}

pub fn submission_upload(base: &str) -> String {
    join(base, &format!("{}/upload", SUBMISSIONS_PREFIX))
}

pub fn submission_update(base: &str, id: i64) -> String {
    join(base, &format!("{}/update/{}", SUBMISSIONS_PREFIX, id))
}

pub fn submission_view(base: &str, id: i64) -> String {
    join(base, &format!("{}/view/{}", SUBMISSIONS_PREFIX, id))
}

pub fn student_login(base: &str) -> String {
    join(base, "/users/login")
}

pub fn teacher_login(base: &str) -> String {
    join(base, "/teachers/login")
}

pub fn user_by_id(base: &str) -> String {
    join(base, "/users/getbyid")
}

pub fn student_count(base: &str) -> String {
    join(base, "/users/count")
}

pub fn add_student(base: &str) -> String {
    join(base, "/users/post")
}

pub fn student_emails(base: &str, year: &str) -> String {
    join(base, &format!("/emails/{}", year))
}

/// Create-job endpoint of the remote executor
pub fn executor_jobs(base: &str) -> String {
    join(base, EXECUTOR_SUBMISSIONS)
}

/// Status endpoint for one executor job; outputs are requested as plain text
pub fn executor_job(base: &str, token: &str) -> String {
    join(
        base,
        &format!("{}/{}?base64_encoded=false", EXECUTOR_SUBMISSIONS, token),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_paths() {
        let base = "http://localhost:8080";
        assert_eq!(assignments(base), "http://localhost:8080/api/pdf/files");
        assert_eq!(assignment_delete(base, 7), "http://localhost:8080/api/pdf/delete/7");
        assert_eq!(submission_update(base, 3), "http://localhost:8080/api/submission/update/3");
        assert_eq!(submission_view(base, 3), "http://localhost:8080/api/submission/view/3");
        assert_eq!(student_emails(base, "2"), "http://localhost:8080/emails/2");
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        assert_eq!(
            submissions("https://api.example.edu/"),
            submissions("https://api.example.edu")
        );
    }

    #[test]
    fn test_executor_job_url() {
        let url = executor_job("https://judge0.example", "abc-123");
        assert_eq!(
            url,
            "https://judge0.example/submissions/abc-123?base64_encoded=false"
        );
        assert!(executor_jobs("https://judge0.example").ends_with("/submissions"));
    }
}
