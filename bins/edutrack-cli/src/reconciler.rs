//! Submission Reconciler - Assignment/Submission Join
//!
//! **Core Responsibility:**
//! Join independently fetched assignments and submissions by foreign key and
//! derive what a student can do with each assignment.
//!
//! **Status precedence (highest first):**
//! - `Submitted`: the viewer has a submission for the assignment, even if the
//!   due date has passed
//! - `PastDue`: no submission and the due date is before `now`
//! - `Open`: anything else; the submit form is offered
//!
//! **Matching rules:**
//! - The first submission in server order wins; later duplicates for the same
//!   (assignment, student) pair are hidden, not merged
//! - Student ids are compared as integers after leading-digit parsing. A
//!   submission whose student id has no leading integer never matches and is
//!   only reported as a warning
//!
//! Pure and idempotent: safe to re-run whenever either collection changes,
//! including while one of them is still empty.

use chrono::{DateTime, Utc};
use edutrack_common::types::{parse_int_prefix, Assignment, Submission};
use std::fmt;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    Open,
    Submitted,
    PastDue,
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::Open => f.write_str("open"),
            AssignmentStatus::Submitted => f.write_str("submitted"),
            AssignmentStatus::PastDue => f.write_str("past-due"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedAssignment<'a> {
    pub assignment: &'a Assignment,
    pub submission: Option<&'a Submission>,
    pub status: AssignmentStatus,
}

/// Decide the status of one assignment from its inputs.
pub fn derive_status(has_submission: bool, past_due: bool) -> AssignmentStatus {
    if has_submission {
        AssignmentStatus::Submitted
    } else if past_due {
        AssignmentStatus::PastDue
    } else {
        AssignmentStatus::Open
    }
}

/// Annotate every assignment with the viewer's submission and status.
///
/// `viewer_id` is `None` when the signed-in id is not numeric; nothing
/// matches in that case.
pub fn reconcile<'a>(
    assignments: &'a [Assignment],
    submissions: &'a [Submission],
    viewer_id: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<AnnotatedAssignment<'a>> {
    let student_ids: Vec<Option<i64>> = submissions
        .iter()
        .map(|s| {
            let parsed = parse_int_prefix(&s.student_id);
            if parsed.is_none() {
                warn!(
                    submission_id = s.id,
                    assignment_id = s.assignment_id,
                    student_id = %s.student_id,
                    "Submission has a non-numeric student id and can never match"
                );
            }
            parsed
        })
        .collect();

    assignments
        .iter()
        .map(|assignment| {
            let submission = viewer_id.and_then(|viewer| {
                submissions
                    .iter()
                    .zip(&student_ids)
                    .find(|(s, sid)| s.assignment_id == assignment.id && **sid == Some(viewer))
                    .map(|(s, _)| s)
            });
            let status = derive_status(submission.is_some(), assignment.is_past_due(now));
            AnnotatedAssignment {
                assignment,
                submission,
                status,
            }
        })
        .collect()
}

/// Why a new submission for an assignment is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRefusal {
    #[error("Assignment #{0} not found")]
    NotFound(i64),
    #[error("Assignment #{0} is past due")]
    PastDue(i64),
    #[error("You already submitted assignment #{assignment_id} (submission #{submission_id})")]
    AlreadySubmitted { assignment_id: i64, submission_id: i64 },
}

/// Only an `Open` assignment accepts a new submission.
pub fn submission_gate(
    annotated: &[AnnotatedAssignment<'_>],
    assignment_id: i64,
) -> Result<(), SubmitRefusal> {
    let entry = annotated
        .iter()
        .find(|entry| entry.assignment.id == assignment_id)
        .ok_or(SubmitRefusal::NotFound(assignment_id))?;
    match entry.status {
        AssignmentStatus::Open => Ok(()),
        AssignmentStatus::PastDue => Err(SubmitRefusal::PastDue(assignment_id)),
        AssignmentStatus::Submitted => Err(SubmitRefusal::AlreadySubmitted {
            assignment_id,
            submission_id: entry.submission.map(|s| s.id).unwrap_or_default(),
        }),
    }
}
