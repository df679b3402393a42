// Client-side paging, filtering and joining of wholesale-fetched lists

use edutrack_common::types::{Assignment, Session, Submission};

pub const ASSIGNMENTS_PER_PAGE: usize = 3;
pub const SUBMISSIONS_PER_PAGE: usize = 50;
pub const ALL_SUBJECTS: &str = "All";
pub const NOT_AVAILABLE: &str = "N/A";

pub trait HasSubject {
    fn subject(&self) -> &str;
}

pub trait Searchable {
    fn student_id(&self) -> &str;
    fn file_name(&self) -> &str;
}

impl HasSubject for Assignment {
    fn subject(&self) -> &str {
        &self.subject
    }
}

/// A submission joined with the assignment it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRow {
    pub submission: Submission,
    pub title: String,
    pub subject: String,
}

impl HasSubject for SubmissionRow {
    fn subject(&self) -> &str {
        &self.subject
    }
}

impl Searchable for SubmissionRow {
    fn student_id(&self) -> &str {
        &self.submission.student_id
    }

    fn file_name(&self) -> &str {
        &self.submission.file_name
    }
}

/// Page `page` (1-based) of `items`. Pages past the end, and page 0, are
/// empty rather than an error.
pub fn paginate<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = page.saturating_mul(page_size).min(items.len());
    &items[start..end]
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

pub fn has_next_page(len: usize, page_size: usize, page: usize) -> bool {
    page.saturating_mul(page_size) < len
}

/// `"All"` keeps everything; any other value is an exact, case-sensitive match.
pub fn filter_by_subject<T: HasSubject + Clone>(items: &[T], subject: &str) -> Vec<T> {
    if subject == ALL_SUBJECTS {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| item.subject() == subject)
        .cloned()
        .collect()
}

/// Case-insensitive substring match on student id or file name.
pub fn search<T: Searchable + Clone>(items: &[T], query: &str) -> Vec<T> {
    if query.is_empty() {
        return items.to_vec();
    }
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| {
            item.student_id().to_lowercase().contains(&needle)
                || item.file_name().to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// `"All"` followed by each distinct subject in first-seen order.
pub fn subject_options<T: HasSubject>(items: &[T]) -> Vec<String> {
    let mut options = vec![ALL_SUBJECTS.to_string()];
    for item in items {
        if !options.iter().any(|s| s == item.subject()) {
            options.push(item.subject().to_string());
        }
    }
    options
}

/// Newest assignment first.
pub fn sort_newest_first(assignments: &mut [Assignment]) {
    assignments.sort_by(|a, b| b.id.cmp(&a.id));
}

/// Attach assignment title and subject to each submission.
pub fn enrich_submissions(submissions: &[Submission], assignments: &[Assignment]) -> Vec<SubmissionRow> {
    submissions
        .iter()
        .map(|submission| {
            let assignment = assignments.iter().find(|a| a.id == submission.assignment_id);
            SubmissionRow {
                submission: submission.clone(),
                title: assignment
                    .map(|a| a.title.clone())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                subject: assignment
                    .map(|a| a.subject.clone())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            }
        })
        .collect()
}

/// Teachers see every row; students only rows whose student id is their own.
pub fn visible_to(rows: Vec<SubmissionRow>, session: &Session) -> Vec<SubmissionRow> {
    if session.is_teacher() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| row.submission.student_id == session.user_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use edutrack_common::types::Role;

    fn make_assignment(id: i64, subject: &str) -> Assignment {
        Assignment {
            id,
            title: format!("A{}", id),
            subject: subject.to_string(),
            description: String::new(),
            due_date: "2030-01-01".to_string(),
            year: None,
        }
    }

    fn make_row(student_id: &str, file_name: &str, subject: &str) -> SubmissionRow {
        SubmissionRow {
            submission: Submission {
                id: 1,
                assignment_id: 1,
                student_id: student_id.to_string(),
                file_name: file_name.to_string(),
                name: None,
                marks: None,
                submitted_at: None,
            },
            title: "T".to_string(),
            subject: subject.to_string(),
        }
    }

    #[test]
    fn test_paginate_middle_page() {
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(paginate(&items, 3, 2), &[3, 4, 5]);
        assert_eq!(paginate(&items, 3, 3), &[6]);
    }

    #[test]
    fn test_paginate_past_end_is_empty() {
        let items = vec!['a', 'b', 'c'];
        assert!(paginate(&items, 3, 2).is_empty());
        assert!(paginate(&items, 3, 0).is_empty());
        assert!(paginate(&items, 0, 1).is_empty());
    }

    #[test]
    fn test_page_counts() {
        assert_eq!(total_pages(7, 3), 3);
        assert_eq!(total_pages(6, 3), 2);
        assert_eq!(total_pages(0, 3), 0);
        assert!(has_next_page(7, 3, 2));
        assert!(!has_next_page(6, 3, 2));
    }

    #[test]
    fn test_filter_all_is_identity() {
        let items = vec![make_assignment(1, "Maths"), make_assignment(2, "Physics")];
        assert_eq!(filter_by_subject(&items, ALL_SUBJECTS), items);
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let items = vec![make_assignment(1, "Maths"), make_assignment(2, "maths")];
        let filtered = filter_by_subject(&items, "Maths");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_search_student_or_file() {
        let rows = vec![
            make_row("101", "Essay.pdf", "English"),
            make_row("202", "lab.pdf", "Physics"),
        ];
        assert_eq!(search(&rows, "ESSAY").len(), 1);
        assert_eq!(search(&rows, "20").len(), 1);
        assert_eq!(search(&rows, ".pdf").len(), 2);
        assert_eq!(search(&rows, ""), rows);
    }

    #[test]
    fn test_subject_options_keep_first_seen_order() {
        let rows = vec![
            make_row("1", "a", "Physics"),
            make_row("2", "b", "English"),
            make_row("3", "c", "Physics"),
        ];
        assert_eq!(subject_options(&rows), vec!["All", "Physics", "English"]);
    }

    #[test]
    fn test_enrich_falls_back_to_na() {
        let assignments = vec![make_assignment(1, "Maths")];
        let mut orphan = make_row("1", "x.pdf", "").submission;
        orphan.assignment_id = 99;
        let rows = enrich_submissions(&[orphan], &assignments);
        assert_eq!(rows[0].title, NOT_AVAILABLE);
        assert_eq!(rows[0].subject, NOT_AVAILABLE);
    }

    #[test]
    fn test_students_only_see_their_rows() {
        let rows = vec![make_row("101", "a", "X"), make_row("202", "b", "X")];
        let student = Session::new("101", Role::Student);
        let teacher = Session::new("1234", Role::Teacher);
        assert_eq!(visible_to(rows.clone(), &student).len(), 1);
        assert_eq!(visible_to(rows, &teacher).len(), 2);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut items = vec![make_assignment(2, "a"), make_assignment(9, "b"), make_assignment(5, "c")];
        sort_newest_first(&mut items);
        let ids: Vec<i64> = items.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![9, 5, 2]);
    }
}
