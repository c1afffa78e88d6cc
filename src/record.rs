/// A search query in the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    pub name: String,
    pub checked: bool,
}

/// A job posting extracted from a detail page.
///
/// `job_id` is best-effort and frequently 0, so records are deduplicated by
/// `description` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: i64,
    pub position_title: String,
    pub company_title: String,
    pub description: String,
    pub skills: String,
}

impl JobRecord {
    /// The whitespace-separated tokens of the position title.
    pub fn search_terms(&self) -> impl Iterator<Item = &str> {
        self.position_title.split_whitespace()
    }
}
