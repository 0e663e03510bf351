use crate::revision::{ReviewState, Reviewer, Revision, Status};

/// Create a `Revision` with sensible defaults for tests.
pub fn make_revision(id: u64, status: Status, author: &str) -> Revision {
    Revision {
        id,
        global_id: format!("PHID-DREV-{id}"),
        title: format!("Revision {id}"),
        author_id: author.to_string(),
        status,
        reviewers: vec![],
        uri: None,
        date_modified: None,
    }
}

pub fn reviewer(id: &str, state: ReviewState, is_blocking: bool) -> Reviewer {
    Reviewer {
        reviewer_id: id.to_string(),
        review_state: state,
        is_blocking,
    }
}
