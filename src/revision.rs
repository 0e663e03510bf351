use serde::{Serialize, Serializer};

/// Differential revision status, as reported in `fields.status.value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    NeedsReview,
    NeedsRevision,
    Accepted,
    ChangesPlanned,
    Draft,
    /// Any value we don't recognize. Matches no category and is never actionable.
    Unknown(String),
}

impl Status {
    pub fn from_value(value: &str) -> Self {
        match value {
            "needs-review" => Status::NeedsReview,
            "needs-revision" => Status::NeedsRevision,
            "accepted" => Status::Accepted,
            "changes-planned" => Status::ChangesPlanned,
            "draft" => Status::Draft,
            other => Status::Unknown(other.to_string()),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Status::NeedsReview => "needs-review",
            Status::NeedsRevision => "needs-revision",
            Status::Accepted => "accepted",
            Status::ChangesPlanned => "changes-planned",
            Status::Draft => "draft",
            Status::Unknown(value) => value.as_str(),
        }
    }

    /// Human-readable name, used as the notification subtitle.
    pub fn display_name(&self) -> &str {
        match self {
            Status::NeedsReview => "Needs Review",
            Status::NeedsRevision => "Needs Revision",
            Status::Accepted => "Accepted",
            Status::ChangesPlanned => "Changes Planned",
            Status::Draft => "Draft",
            Status::Unknown(value) => value.as_str(),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.value())
    }
}

/// A reviewer's state on a revision (`added`, `accepted`, `rejected`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Added,
    Accepted,
    Rejected,
    Unknown(String),
}

impl ReviewState {
    pub fn from_value(value: &str) -> Self {
        match value {
            "added" => ReviewState::Added,
            "accepted" => ReviewState::Accepted,
            "rejected" => ReviewState::Rejected,
            other => ReviewState::Unknown(other.to_string()),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ReviewState::Added => "added",
            ReviewState::Accepted => "accepted",
            ReviewState::Rejected => "rejected",
            ReviewState::Unknown(value) => value.as_str(),
        }
    }
}

impl Serialize for ReviewState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reviewer {
    pub reviewer_id: String,
    pub review_state: ReviewState,
    pub is_blocking: bool,
}

/// Snapshot of one revision as of the last fetch.
///
/// `global_id` (the PHID) is stable across polls and is the identity used for
/// change detection; everything else may change between fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub id: u64,
    pub global_id: String,
    pub title: String,
    pub author_id: String,
    pub status: Status,
    pub reviewers: Vec<Reviewer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<i64>,
}

impl Revision {
    /// Monogram shown to users, e.g. `D123`.
    pub fn monogram(&self) -> String {
        format!("D{}", self.id)
    }

    pub fn is_status(&self, statuses: &[Status]) -> bool {
        statuses.contains(&self.status)
    }

    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }

    fn reviewer(&self, user_id: &str) -> Option<&Reviewer> {
        self.reviewers.iter().find(|r| r.reviewer_id == user_id)
    }

    pub fn is_blocking_reviewer(&self, user_id: &str) -> bool {
        self.reviewer(user_id).is_some_and(|r| r.is_blocking)
    }

    pub fn is_accepted_by(&self, user_id: &str) -> bool {
        self.reviewer(user_id)
            .is_some_and(|r| r.review_state == ReviewState::Accepted)
    }

    /// Whether `user_id` has to take the next step on this revision.
    ///
    /// Reviewers act on revisions that need review and that they haven't
    /// accepted yet; authors act on everything that came back to them. Drafts
    /// and unknown statuses are never actionable.
    pub fn is_actionable(&self, user_id: &str) -> bool {
        match self.status {
            Status::NeedsReview => !self.is_authored_by(user_id) && !self.is_accepted_by(user_id),
            Status::NeedsRevision | Status::Accepted | Status::ChangesPlanned => {
                self.is_authored_by(user_id)
            }
            Status::Draft | Status::Unknown(_) => false,
        }
    }
}
