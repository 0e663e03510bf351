use serde::Serialize;
use tracing::debug;

use crate::revision::{Revision, Status};

/// Display buckets for revisions, in display order.
///
/// Buckets overlap: a revision lands in every category whose rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    MustReview,
    ReadyToReview,
    ReadyToLand,
    ReadyToUpdate,
    Drafts,
    WaitingOnReview,
    WaitingOnAuthors,
    WaitingOnOtherReviewers,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::MustReview,
        Category::ReadyToReview,
        Category::ReadyToLand,
        Category::ReadyToUpdate,
        Category::Drafts,
        Category::WaitingOnReview,
        Category::WaitingOnAuthors,
        Category::WaitingOnOtherReviewers,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Category::MustReview => "Must Review",
            Category::ReadyToReview => "Ready to Review",
            Category::ReadyToLand => "Ready to Land",
            Category::ReadyToUpdate => "Ready to Update",
            Category::Drafts => "Drafts",
            Category::WaitingOnReview => "Waiting on Review",
            Category::WaitingOnAuthors => "Waiting on Authors",
            Category::WaitingOnOtherReviewers => "Waiting on Other Reviewers",
        }
    }

    /// Message to show when nothing is in this bucket.
    pub fn empty_message(self) -> &'static str {
        match self {
            Category::MustReview => "No revisions are blocked on your review.",
            Category::ReadyToReview => "No revisions are ready to review.",
            Category::ReadyToLand => "No revisions are ready to land.",
            Category::ReadyToUpdate => "None of your revisions are ready to update.",
            Category::Drafts => "You have no draft revisions.",
            Category::WaitingOnReview => "None of your revisions are waiting on review.",
            Category::WaitingOnAuthors => "No revisions are waiting on authors.",
            Category::WaitingOnOtherReviewers => "No revisions are waiting for other reviewers.",
        }
    }

    /// Whether the rule needs per-reviewer state from the source.
    pub fn uses_reviewer_state(self) -> bool {
        matches!(
            self,
            Category::MustReview | Category::ReadyToReview | Category::WaitingOnOtherReviewers
        )
    }

    pub fn matches(self, user_id: &str, rev: &Revision) -> bool {
        let mine = rev.is_authored_by(user_id);
        match self {
            Category::MustReview => {
                rev.is_status(&[Status::NeedsReview]) && !mine && rev.is_blocking_reviewer(user_id)
            }
            Category::ReadyToReview => {
                rev.is_status(&[Status::NeedsReview]) && !mine && !rev.is_accepted_by(user_id)
            }
            Category::ReadyToLand => rev.is_status(&[Status::Accepted]) && mine,
            Category::ReadyToUpdate => {
                rev.is_status(&[Status::NeedsRevision, Status::ChangesPlanned]) && mine
            }
            Category::Drafts => rev.is_status(&[Status::Draft]),
            Category::WaitingOnReview => rev.is_status(&[Status::NeedsReview]) && mine,
            Category::WaitingOnAuthors => {
                rev.is_status(&[Status::Accepted, Status::NeedsRevision, Status::ChangesPlanned])
                    && !mine
            }
            Category::WaitingOnOtherReviewers => {
                rev.is_status(&[Status::NeedsReview]) && !mine && rev.is_accepted_by(user_id)
            }
        }
    }
}

/// Result of sorting a revision list into categories.
///
/// Always holds every category in `Category::ALL` order, even when empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    buckets: Vec<(Category, Vec<Revision>)>,
    unclaimed: Vec<String>,
    total: usize,
}

impl Classification {
    pub fn get(&self, category: Category) -> &[Revision] {
        self.buckets
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, revs)| revs.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[Revision])> {
        self.buckets.iter().map(|(c, revs)| (*c, revs.as_slice()))
    }

    /// Global ids of revisions no category claimed.
    pub fn unclaimed(&self) -> &[String] {
        &self.unclaimed
    }

    /// Number of revisions that went into the classification.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn to_json(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct Bucket<'a> {
            title: &'static str,
            empty_message: &'static str,
            revisions: &'a [Revision],
        }

        let buckets: Vec<Bucket<'_>> = self
            .iter()
            .map(|(category, revisions)| Bucket {
                title: category.title(),
                empty_message: category.empty_message(),
                revisions,
            })
            .collect();

        serde_json::json!({
            "total": self.total,
            "categories": buckets,
            "unclaimed": self.unclaimed,
        })
    }
}

/// Sort `revisions` into every category whose rule matches for `user_id`.
pub fn classify(user_id: &str, revisions: &[Revision]) -> Classification {
    let mut buckets: Vec<(Category, Vec<Revision>)> =
        Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
    let mut unclaimed = Vec::new();

    for rev in revisions {
        let mut claimed = false;
        for (category, revs) in buckets.iter_mut() {
            if category.matches(user_id, rev) {
                revs.push(rev.clone());
                claimed = true;
            }
        }
        if !claimed {
            debug!(
                revision = %rev.monogram(),
                status = rev.status.value(),
                "no category claimed revision"
            );
            unclaimed.push(rev.global_id.clone());
        }
    }

    Classification {
        buckets,
        unclaimed,
        total: revisions.len(),
    }
}
