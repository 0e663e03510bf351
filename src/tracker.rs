use std::collections::HashSet;

use tracing::debug;

use crate::revision::Revision;

/// Remembers which revisions were actionable at the last poll so each one is
/// announced only when it becomes actionable.
///
/// The snapshot lives for the process only. It is replaced, not merged, on
/// every update: a revision that drops out of the actionable set and comes
/// back is announced again.
#[derive(Debug, Default)]
pub struct NotificationTracker {
    previous: HashSet<String>,
}

impl NotificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the snapshot to `revisions` and return the ones that are newly
    /// actionable for `user_id`, in input order.
    pub fn update(&mut self, user_id: &str, revisions: &[Revision]) -> Vec<Revision> {
        let mut current = HashSet::new();
        let mut newly = Vec::new();

        for rev in revisions.iter().filter(|r| r.is_actionable(user_id)) {
            // insert() is false for a global id repeated within this batch
            if current.insert(rev.global_id.clone()) && !self.previous.contains(&rev.global_id) {
                newly.push(rev.clone());
            }
        }

        debug!(
            actionable = current.len(),
            previously = self.previous.len(),
            newly = newly.len(),
            "updated actionable snapshot"
        );
        self.previous = current;
        newly
    }

    pub fn actionable_count(&self) -> usize {
        self.previous.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::{ReviewState, Status};
    use crate::test_helpers::{make_revision, reviewer};

    fn ids(revs: &[Revision]) -> Vec<u64> {
        revs.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_first_update_reports_all_actionable() {
        let mut tracker = NotificationTracker::new();
        let revs = vec![
            make_revision(1, Status::NeedsReview, "u2"),
            make_revision(2, Status::Draft, "u1"),
            make_revision(3, Status::Accepted, "u1"),
        ];
        assert_eq!(ids(&tracker.update("u1", &revs)), vec![1, 3]);
        assert_eq!(tracker.actionable_count(), 2);
    }

    #[test]
    fn test_second_update_with_same_input_is_empty() {
        let mut tracker = NotificationTracker::new();
        let revs = vec![make_revision(1, Status::NeedsReview, "u2")];
        assert_eq!(tracker.update("u1", &revs).len(), 1);
        assert!(tracker.update("u1", &revs).is_empty());
    }

    #[test]
    fn test_reentering_actionable_notifies_again() {
        let mut tracker = NotificationTracker::new();
        let actionable = vec![make_revision(1, Status::NeedsReview, "u2")];
        let drafted = vec![make_revision(1, Status::Draft, "u2")];

        assert_eq!(ids(&tracker.update("u1", &actionable)), vec![1]);
        assert!(tracker.update("u1", &drafted).is_empty());
        assert_eq!(ids(&tracker.update("u1", &actionable)), vec![1]);
    }

    #[test]
    fn test_disappearing_revision_is_forgotten() {
        let mut tracker = NotificationTracker::new();
        let rev = make_revision(1, Status::NeedsRevision, "u1");
        tracker.update("u1", std::slice::from_ref(&rev));
        tracker.update("u1", &[]);
        assert_eq!(tracker.actionable_count(), 0);
        assert_eq!(ids(&tracker.update("u1", &[rev])), vec![1]);
    }

    #[test]
    fn test_accepting_removes_from_snapshot() {
        let mut tracker = NotificationTracker::new();
        let mut rev = make_revision(1, Status::NeedsReview, "u2");
        tracker.update("u1", std::slice::from_ref(&rev));

        rev.reviewers = vec![reviewer("u1", ReviewState::Accepted, false)];
        assert!(tracker.update("u1", std::slice::from_ref(&rev)).is_empty());
        assert_eq!(tracker.actionable_count(), 0);
    }

    #[test]
    fn test_status_change_within_actionable_does_not_renotify() {
        let mut tracker = NotificationTracker::new();
        tracker.update("u1", &[make_revision(1, Status::NeedsRevision, "u1")]);
        // still actionable for the author, just a different reason
        assert!(
            tracker
                .update("u1", &[make_revision(1, Status::Accepted, "u1")])
                .is_empty()
        );
    }

    #[test]
    fn test_new_revision_alongside_known_ones() {
        let mut tracker = NotificationTracker::new();
        let first = make_revision(1, Status::NeedsReview, "u2");
        tracker.update("u1", std::slice::from_ref(&first));

        let revs = vec![make_revision(5, Status::Accepted, "u1"), first];
        assert_eq!(ids(&tracker.update("u1", &revs)), vec![5]);
    }

    #[test]
    fn test_duplicate_global_id_reported_once() {
        let mut tracker = NotificationTracker::new();
        let rev = make_revision(1, Status::NeedsReview, "u2");
        let newly = tracker.update("u1", &[rev.clone(), rev]);
        assert_eq!(ids(&newly), vec![1]);
    }
}
