pub mod phabricator;

use std::sync::Arc;

use crate::error::FetchError;
use crate::revision::Revision;

/// Anything that can list the revisions currently in flight.
///
/// Implementations block; the scheduler calls them from a worker thread.
/// Timeouts are the implementation's responsibility and surface as
/// `FetchError::Transport`.
pub trait RevisionSource: Send + Sync {
    fn fetch_active_revisions(&self) -> Result<Vec<Revision>, FetchError>;
}

impl<T: RevisionSource + ?Sized> RevisionSource for Arc<T> {
    fn fetch_active_revisions(&self) -> Result<Vec<Revision>, FetchError> {
        (**self).fetch_active_revisions()
    }
}

impl<T: RevisionSource + ?Sized> RevisionSource for Box<T> {
    fn fetch_active_revisions(&self) -> Result<Vec<Revision>, FetchError> {
        (**self).fetch_active_revisions()
    }
}
