use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::categories::classify;
use crate::config::{PollSettings, SettingsSource};
use crate::error::FetchError;
use crate::revision::Revision;
use crate::sources::RevisionSource;
use crate::tracker::NotificationTracker;
use crate::ui::{Notification, Notifier, StatusDisplay};

/// Where the poll loop currently is.
///
/// `Idle` is the only state that accepts a manual refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    ClassifyAndNotify,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Refreshed { total: usize, notified: usize },
    Failed(FetchError),
}

/// Cloneable handle for requesting an immediate refresh from outside the loop.
#[derive(Clone)]
pub struct RefreshHandle {
    state: watch::Receiver<PollState>,
    trigger: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Ask for a refresh now. Returns false, and does nothing, unless the
    /// scheduler is idle and no other request is already pending.
    pub fn refresh_now(&self) -> bool {
        let state = *self.state.borrow();
        if state != PollState::Idle {
            debug!(?state, "refresh already in progress, ignoring trigger");
            return false;
        }
        self.trigger.try_send(()).is_ok()
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }
}

/// Drives fetch → classify → notify → wait, one cycle at a time.
///
/// The scheduler owns the notification tracker; nothing else touches it.
pub struct Scheduler<S, N, D, C> {
    user_id: String,
    source: Arc<S>,
    notifier: N,
    display: D,
    settings_source: C,
    settings: PollSettings,
    tracker: NotificationTracker,
    state_tx: watch::Sender<PollState>,
    trigger_tx: mpsc::Sender<()>,
    trigger_rx: mpsc::Receiver<()>,
}

impl<S, N, D, C> Scheduler<S, N, D, C>
where
    S: RevisionSource + 'static,
    N: Notifier,
    D: StatusDisplay,
    C: SettingsSource,
{
    pub fn new(
        user_id: impl Into<String>,
        source: S,
        notifier: N,
        display: D,
        settings_source: C,
    ) -> Self {
        let (state_tx, _) = watch::channel(PollState::Idle);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        Self {
            user_id: user_id.into(),
            source: Arc::new(source),
            notifier,
            display,
            settings_source,
            settings: PollSettings::default(),
            tracker: NotificationTracker::new(),
            state_tx,
            trigger_tx,
            trigger_rx,
        }
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            state: self.state_tx.subscribe(),
            trigger: self.trigger_tx.clone(),
        }
    }

    pub fn state(&self) -> PollState {
        *self.state_tx.borrow()
    }

    /// Settings used by the most recent cycle.
    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Poll until `shutdown` flips to true (or its sender goes away).
    ///
    /// The first cycle starts immediately. Shutdown is honoured between
    /// cycles; an in-flight fetch is allowed to finish.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                info!("shutdown requested, exiting loop");
                break;
            }

            self.poll_once().await;

            let interval = self.settings.refresh_interval;
            info!(seconds = interval.as_secs(), "next refresh scheduled");
            if self.wait_for_next_cycle(&mut shutdown).await {
                info!("shutdown requested, exiting loop");
                break;
            }
        }
    }

    /// Run a single cycle and return to `Idle`.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        // Leave Idle before draining so no trigger slips in while the cycle starts.
        self.set_state(PollState::Fetching);
        while self.trigger_rx.try_recv().is_ok() {}

        let settings = self.refresh_settings();
        let source = Arc::clone(&self.source);
        let fetched = tokio::task::spawn_blocking(move || source.fetch_active_revisions())
            .await
            .unwrap_or_else(|e| Err(FetchError::Transport(format!("fetch worker failed: {e}"))));

        let outcome = match fetched {
            Ok(revisions) => {
                self.set_state(PollState::ClassifyAndNotify);
                self.classify_and_notify(&revisions, &settings)
            }
            Err(e) => {
                self.set_state(PollState::Failed);
                warn!(error = %e, "failed to fetch active revisions");
                self.display.set_degraded(true, Some(&e.to_string()));
                CycleOutcome::Failed(e)
            }
        };

        self.set_state(PollState::Idle);
        outcome
    }

    fn classify_and_notify(
        &mut self,
        revisions: &[Revision],
        settings: &PollSettings,
    ) -> CycleOutcome {
        info!(count = revisions.len(), "fetched active revisions");

        let classification = classify(&self.user_id, revisions);
        self.display.show(&classification);

        let newly = self.tracker.update(&self.user_id, revisions);
        let notified = if settings.notify {
            for rev in &newly {
                info!(revision = %rev.monogram(), title = rev.title, "revision needs attention");
                self.notifier
                    .notify(&Notification::for_revision(rev, settings.play_sound));
            }
            newly.len()
        } else {
            if !newly.is_empty() {
                debug!(count = newly.len(), "notifications disabled, not announcing");
            }
            0
        };

        self.display.set_degraded(false, None);
        CycleOutcome::Refreshed {
            total: revisions.len(),
            notified,
        }
    }

    fn refresh_settings(&mut self) -> PollSettings {
        match self.settings_source.load_settings() {
            Ok(settings) => self.settings = settings,
            Err(e) => warn!(error = %e, "failed to reload settings, keeping previous ones"),
        }
        self.settings.clone()
    }

    fn set_state(&self, state: PollState) {
        self.state_tx.send_replace(state);
    }

    /// Wait out the refresh interval. Returns true if we should stop.
    async fn wait_for_next_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.settings.refresh_interval) => false,
            Some(()) = self.trigger_rx.recv() => {
                info!("manual refresh requested");
                false
            }
            changed = shutdown.changed() => {
                if changed.is_ok() {
                    *shutdown.borrow()
                } else {
                    // sender dropped: nobody is left to keep us running
                    true
                }
            }
        }
    }
}
