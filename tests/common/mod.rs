#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc as std_mpsc};
use std::time::Duration;

use phabwatch::categories::Classification;
use phabwatch::config::PollSettings;
use phabwatch::error::FetchError;
use phabwatch::revision::{Revision, Status};
use phabwatch::sources::RevisionSource;
use phabwatch::ui::{Notification, Notifier, StatusDisplay};
use tokio::sync::mpsc;

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

/// Settings whose interval never elapses during a test.
pub fn long_interval_settings() -> PollSettings {
    PollSettings {
        refresh_interval: Duration::from_secs(3600),
        notify: true,
        play_sound: false,
    }
}

// --- Source that blocks each fetch until the test releases it ---

pub struct Gate {
    started: mpsc::UnboundedReceiver<()>,
    release: std_mpsc::Sender<()>,
}

impl Gate {
    /// Wait until the source has entered a fetch.
    pub async fn wait_started(&mut self) {
        tokio::time::timeout(Duration::from_secs(5), self.started.recv())
            .await
            .expect("fetch should start")
            .expect("source dropped");
    }

    /// Let one fetch (current or future) complete.
    pub fn release(&self) {
        self.release.send(()).unwrap();
    }
}

pub struct GatedSource {
    responses: Mutex<VecDeque<Result<Vec<Revision>, FetchError>>>,
    pub fetches: Arc<AtomicUsize>,
    started: mpsc::UnboundedSender<()>,
    release: Mutex<std_mpsc::Receiver<()>>,
}

impl GatedSource {
    pub fn new(responses: Vec<Result<Vec<Revision>, FetchError>>) -> (Self, Gate) {
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let source = Self {
            responses: Mutex::new(responses.into()),
            fetches: Arc::new(AtomicUsize::new(0)),
            started: started_tx,
            release: Mutex::new(release_rx),
        };
        let gate = Gate {
            started: started_rx,
            release: release_tx,
        };
        (source, gate)
    }
}

impl RevisionSource for GatedSource {
    fn fetch_active_revisions(&self) -> Result<Vec<Revision>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let _ = self.started.send(());
        let _ = self.release.lock().unwrap().recv();
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]))
    }
}

// --- UI collaborator that reports everything as events ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Shown(usize),
    Degraded(bool),
    Notified(String),
}

#[derive(Clone)]
pub struct EventRecorder {
    events: mpsc::UnboundedSender<Event>,
}

impl EventRecorder {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { events: tx }, rx)
    }
}

impl Notifier for EventRecorder {
    fn notify(&self, notification: &Notification) {
        let _ = self
            .events
            .send(Event::Notified(notification.identifier.clone()));
    }
}

impl StatusDisplay for EventRecorder {
    fn show(&self, classification: &Classification) {
        let _ = self.events.send(Event::Shown(classification.total()));
    }

    fn set_degraded(&self, degraded: bool, _message: Option<&str>) {
        let _ = self.events.send(Event::Degraded(degraded));
    }
}

/// Collect events up to and including `until`.
pub async fn events_until(rx: &mut mpsc::UnboundedReceiver<Event>, until: Event) -> Vec<Event> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {until:?}, saw {seen:?}"))
            .expect("recorder dropped");
        let done = event == until;
        seen.push(event);
        if done {
            return seen;
        }
    }
}
