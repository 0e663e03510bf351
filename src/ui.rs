use std::io::Write;

use crate::categories::Classification;
use crate::revision::Revision;

/// Payload for a single "needs your attention" alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub identifier: String,
    pub url: Option<String>,
    pub sound: bool,
}

impl Notification {
    pub fn for_revision(rev: &Revision, sound: bool) -> Self {
        Self {
            title: rev.title.clone(),
            subtitle: rev.status.display_name().to_string(),
            identifier: rev.monogram(),
            url: rev.uri.clone(),
            sound,
        }
    }
}

/// Delivers alerts. Fire-and-forget: failures are the notifier's problem.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Receives the categorized view and the degraded-state toggle.
pub trait StatusDisplay: Send + Sync {
    fn show(&self, classification: &Classification);

    /// `message` is a short description of the last failure, if any.
    fn set_degraded(&self, degraded: bool, message: Option<&str>);
}

/// Notifier that prints to stderr and rings the terminal bell when sound is on.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: &Notification) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "[phabwatch] {} {} ({})",
            notification.identifier, notification.title, notification.subtitle
        );
        if let Some(url) = &notification.url {
            let _ = write!(stderr, " {url}");
        }
        if notification.sound {
            let _ = write!(stderr, "\x07");
        }
        let _ = writeln!(stderr);
    }
}

/// Display that prints each refresh as a categorized listing on stderr.
pub struct StderrDisplay;

impl StatusDisplay for StderrDisplay {
    fn show(&self, classification: &Classification) {
        eprint!("{}", render_text(classification));
    }

    fn set_degraded(&self, degraded: bool, message: Option<&str>) {
        match (degraded, message) {
            (true, Some(msg)) => eprintln!("[phabwatch] refresh failed: {msg}"),
            (true, None) => eprintln!("[phabwatch] refresh failed"),
            (false, _) => {}
        }
    }
}

/// Plain-text listing of a classification, one section per category.
pub fn render_text(classification: &Classification) -> String {
    let mut out = format!("[phabwatch] {} active revisions\n", classification.total());
    for (category, revisions) in classification.iter() {
        out.push_str(&format!("\n{}\n", category.title()));
        if revisions.is_empty() {
            out.push_str(&format!("  {}\n", category.empty_message()));
        }
        for rev in revisions {
            out.push_str(&format!("  {} {}", rev.monogram(), rev.title));
            if let Some(uri) = &rev.uri {
                out.push_str(&format!("  {uri}"));
            }
            out.push('\n');
        }
    }
    out
}
