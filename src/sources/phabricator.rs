use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::categories::Category;
use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::FetchError;
use crate::revision::{ReviewState, Reviewer, Revision, Status};

use super::RevisionSource;

const INITIAL_BACKOFF_MS: u64 = 500;
const MAX_PAGES: usize = 20;

// ---------------------------------------------------------------------------
// Client abstraction (for testability)
// ---------------------------------------------------------------------------

/// A Conduit API call. Returns the `result` member of the response.
pub trait ConduitClient: Send + Sync {
    fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<serde_json::Value, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ConduitResponse {
    result: Option<serde_json::Value>,
    error_code: Option<String>,
    error_info: Option<String>,
}

struct HttpConduitClient {
    base_url: String,
    api_token: String,
    agent: ureq::Agent,
    max_retries: u32,
}

impl HttpConduitClient {
    fn new(credentials: &Credentials, timeout: Duration, max_retries: u32) -> Self {
        Self {
            base_url: credentials.url.clone(),
            api_token: credentials.api_token.clone(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            max_retries: max_retries.max(1),
        }
    }

    fn send(&self, url: &str, form: &[(&str, &str)]) -> Result<ureq::Response, ureq::Error> {
        self.agent
            .post(url)
            .set("Accept", "application/json")
            .send_form(form)
    }
}

impl ConduitClient for HttpConduitClient {
    fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/api/{method}", self.base_url);
        let mut form: Vec<(&str, &str)> = vec![("api.token", self.api_token.as_str())];
        form.extend_from_slice(params);

        let response = retry_with_backoff_ms(
            || self.send(&url, &form),
            is_retryable,
            INITIAL_BACKOFF_MS,
            self.max_retries,
        )
        .map_err(|e| classify_ureq_error(method, e))?;

        let body = response
            .into_string()
            .map_err(|e| FetchError::Transport(format!("{method}: failed to read response: {e}")))?;
        parse_conduit_body(method, &body)
    }
}

/// Call `f` up to `max_retries` times, doubling the delay after each
/// retryable failure. Non-retryable errors are returned immediately.
fn retry_with_backoff_ms<F, T, E>(
    mut f: F,
    retryable: impl Fn(&E) -> bool,
    initial_backoff_ms: u64,
    max_retries: u32,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut backoff_ms = initial_backoff_ms;
    let mut attempt = 1;
    loop {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if attempt < max_retries && retryable(&e) => {
                warn!(
                    attempt,
                    error = %e,
                    backoff_ms,
                    "retrying Conduit call after transient error"
                );
                thread::sleep(Duration::from_millis(backoff_ms));
                backoff_ms = backoff_ms.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Only retry rate-limits (429), server errors (5xx), and transport/network errors.
fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

fn classify_ureq_error(method: &str, err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::Status(401, _) => FetchError::Protocol(format!(
            "{method} returned 401 Unauthorized; check the API token"
        )),
        ureq::Error::Status(code, _) => {
            FetchError::Protocol(format!("{method} returned HTTP {code}"))
        }
        ureq::Error::Transport(t) => FetchError::Transport(format!("{method}: {t}")),
    }
}

fn parse_conduit_body(method: &str, body: &str) -> Result<serde_json::Value, FetchError> {
    let response: ConduitResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Decode(format!("{method}: invalid JSON response: {e}")))?;

    if let Some(code) = response.error_code {
        let info = response.error_info.unwrap_or_default();
        return Err(FetchError::Protocol(format!("{method}: {code}: {info}")));
    }

    response
        .result
        .ok_or_else(|| FetchError::Decode(format!("{method}: response missing result")))
}

// ---------------------------------------------------------------------------
// Conduit response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResult {
    data: Vec<RevisionNode>,
    #[serde(default)]
    cursor: Option<CursorNode>,
}

#[derive(Debug, Deserialize)]
struct CursorNode {
    after: Option<serde_json::Value>,
}

impl CursorNode {
    fn after(&self) -> Option<String> {
        match self.after.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RevisionNode {
    id: u64,
    phid: String,
    fields: FieldsNode,
    #[serde(default)]
    attachments: Option<AttachmentsNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldsNode {
    title: String,
    #[serde(rename = "authorPHID")]
    author_phid: String,
    status: StatusNode,
    #[serde(default)]
    date_modified: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StatusNode {
    value: String,
}

#[derive(Debug, Deserialize)]
struct AttachmentsNode {
    #[serde(default)]
    reviewers: Option<ReviewersNode>,
}

#[derive(Debug, Deserialize)]
struct ReviewersNode {
    reviewers: Vec<ReviewerNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewerNode {
    #[serde(rename = "reviewerPHID")]
    reviewer_phid: String,
    status: String,
    #[serde(default)]
    is_blocking: bool,
}

/// The account an API token belongs to (`user.whoami`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub phid: String,
    pub user_name: String,
    #[serde(default)]
    pub real_name: String,
}

// ---------------------------------------------------------------------------
// PhabricatorSource
// ---------------------------------------------------------------------------

pub struct PhabricatorSource {
    base_url: String,
    client: Box<dyn ConduitClient>,
    warned_missing_reviewers: AtomicBool,
}

impl PhabricatorSource {
    pub fn new(credentials: &Credentials, config: &Config) -> Self {
        Self {
            base_url: credentials.url.clone(),
            client: Box::new(HttpConduitClient::new(
                credentials,
                Duration::from_secs(config.request_timeout),
                config.max_retries,
            )),
            warned_missing_reviewers: AtomicBool::new(false),
        }
    }

    pub fn with_client(base_url: &str, client: Box<dyn ConduitClient>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            warned_missing_reviewers: AtomicBool::new(false),
        }
    }

    pub fn whoami(&self) -> Result<User, FetchError> {
        let result = self.client.call("user.whoami", &[])?;
        serde_json::from_value(result)
            .map_err(|e| FetchError::Decode(format!("user.whoami: unexpected result: {e}")))
    }

    fn parse_revision(&self, node: RevisionNode) -> Revision {
        let reviewers = node
            .attachments
            .and_then(|a| a.reviewers)
            .map(|r| r.reviewers)
            .unwrap_or_default()
            .into_iter()
            .map(|r| Reviewer {
                reviewer_id: r.reviewer_phid,
                review_state: ReviewState::from_value(&r.status),
                is_blocking: r.is_blocking,
            })
            .collect();

        Revision {
            id: node.id,
            uri: Some(format!("{}/D{}", self.base_url, node.id)),
            global_id: node.phid,
            title: node.fields.title,
            author_id: node.fields.author_phid,
            status: Status::from_value(&node.fields.status.value),
            reviewers,
            date_modified: node.fields.date_modified,
        }
    }

    fn note_missing_reviewers(&self, missing: usize) {
        if missing == 0 || self.warned_missing_reviewers.swap(true, Ordering::Relaxed) {
            return;
        }
        let affected: Vec<&str> = Category::ALL
            .into_iter()
            .filter(|c| c.uses_reviewer_state())
            .map(|c| c.title())
            .collect();
        warn!(
            missing,
            affected = affected.join(", "),
            "server did not return reviewer attachments; reviewer-based categories may be incomplete"
        );
    }
}

impl RevisionSource for PhabricatorSource {
    fn fetch_active_revisions(&self) -> Result<Vec<Revision>, FetchError> {
        let mut revisions = Vec::new();
        let mut missing_reviewers = 0;
        let mut after: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let mut params = vec![("queryKey", "active"), ("attachments[reviewers]", "1")];
            if let Some(ref cursor) = after {
                params.push(("after", cursor.as_str()));
            }

            let result = self.client.call("differential.revision.search", &params)?;
            let parsed: SearchResult = serde_json::from_value(result).map_err(|e| {
                FetchError::Decode(format!("differential.revision.search: unexpected result: {e}"))
            })?;

            for node in parsed.data {
                let has_reviewers = node
                    .attachments
                    .as_ref()
                    .is_some_and(|a| a.reviewers.is_some());
                if !has_reviewers {
                    missing_reviewers += 1;
                }
                revisions.push(self.parse_revision(node));
            }

            after = parsed.cursor.and_then(|c| c.after());
            if after.is_none() {
                break;
            }
            if page == MAX_PAGES {
                warn!(pages = MAX_PAGES, "too many pages of active revisions, truncating");
            }
        }

        self.note_missing_reviewers(missing_reviewers);
        debug!(count = revisions.len(), "fetched active revisions");
        Ok(revisions)
    }
}
