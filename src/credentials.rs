use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

const ARCRC_FILE: &str = ".arcrc";

/// Where to reach Conduit and how to authenticate.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub url: String,
    pub api_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Default)]
struct Arcrc {
    #[serde(default)]
    hosts: BTreeMap<String, ArcrcHost>,
}

#[derive(Debug, Deserialize)]
struct ArcrcHost {
    token: Option<String>,
}

pub fn default_arcrc_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| Path::new(&home).join(ARCRC_FILE))
}

/// Resolve URL and token: config first, then the token env var, then `~/.arcrc`.
pub fn resolve(config: &Config) -> Result<Credentials> {
    resolve_with_arcrc(config, default_arcrc_path().as_deref())
}

pub fn resolve_with_arcrc(config: &Config, arcrc_path: Option<&Path>) -> Result<Credentials> {
    let arcrc = arcrc_path.and_then(read_arcrc).unwrap_or_default();

    let url = match &config.url {
        Some(url) => url.clone(),
        None => single_arcrc_host(&arcrc).ok_or_else(|| {
            Error::Credentials(
                "no Phabricator URL configured (set `url` in the config, pass --url, or keep a single host in ~/.arcrc)"
                    .to_string(),
            )
        })?,
    };

    if let Some(token) = config.api_token.as_ref().filter(|t| !t.is_empty()) {
        return Ok(Credentials {
            url,
            api_token: token.clone(),
        });
    }

    if let Ok(token) = std::env::var(&config.api_token_env)
        && !token.is_empty()
    {
        return Ok(Credentials {
            url,
            api_token: token,
        });
    }

    if let Some(token) = arcrc_token(&arcrc, &url) {
        debug!(url, "using API token from ~/.arcrc");
        return Ok(Credentials {
            url,
            api_token: token,
        });
    }

    Err(Error::Credentials(format!(
        "API token not found in config, ${} or ~/.arcrc for {url}",
        config.api_token_env
    )))
}

fn read_arcrc(path: &Path) -> Option<Arcrc> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(arcrc) => Some(arcrc),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring unreadable arcrc");
            None
        }
    }
}

/// `https://phab.example.com/api/` -> `https://phab.example.com`
fn normalize_host(host: &str) -> &str {
    let trimmed = host.trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed)
}

fn single_arcrc_host(arcrc: &Arcrc) -> Option<String> {
    if arcrc.hosts.len() != 1 {
        return None;
    }
    arcrc
        .hosts
        .keys()
        .next()
        .map(|host| normalize_host(host).to_string())
}

fn arcrc_token(arcrc: &Arcrc, url: &str) -> Option<String> {
    let wanted = normalize_host(url);
    arcrc
        .hosts
        .iter()
        .find(|(host, _)| normalize_host(host) == wanted)
        .and_then(|(_, entry)| entry.token.clone())
}
