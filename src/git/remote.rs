//! Push URL resolution and token handling.
//!
//! The push URL comes from `GITHUB_REPO_URL` (process environment or `.env`)
//! when set, falling back to the `[remote "origin"]` url recorded in the
//! repository's git configuration. When a `GITHUB_TOKEN` is available and
//! the URL is an https GitHub URL, the token is injected as URL userinfo for
//! the duration of the push; it is never written to disk or echoed back.

use crate::config::EnvFile;
use std::path::Path;
use url::Url;

/// Resolve the URL pushes should go to, if any is configured.
pub fn resolve_push_url(root: &Path, env: &EnvFile) -> Option<String> {
    env.github_repo_url()
        .or_else(|| crate::git::config_get(root, "remote.origin.url"))
}

/// Inject `token` into an https GitHub URL as userinfo. Non-GitHub and
/// non-https URLs (ssh remotes in particular) are returned unchanged.
pub fn authenticated_url(repo_url: &str, token: &str) -> String {
    let Ok(mut url) = Url::parse(repo_url) else {
        return repo_url.to_string();
    };
    if url.scheme() != "https" || url.host_str() != Some("github.com") {
        return repo_url.to_string();
    }
    if url.set_username(token).is_err() {
        return repo_url.to_string();
    }
    url.to_string()
}

/// Blank out every occurrence of `token` in `text`, for log and error
/// output that may quote the push URL.
pub fn redact(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    text.replace(token, "***")
}
