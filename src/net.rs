//! Remote content fetching
//!
//! Thin wrapper over ureq. Fetch failures are fatal when the content is a
//! script to execute, and advisory-only when they come from the version
//! oracle; that policy lives with the callers.

use crate::error::{RunxError, RunxResult};
use tracing::debug;

/// Fetch a URL's body as text
pub fn fetch_text(url: &str) -> RunxResult<String> {
    debug!("Fetching {url}");
    let mut response = ureq::get(url).call().map_err(|e| RunxError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    response
        .body_mut()
        .read_to_string()
        .map_err(|e| RunxError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
}
