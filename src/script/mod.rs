//! Script requirement header extraction
//!
//! A script opts into an isolated environment with a leading comment block:
//!
//! ```text
//! # Requirements:
//! # requests>=2
//! # six
//! ```
//!
//! The sentinel line is a comment whose stripped content is exactly
//! `Requirements:`. Subsequent comment lines are dependency specifiers; a
//! blank comment line or the first non-comment line ends the block.

pub mod requirement;

pub use requirement::Requirement;

use crate::error::{RunxError, RunxResult};

/// Stripped comment content that opens a requirements block
pub const HEADER_SENTINEL: &str = "Requirements:";

/// Extract the normalized requirement list from a script's content.
///
/// Returns `None` when the script has no requirements header at all; such a
/// script runs directly with the ambient interpreter. A header with zero
/// requirement lines yields `Some(vec![])`, which still routes through the
/// isolated-environment path: an environment with no explicit requirements
/// is a distinct, cacheable state.
///
/// A malformed specifier is fatal and names the offending line; extraction
/// does not continue past it.
pub fn extract_requirements(content: &str) -> RunxResult<Option<Vec<String>>> {
    let mut lines = content.lines();

    let mut found = false;
    for line in lines.by_ref() {
        let Some(comment) = line.strip_prefix('#') else {
            continue;
        };
        if comment.trim() == HEADER_SENTINEL {
            found = true;
            break;
        }
    }
    if !found {
        return Ok(None);
    }

    let mut requirements = Vec::new();
    for line in lines {
        let Some(comment) = line.strip_prefix('#') else {
            break;
        };
        let spec = comment.trim();
        if spec.is_empty() {
            break;
        }

        let req = Requirement::parse(spec).map_err(|reason| RunxError::InvalidRequirement {
            line: spec.to_string(),
            reason,
        })?;
        // Store the normalized form, not the original line, so formatting
        // differences don't create spurious cache misses.
        requirements.push(req.normalized());
    }

    Ok(Some(requirements))
}
