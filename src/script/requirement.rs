//! Dependency specifier parsing and normalization
//!
//! Parses a single PEP-508-style requirement line and re-serializes it to a
//! canonical form, so that formatting differences between functionally
//! identical declarations (`requests  >= 2` vs `requests>=2`) hash to the
//! same environment fingerprint.

use std::fmt;

/// Version comparison operators, longest first so prefixes don't shadow
const OPERATORS: &[&str] = &["===", "==", "!=", "<=", ">=", "~=", "<", ">"];

/// A parsed dependency specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    name: String,
    extras: Vec<String>,
    /// Normalized version clauses, e.g. `>=2.0`
    clauses: Vec<String>,
    /// Direct reference (`name @ url`), mutually exclusive with clauses
    url: Option<String>,
    marker: Option<String>,
}

impl Requirement {
    /// Parse a specifier, returning a reason string on failure.
    ///
    /// The caller wraps failures into a user-facing error naming the raw
    /// line; parsing never continues past the first malformed element.
    pub fn parse(input: &str) -> Result<Self, String> {
        let s = input.trim();
        if s.is_empty() {
            return Err("expected a package name".to_string());
        }

        let (name, rest) = take_name(s)?;
        let rest = rest.trim_start();

        let (extras, rest) = if rest.starts_with('[') {
            take_extras(rest)?
        } else {
            (Vec::new(), rest)
        };
        let rest = rest.trim_start();

        // Split off an environment marker first: direct references may
        // carry one too
        let (spec_part, marker) = match rest.split_once(';') {
            Some((spec, marker)) => {
                let marker = collapse_whitespace(marker);
                if marker.is_empty() {
                    return Err("expected an environment marker after ';'".to_string());
                }
                (spec.trim(), Some(marker))
            }
            None => (rest, None),
        };

        // Direct URL reference
        if let Some(url_part) = spec_part.strip_prefix('@') {
            let url = url_part.trim();
            if url.is_empty() {
                return Err("expected a URL after '@'".to_string());
            }
            return Ok(Self {
                name,
                extras,
                clauses: Vec::new(),
                url: Some(url.to_string()),
                marker,
            });
        }

        // PEP 508 permits the version spec in parentheses
        let spec_part = spec_part
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(spec_part)
            .trim();

        let mut clauses = Vec::new();
        if !spec_part.is_empty() {
            for clause in spec_part.split(',') {
                clauses.push(parse_clause(clause)?);
            }
        }

        Ok(Self {
            name,
            extras,
            clauses,
            url: None,
            marker,
        })
    }

    /// The distribution name, without extras or version constraints
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical string form, suitable for fingerprinting
    pub fn normalized(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(ref url) = self.url {
            write!(f, " @ {url}")?;
        } else if !self.clauses.is_empty() {
            f.write_str(&self.clauses.join(","))?;
        }
        if let Some(ref marker) = self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn take_name(s: &str) -> Result<(String, &str), String> {
    let end = s.find(|c| !is_name_char(c)).unwrap_or(s.len());
    let name = &s[..end];
    if name.is_empty() {
        return Err("expected a package name".to_string());
    }
    let first = name.chars().next().unwrap_or(' ');
    let last = name.chars().last().unwrap_or(' ');
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(format!("invalid package name '{name}'"));
    }
    Ok((name.to_string(), &s[end..]))
}

fn take_extras(s: &str) -> Result<(Vec<String>, &str), String> {
    let close = s
        .find(']')
        .ok_or_else(|| "unterminated extras list".to_string())?;
    let mut extras = Vec::new();
    for extra in s[1..close].split(',') {
        let extra = extra.trim();
        if extra.is_empty() || !extra.chars().all(is_name_char) {
            return Err(format!("invalid extra name '{extra}'"));
        }
        extras.push(extra.to_string());
    }
    // Canonical form sorts extras so declaration order doesn't split the cache
    extras.sort();
    Ok((extras, &s[close + 1..]))
}

fn parse_clause(clause: &str) -> Result<String, String> {
    let clause = clause.trim();
    let op = OPERATORS
        .iter()
        .find(|op| clause.starts_with(**op))
        .ok_or_else(|| format!("missing version operator in '{clause}'"))?;
    let version: String = clause[op.len()..]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if version.is_empty() {
        return Err(format!("missing version after operator in '{clause}'"));
    }
    if !version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '-' | '_'))
    {
        return Err(format!("invalid version '{version}'"));
    }
    Ok(format!("{op}{version}"))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        Requirement::parse(s).unwrap().normalized()
    }

    #[test]
    fn bare_name() {
        assert_eq!(norm("six"), "six");
        assert_eq!(norm("  six  "), "six");
    }

    #[test]
    fn version_whitespace_collapses() {
        assert_eq!(norm("requests  >= 2"), "requests>=2");
        assert_eq!(norm("requests>=2"), "requests>=2");
        assert_eq!(norm("requests >= 2.0 , < 3"), "requests>=2.0,<3");
    }

    #[test]
    fn parenthesized_spec() {
        assert_eq!(norm("requests (>=2.0)"), "requests>=2.0");
    }

    #[test]
    fn extras_sorted() {
        assert_eq!(norm("foo[b, a]>=1"), "foo[a,b]>=1");
    }

    #[test]
    fn marker_whitespace_collapses() {
        assert_eq!(
            norm("foo>=1 ;  python_version   < \"3.8\""),
            "foo>=1; python_version < \"3.8\""
        );
    }

    #[test]
    fn url_reference() {
        assert_eq!(
            norm("foo @ https://example.test/foo.tar.gz"),
            "foo @ https://example.test/foo.tar.gz"
        );
    }

    #[test]
    fn url_reference_with_marker() {
        assert_eq!(
            norm("foo @ https://example.test/foo.tar.gz ;  python_version  < \"3.8\""),
            "foo @ https://example.test/foo.tar.gz; python_version < \"3.8\""
        );
    }

    #[test]
    fn normalization_idempotent() {
        for spec in ["requests  >= 2", "foo[b,a] >= 1 ; os_name == \"posix\"", "six"] {
            let once = norm(spec);
            assert_eq!(norm(&once), once);
        }
    }

    #[test]
    fn name_accessor() {
        let req = Requirement::parse("requests[socks]>=2; os_name == \"posix\"").unwrap();
        assert_eq!(req.name(), "requests");
    }

    #[test]
    fn rejects_malformed() {
        assert!(Requirement::parse("").is_err());
        assert!(Requirement::parse("-leading-dash").is_err());
        assert!(Requirement::parse("foo[unclosed").is_err());
        assert!(Requirement::parse("foo >=").is_err());
        assert!(Requirement::parse("foo 2.0").is_err());
        assert!(Requirement::parse("foo @ ").is_err());
        assert!(Requirement::parse("foo ;").is_err());
    }

    #[test]
    fn epoch_and_local_versions() {
        assert_eq!(norm("foo==1!2.0+local"), "foo==1!2.0+local");
        assert_eq!(norm("foo==2.*"), "foo==2.*");
    }
}
