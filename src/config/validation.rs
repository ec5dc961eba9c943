//! Field-level format validators
//!
//! These are the checks a form would run on individual inputs. They return a
//! human-readable message on failure and never touch the document.

use regex::Regex;
use std::sync::LazyLock;

static HOSTNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.-]+(:[0-9]+)?$").expect("hostname pattern is a valid regex")
});

static GITHOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://([a-zA-Z0-9]+\.?/?)+$").expect("githost pattern is a valid regex")
});

/// Validate the registry's public hostname
///
/// # Errors
///
/// Returns a message if:
/// - The hostname has characters outside `[a-zA-Z0-9.-]` or a malformed port
/// - The hostname points at the loopback address
#[inline]
pub fn validate_server_hostname(hostname: &str) -> Result<(), String> {
    if !HOSTNAME_PATTERN.is_match(hostname) {
        return Err(format!(
            "Invalid server hostname: '{hostname}'. Expected host or host:port"
        ));
    }

    if hostname.starts_with("127.0.0.1") || hostname.starts_with("localhost") {
        return Err(
            "Please specify a non-localhost hostname. \"localhost\" will refer to the container, not your machine."
                .to_owned(),
        );
    }

    Ok(())
}

/// Validate an enterprise Git host endpoint
///
/// # Errors
///
/// Returns a message if the endpoint is not an `http(s)://` URL made of
/// alphanumeric labels
#[inline]
pub fn validate_git_host(endpoint: &str) -> Result<(), String> {
    if GITHOST_PATTERN.is_match(endpoint) {
        return Ok(());
    }

    Err(format!(
        "Invalid endpoint: '{endpoint}'. Expected a URL such as https://github.example.com/"
    ))
}

/// Check a value against an engine field pattern
///
/// A pattern that fails to compile is reported rather than ignored.
///
/// # Errors
///
/// Returns a message if the value does not match or the pattern is invalid
#[inline]
pub fn validate_pattern(field: &str, pattern: &str, value: &str) -> Result<(), String> {
    let regex = Regex::new(pattern)
        .map_err(|e| format!("Field '{field}' has an invalid pattern '{pattern}': {e}"))?;

    if regex.is_match(value) {
        return Ok(());
    }

    Err(format!("Field '{field}' must match {pattern}"))
}
