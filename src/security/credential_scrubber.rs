//! Credential scrubbing for log lines and error messages.
//!
//! Provider errors frequently echo request URLs and headers back. Everything
//! derived from such an error goes through [`safe_error_message`] before it
//! is logged or returned to a client.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CREDENTIAL_PATTERNS: Vec<(Regex, &'static str)> = vec![
        // GitHub personal, OAuth, app and fine-grained tokens
        (Regex::new(r"\b(gh[pousr]_[A-Za-z0-9]{20,}|github_pat_[A-Za-z0-9_]{20,})").unwrap(),
         "<REDACTED_GITHUB_TOKEN>"),

        // AWS access key IDs
        (Regex::new(r"\b(AKIA|ASIA)[A-Z0-9]{16}\b").unwrap(),
         "<REDACTED_AWS_KEY>"),

        // Named AWS secrets
        (Regex::new(r"(?i)(secret[_-]?access[_-]?key|secretAccessKey)\s*[:=]\s*([A-Za-z0-9/+=]{32,})").unwrap(),
         "$1=<REDACTED_AWS_SECRET>"),

        // Authorization headers
        (Regex::new(r"(?i)(authorization)\s*[:=]\s*(bearer\s+|token\s+)?([A-Za-z0-9\-._~+/]+=*)").unwrap(),
         "$1=<REDACTED_TOKEN>"),

        // Named tokens and secrets, including query parameters
        (Regex::new(r"(?i)(token|auth_token|access_token|secret|gh_notify_secret)\s*[:=]\s*([^\s&]{8,})").unwrap(),
         "$1=<REDACTED_SECRET>"),

        // Basic auth in URLs
        (Regex::new(r"(https?://)([^:/@\s]+):([^@\s]+)@").unwrap(),
         "$1<REDACTED_USER>:<REDACTED_PASS>@"),
    ];
}

/// Replace every recognised credential in `input` with a placeholder.
///
/// ```
/// use artifact_relay::security::credential_scrubber::scrub_credentials;
///
/// let scrubbed = scrub_credentials("GET https://u:p@api.example.com failed");
/// assert_eq!(scrubbed, "GET https://<REDACTED_USER>:<REDACTED_PASS>@api.example.com failed");
/// ```
pub fn scrub_credentials(input: &str) -> String {
    let mut result = input.to_string();

    for (pattern, replacement) in CREDENTIAL_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}

/// Format `context: error` with credentials scrubbed.
pub fn safe_error_message(context: &str, error: &impl std::fmt::Display) -> String {
    let raw_message = format!("{}: {}", context, error);
    scrub_credentials(&raw_message)
}
