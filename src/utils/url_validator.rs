//! URL validation for incoming create requests.
//!
//! URLs are stored exactly as submitted so that resolving a code returns the
//! caller's original string. Validation only rejects input that can never be
//! a redirect target.

use url::Url;

use crate::error::AppError;

/// Checks that `input` is an absolute `http` or `https` URL.
///
/// # Errors
///
/// Returns [`AppError::Validation`] for empty input, malformed URLs and any
/// other scheme (`javascript:`, `data:`, `file:`, ...).
///
/// # Examples
///
/// ```ignore
/// assert!(validate_url("https://example.com/path").is_ok());
/// assert!(validate_url("ftp://example.com").is_err());
/// ```
pub fn validate_url(input: &str) -> Result<(), AppError> {
    if input.trim().is_empty() {
        return Err(AppError::validation("url must not be empty"));
    }

    let url = Url::parse(input)
        .map_err(|e| AppError::validation(format!("invalid url format: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::validation(format!(
                "only http and https urls are allowed, got {other}"
            )));
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(AppError::validation("url must have a host"));
    }

    Ok(())
}
