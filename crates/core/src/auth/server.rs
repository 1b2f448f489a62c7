use reqwest::Url;

use crate::error::SessionError;

const DEFAULT_SCHEME: &str = "https://";

/// Cleans up a server address typed by a user.
///
/// Surrounding whitespace and trailing slashes are removed and `https://` is
/// prepended when no scheme is given. The result must be an http(s) URL with
/// a host.
///
/// ```rust
/// use twigs_core::normalize_server;
///
/// assert_eq!(normalize_server(" example.com/ ").unwrap(), "https://example.com");
/// assert_eq!(normalize_server("http://10.0.0.2:8080").unwrap(), "http://10.0.0.2:8080");
/// assert!(normalize_server("   ").is_err());
/// ```
pub fn normalize_server(input: &str) -> Result<String, SessionError> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SessionError::InvalidServer("empty server address".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{trimmed}")
    };

    let url = Url::parse(&candidate)
        .map_err(|err| SessionError::InvalidServer(format!("{trimmed}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SessionError::InvalidServer(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SessionError::InvalidServer(format!("{trimmed}: missing host")));
    }

    Ok(candidate)
}
