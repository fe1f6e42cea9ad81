//! Where benchmark bytes come from: a local file or an `http(s)://` URL.

use std::time::Duration;

use log::info;
use reqwest::blocking::Client;

use crate::error::AppError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// True if `location` should be fetched over HTTP.
pub fn is_url(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Read all bytes from a path or URL.
pub fn read_bytes(location: &str) -> Result<Vec<u8>, AppError> {
    if is_url(location) {
        fetch(location)
    } else {
        std::fs::read(location).map_err(|e| AppError::new(2, format!("Failed to read '{location}': {e}")))
    }
}

fn fetch(url: &str) -> Result<Vec<u8>, AppError> {
    info!("fetching {url}");
    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| AppError::new(2, format!("HTTP client error: {e}")))?;

    let resp = client
        .get(url)
        .send()
        .map_err(|e| AppError::new(2, format!("Request to '{url}' failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AppError::new(
            2,
            format!("Request to '{url}' failed with status {}.", resp.status()),
        ));
    }

    let body = resp
        .bytes()
        .map_err(|e| AppError::new(2, format!("Failed to read response from '{url}': {e}")))?;
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_recognized_by_scheme() {
        assert!(is_url("https://example.com/report.html"));
        assert!(is_url("HTTP://example.com/a.json"));
        assert!(!is_url("samples/guidellm.json"));
        assert!(!is_url("httpdata/a.json"));
    }

    #[test]
    fn reads_local_files() {
        let path = std::env::temp_dir().join(format!("latfit-source-{}.json", std::process::id()));
        std::fs::write(&path, b"{\"data\":[]}").unwrap();
        let bytes = read_bytes(path.to_str().unwrap()).unwrap();
        assert_eq!(bytes, b"{\"data\":[]}");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_files_are_input_errors() {
        let err = read_bytes("/definitely/not/here.json").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
