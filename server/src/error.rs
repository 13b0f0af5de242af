use reqwest::StatusCode;
use thiserror::Error;

const BODY_PREVIEW_CHARS: usize = 200;

/// Why a widget fetch failed. Every variant is a transport failure as far as
/// the page is concerned; the variants only differ in what gets logged.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("upstream status {status}; body preview: {preview}")]
    Status { status: StatusCode, preview: String },
    #[error("failed to decode widget payload: {source}; body preview: {preview}")]
    Decode {
        #[source]
        source: serde_json::Error,
        preview: String,
    },
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) | Self::Body(e) => e.status(),
            Self::Decode { .. } => None,
        }
    }
}

pub fn body_preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FetchError, body_preview};
    use reqwest::StatusCode;

    #[test]
    fn preview_is_truncated() {
        let long = "x".repeat(500);
        assert_eq!(body_preview(long.as_bytes()).len(), 200);
        assert_eq!(body_preview(b"short"), "short");
    }

    #[test]
    fn status_error_reports_code() {
        let error = FetchError::Status {
            status: StatusCode::FORBIDDEN,
            preview: r#"{"message":"Widget Disabled","code":50004}"#.to_string(),
        };
        assert_eq!(error.status(), Some(StatusCode::FORBIDDEN));
        assert!(error.to_string().contains("403"));
        assert!(error.to_string().contains("Widget Disabled"));
    }
}
