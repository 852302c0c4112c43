use thiserror::Error;

/// A failed call to the remote API.
///
/// The remote side may report several errors for one call; they are kept
/// apart in `reasons` and only joined when the error is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{endpoint} failed{}", detail(.status, .reasons))]
pub struct TransportError {
    pub endpoint: String,
    pub status: Option<u16>,
    pub reasons: Vec<String>,
}

impl TransportError {
    pub fn new(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: None,
            reasons: vec![reason.into()],
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

fn detail(status: &Option<u16>, reasons: &[String]) -> String {
    let mut detail = String::new();
    if let Some(status) = status {
        detail.push_str(&format!(" (HTTP {})", status));
    }
    if !reasons.is_empty() {
        detail.push_str(": ");
        detail.push_str(&reasons.join("; "));
    }
    detail
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("insufficient permissions: {}", .reasons.join("; "))]
    PermissionDenied { reasons: Vec<String> },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid Cloudflare API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Cloudflare API error: {0}")]
    CloudflareApi(#[from] cloudflare::framework::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
