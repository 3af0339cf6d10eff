//! Error types for the catalog client

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur when talking to the catalog API
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error status
    #[error("Catalog API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// Credentials or token rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The catalog demands a captcha before issuing a token
    #[error("Captcha required, resolve at: {0}")]
    CaptchaRequired(String),

    /// The client has no token yet for an authenticated call
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A referenced object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API answered with a shape we cannot use
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl CatalogError {
    /// True when retrying with the same token cannot succeed
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::NotAuthenticated | Self::CaptchaRequired(_)
        )
    }
}

/// Map catalog failures onto the core taxonomy
///
/// Captcha demands keep their identity so the operator can resolve them
/// out of band; everything else is a catalog-unavailable condition for the
/// session layer.
impl From<CatalogError> for voxcore::Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CaptchaRequired(url) => voxcore::Error::CaptchaRequired(url),
            other => voxcore::Error::CatalogUnavailable(other.to_string()),
        }
    }
}
