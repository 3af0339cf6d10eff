//! Authentication against the catalog
//!
//! Two paths: validate an existing OAuth token via the account-status
//! endpoint, or obtain a fresh token from the OAuth host with username and
//! password. The OAuth host answers captcha demands with an
//! `x_captcha_url` field, surfaced as [`CatalogError::CaptchaRequired`].

use super::CatalogApi;
use crate::error::{CatalogError, Result};
use crate::models::StatusWire;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Default OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.mobile.yandex.net/1/token";

/// Client identity presented to the OAuth endpoint
const CLIENT_ID: &str = "23cabbbdc6cd418abb4b39c32c41195d";
const CLIENT_SECRET: &str = "53bc75238f0c4d08a118e51fe9203300";

/// Successful token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authenticated account identity
#[derive(Debug, Clone)]
pub struct AuthInfo {
    /// OAuth token for subsequent API calls
    pub token: String,
    /// Account id
    pub uid: String,
    /// Account login, when the API reports one
    pub login: Option<String>,
}

impl CatalogApi {
    /// Validate a token against the account-status endpoint
    ///
    /// On success the token and account id are installed on the client.
    pub async fn login_with_token(&mut self, token: &str) -> Result<AuthInfo> {
        debug!("Validating existing catalog token");
        self.set_auth(token.to_string(), String::new());

        let status: StatusWire = match self.get("/account/status", &[]).await {
            Ok(status) => status,
            Err(e) => {
                // Do not keep a token the API rejected.
                self.clear_auth();
                return Err(e);
            }
        };

        let info = AuthInfo {
            token: token.to_string(),
            uid: status.account.uid.clone(),
            login: status.account.login,
        };
        self.set_auth(info.token.clone(), info.uid.clone());
        info!(uid = %info.uid, "Catalog token accepted");
        Ok(info)
    }

    /// Obtain a token from the default OAuth endpoint
    pub async fn login_with_credentials(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<AuthInfo> {
        self.login_with_credentials_at(DEFAULT_TOKEN_URL, username, password)
            .await
    }

    /// Obtain a token from a specific OAuth endpoint (used by tests)
    pub async fn login_with_credentials_at(
        &mut self,
        token_url: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthInfo> {
        info!("Requesting catalog token for {}", username);

        let params = [
            ("grant_type", "password"),
            ("client_id", CLIENT_ID),
            ("client_secret", CLIENT_SECRET),
            ("username", username),
            ("password", password),
        ];

        let response = self.http_client().post(token_url).form(&params).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Some(captcha_url) = extract_captcha_url(&text) {
                warn!("Catalog demands a captcha");
                return Err(CatalogError::CaptchaRequired(captcha_url));
            }
            warn!("Token request failed ({}): {}", status, text);
            return Err(CatalogError::Unauthorized(text));
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        self.login_with_token(&token.access_token).await
    }

    /// True once a token and account id are installed
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some() && self.uid().map(|u| !u.is_empty()).unwrap_or(false)
    }

    fn clear_auth(&mut self) {
        self.reset_auth();
    }
}

/// Find the captcha URL in an OAuth error body, if present
fn extract_captcha_url(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("x_captcha_url")
        .and_then(|u| u.as_str())
        .map(|u| u.to_string())
}
