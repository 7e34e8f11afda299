use dup_core::OAuthClient;
use thiserror::Error;

use crate::storage::{OAuthState, now_unix};

const REFRESH_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenProviderError {
    #[error("oauth client is required to refresh expired token")]
    MissingOAuthClient,
    #[error("refresh token is missing")]
    MissingRefreshToken,
    #[error("oauth refresh failed: {0}")]
    OAuth(#[from] dup_core::OAuthError),
}

/// Hands out an access token, refreshing it shortly before expiry.
pub struct TokenProvider {
    state: OAuthState,
    oauth_client: Option<OAuthClient>,
    refreshed: bool,
}

impl TokenProvider {
    pub fn new(state: OAuthState, oauth_client: Option<OAuthClient>) -> Self {
        Self {
            state,
            oauth_client,
            refreshed: false,
        }
    }

    pub async fn valid_access_token(&mut self) -> Result<String, TokenProviderError> {
        if self.should_refresh() {
            self.refresh().await?;
        }
        Ok(self.state.access_token.clone())
    }

    pub fn state(&self) -> &OAuthState {
        &self.state
    }

    /// Whether the held state changed since construction and needs persisting.
    pub fn was_refreshed(&self) -> bool {
        self.refreshed
    }

    pub async fn refresh_now(&mut self) -> Result<String, TokenProviderError> {
        self.refresh().await?;
        Ok(self.state.access_token.clone())
    }

    fn should_refresh(&self) -> bool {
        self.state
            .is_expired_at(now_unix().saturating_add(REFRESH_SKEW_SECS))
    }

    async fn refresh(&mut self) -> Result<(), TokenProviderError> {
        let refresh_token = self
            .state
            .refresh_token
            .clone()
            .ok_or(TokenProviderError::MissingRefreshToken)?;
        let client = self
            .oauth_client
            .as_ref()
            .ok_or(TokenProviderError::MissingOAuthClient)?;
        let token = client.refresh_token(&refresh_token, None).await?;
        let mut refreshed = OAuthState::from_oauth_token(&token);
        // Google omits the refresh token on refresh responses.
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token);
        }
        if refreshed.scope.is_none() {
            refreshed.scope = self.state.scope.clone();
        }
        if refreshed.token_type.is_none() {
            refreshed.token_type = self.state.token_type.clone();
        }
        tracing::debug!(expires_at = ?refreshed.expires_at, "access token refreshed");
        self.state = refreshed;
        self.refreshed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(expires_at: Option<i64>, refresh_token: Option<&str>) -> OAuthState {
        OAuthState {
            access_token: "old-token".into(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at,
            scope: Some(dup_core::DRIVE_SCOPE.into()),
            token_type: Some("Bearer".into()),
        }
    }

    #[tokio::test]
    async fn returns_current_token_when_not_expired() {
        let mut provider = TokenProvider::new(state(Some(i64::MAX), Some("refresh-1")), None);

        let token = provider
            .valid_access_token()
            .await
            .expect("token should be valid");
        assert_eq!(token, "old-token");
        assert!(!provider.was_refreshed());
    }

    #[tokio::test]
    async fn refreshes_token_when_expired_and_keeps_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;
        let oauth_client = OAuthClient::with_base_url(&server.uri(), "client-id", "secret")
            .expect("oauth client should be built");
        let mut provider = TokenProvider::new(state(Some(0), Some("refresh-1")), Some(oauth_client));

        let token = provider
            .valid_access_token()
            .await
            .expect("token should refresh");

        assert_eq!(token, "new-token");
        assert!(provider.was_refreshed());
        assert_eq!(provider.state().refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(provider.state().scope.as_deref(), Some(dup_core::DRIVE_SCOPE));
    }

    #[tokio::test]
    async fn refreshes_token_inside_the_skew_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;
        let oauth_client = OAuthClient::with_base_url(&server.uri(), "client-id", "secret")
            .expect("oauth client should be built");
        let expires_soon = now_unix() + 10;
        let mut provider =
            TokenProvider::new(state(Some(expires_soon), Some("refresh-1")), Some(oauth_client));

        let token = provider.valid_access_token().await.expect("token should refresh");
        assert_eq!(token, "new-token");
    }

    #[tokio::test]
    async fn returns_error_when_expired_and_no_refresh_token() {
        let mut provider = TokenProvider::new(state(Some(0), None), None);

        let err = provider
            .valid_access_token()
            .await
            .expect_err("expected missing refresh token error");
        assert!(matches!(err, TokenProviderError::MissingRefreshToken));
    }

    #[tokio::test]
    async fn returns_error_when_expired_without_oauth_client() {
        let mut provider = TokenProvider::new(state(Some(0), Some("refresh-1")), None);

        let err = provider
            .valid_access_token()
            .await
            .expect_err("expected missing client error");
        assert!(matches!(err, TokenProviderError::MissingOAuthClient));
    }
}
