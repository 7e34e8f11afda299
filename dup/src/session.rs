use dup_core::{DriveClient, DriveError, FileQuery, OAuthClient};
use thiserror::Error;

use crate::config::{AppConfig, ConfigError};
use crate::oauth_flow::{OAuthFlow, OAuthFlowError};
use crate::storage::{JsonCursorStore, OAuthState, StorageError, TokenStorage, now_unix};
use crate::token_provider::{TokenProvider, TokenProviderError};
use crate::vfs::DriveAccessor;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not authenticated with Google Drive")]
    NotAuthenticated,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("login failed: {0}")]
    Flow(#[from] OAuthFlowError),
    #[error("token refresh failed: {0}")]
    Token(#[from] TokenProviderError),
    #[error("oauth client setup failed: {0}")]
    OAuth(#[from] dup_core::OAuthError),
    #[error("could not verify Google Drive access: {0}")]
    Drive(#[from] DriveError),
}

/// Credentials and persisted state for one config directory.
pub struct Session {
    config: AppConfig,
    tokens: TokenStorage,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        let tokens = TokenStorage::new(&config.config_dir);
        Self { config, tokens }
    }

    /// A token file exists, parses, and is either unexpired or refreshable.
    pub fn is_authenticated(&self) -> bool {
        match self.tokens.get_oauth_state() {
            Ok(state) => state.is_usable_at(now_unix()),
            Err(StorageError::TokenNotFound) => false,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable token file");
                false
            }
        }
    }

    pub async fn login(&self) -> Result<(), SessionError> {
        let oauth = self.oauth_client()?;
        let token = OAuthFlow::new(oauth, self.config.oauth_timeout)
            .authenticate()
            .await?;
        let state = OAuthState::from_oauth_token(&token);

        // A token that cannot list a single file is not worth keeping.
        let client = self.drive_client(&state.access_token)?;
        client
            .list_files(&FileQuery {
                q: "trashed=false",
                page_size: 1,
                order_by: None,
                fields: "files(id)",
            })
            .await?;

        self.tokens.save_oauth_state(&state)?;
        tracing::info!(path = %self.tokens.path().display(), "saved oauth token");
        Ok(())
    }

    /// Removes the stored token. Returns whether one was present.
    pub fn logout(&self) -> Result<bool, SessionError> {
        let had_token = self.tokens.has_token();
        self.tokens.delete_token()?;
        Ok(had_token)
    }

    /// A Drive client holding a fresh access token; refreshed tokens are persisted.
    pub async fn authorized_client(&self) -> Result<DriveClient, SessionError> {
        let state = match self.tokens.get_oauth_state() {
            Ok(state) => state,
            Err(StorageError::TokenNotFound) => return Err(SessionError::NotAuthenticated),
            Err(err) => return Err(err.into()),
        };
        let oauth = if state.refresh_token.is_some() {
            self.oauth_client().ok()
        } else {
            None
        };
        let mut provider = TokenProvider::new(state, oauth);
        let access_token = match provider.valid_access_token().await {
            Ok(token) => token,
            Err(TokenProviderError::MissingRefreshToken) => {
                return Err(SessionError::NotAuthenticated);
            }
            Err(err) => return Err(err.into()),
        };
        if provider.was_refreshed() {
            self.tokens.save_oauth_state(provider.state())?;
        }
        self.drive_client(&access_token)
    }

    pub async fn accessor(&self) -> Result<DriveAccessor, SessionError> {
        let client = self.authorized_client().await?;
        Ok(DriveAccessor::new(client, self.config.retry))
    }

    pub fn cursor_store(&self) -> JsonCursorStore {
        JsonCursorStore::new(&self.config.config_dir)
    }

    fn drive_client(&self, access_token: &str) -> Result<DriveClient, SessionError> {
        let client = match self.config.api_base_url.as_deref() {
            Some(base) => DriveClient::with_base_url(base, access_token)?,
            None => DriveClient::new(access_token)?,
        };
        Ok(client)
    }

    fn oauth_client(&self) -> Result<OAuthClient, SessionError> {
        let creds = self.config.client_credentials()?;
        let client = match self.config.oauth_base_url.as_deref() {
            Some(base) => OAuthClient::with_base_url(base, creds.client_id, creds.client_secret)?,
            None => OAuthClient::new(creds.client_id, creds.client_secret)?,
        };
        Ok(client)
    }
}
