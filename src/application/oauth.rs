use crate::application::NowProvider;
use crate::domain::models::OAuthToken;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::oauth_client::{
    ClientCredentials, OAuthHttpClient, TokenGrant, TokenResponse,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const TOKEN_LEEWAY_SECONDS: i64 = 60;

#[derive(Debug, Clone)]
pub struct GoogleOAuthSettings {
    pub credentials: ClientCredentials,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorization_endpoint: String,
}

impl GoogleOAuthSettings {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            credentials: ClientCredentials {
                client_id: client_id.into(),
                client_secret: client_secret.into(),
            },
            redirect_uri: redirect_uri.into(),
            scopes: vec![CALENDAR_SCOPE.to_string()],
            authorization_endpoint: GOOGLE_AUTHORIZATION_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureTokenResult {
    Existing(OAuthToken),
    Refreshed(OAuthToken),
    ReauthenticationRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

pub struct GoogleAuthorizer<S, C>
where
    S: CredentialStore,
    C: OAuthHttpClient,
{
    settings: GoogleOAuthSettings,
    credential_store: Arc<S>,
    oauth_client: Arc<C>,
    now_provider: NowProvider,
}

impl<S, C> GoogleAuthorizer<S, C>
where
    S: CredentialStore,
    C: OAuthHttpClient,
{
    pub fn new(
        settings: GoogleOAuthSettings,
        credential_store: Arc<S>,
        oauth_client: Arc<C>,
    ) -> Self {
        Self {
            settings,
            credential_store,
            oauth_client,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Consent URL with a fresh random `state`.
    pub fn authorization_request(&self) -> Result<AuthorizationRequest, InfraError> {
        let state = uuid::Uuid::new_v4().simple().to_string();
        let url = self.build_authorization_url(&state)?;
        Ok(AuthorizationRequest { url, state })
    }

    pub fn build_authorization_url(&self, state: &str) -> Result<String, InfraError> {
        if state.trim().is_empty() {
            return Err(InfraError::OAuth("state must not be empty".to_string()));
        }
        if self.settings.credentials.client_id.trim().is_empty() {
            return Err(InfraError::OAuth("client id must not be empty".to_string()));
        }
        if self.settings.scopes.is_empty() {
            return Err(InfraError::OAuth("at least one scope is required".to_string()));
        }

        let mut url = Url::parse(&self.settings.authorization_endpoint)
            .map_err(|error| {
                InfraError::OAuth(format!("invalid authorization endpoint: {error}"))
            })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.credentials.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("scope", &self.settings.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Exchanges a pasted authorization code and caches the resulting token.
    pub async fn authenticate_with_code(
        &self,
        authorization_code: &str,
    ) -> Result<OAuthToken, InfraError> {
        let code = authorization_code.trim();
        if code.is_empty() {
            return Err(InfraError::OAuth("authorization code must not be empty".to_string()));
        }

        let response = self
            .oauth_client
            .request_token(
                &self.settings.credentials,
                TokenGrant::AuthorizationCode {
                    code: code.to_string(),
                    redirect_uri: self.settings.redirect_uri.clone(),
                },
            )
            .await?;

        let token = self.token_from_response(response, None);
        self.credential_store.save_token(&token)?;
        info!(expires_at = %token.expires_at, "google token stored");
        Ok(token)
    }

    /// Returns a usable token, refreshing the cached one when it is about to expire.
    pub async fn ensure_access_token(&self) -> Result<EnsureTokenResult, InfraError> {
        let Some(stored) = self.credential_store.load_token()? else {
            debug!("no cached google token");
            return Ok(EnsureTokenResult::ReauthenticationRequired);
        };

        if stored.is_valid_at((self.now_provider)(), TOKEN_LEEWAY_SECONDS) {
            return Ok(EnsureTokenResult::Existing(stored));
        }

        let Some(refresh_token) = stored.refresh_token.clone() else {
            debug!("cached google token expired and has no refresh token");
            return Ok(EnsureTokenResult::ReauthenticationRequired);
        };

        let refreshed = self
            .oauth_client
            .request_token(
                &self.settings.credentials,
                TokenGrant::RefreshToken(refresh_token.clone()),
            )
            .await;

        match refreshed {
            Ok(response) => {
                let token = self.token_from_response(response, Some(refresh_token));
                self.credential_store.save_token(&token)?;
                debug!(expires_at = %token.expires_at, "google token refreshed");
                Ok(EnsureTokenResult::Refreshed(token))
            }
            Err(InfraError::OAuth(message)) => {
                warn!(error = %message, "google token refresh rejected");
                Ok(EnsureTokenResult::ReauthenticationRequired)
            }
            Err(error) => Err(error),
        }
    }

    fn token_from_response(
        &self,
        response: TokenResponse,
        fallback_refresh_token: Option<String>,
    ) -> OAuthToken {
        OAuthToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(fallback_refresh_token),
            expires_at: (self.now_provider)() + Duration::seconds(response.expires_in.max(0)),
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: response.scope,
        }
    }
}
