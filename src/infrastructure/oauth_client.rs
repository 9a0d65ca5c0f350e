use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;

pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    AuthorizationCode { code: String, redirect_uri: String },
    RefreshToken(String),
}

impl TokenGrant {
    fn form_fields(self) -> Vec<(&'static str, String)> {
        match self {
            Self::AuthorizationCode { code, redirect_uri } => vec![
                ("grant_type", "authorization_code".to_string()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ],
            Self::RefreshToken(refresh_token) => vec![
                ("grant_type", "refresh_token".to_string()),
                ("refresh_token", refresh_token),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

#[async_trait]
pub trait OAuthHttpClient: Send + Sync {
    async fn request_token(
        &self,
        credentials: &ClientCredentials,
        grant: TokenGrant,
    ) -> Result<TokenResponse, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestOAuthClient {
    client: Client,
    token_endpoint: String,
}

#[derive(Debug, serde::Deserialize)]
struct TokenPayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl ReqwestOAuthClient {
    pub fn new() -> Self {
        Self::with_token_endpoint(GOOGLE_TOKEN_ENDPOINT)
    }

    pub fn with_token_endpoint(token_endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token_endpoint: token_endpoint.into(),
        }
    }
}

impl Default for ReqwestOAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthHttpClient for ReqwestOAuthClient {
    async fn request_token(
        &self,
        credentials: &ClientCredentials,
        grant: TokenGrant,
    ) -> Result<TokenResponse, InfraError> {
        let mut form = vec![
            ("client_id", credentials.client_id.clone()),
            ("client_secret", credentials.client_secret.clone()),
        ];
        form.extend(grant.form_fields());

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|error| InfraError::OAuth(format!("request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::OAuth(format!("failed reading token response: {error}")))?;

        let parsed = serde_json::from_str::<TokenPayload>(&body).map_err(|error| {
            InfraError::OAuth(format!("invalid token response payload: {error}; body={body}"))
        })?;

        if !status.is_success() || parsed.error.is_some() {
            let code = parsed.error.unwrap_or_else(|| format!("http_{}", status.as_u16()));
            let detail = parsed.error_description.unwrap_or(body);
            return Err(InfraError::OAuth(format!("token endpoint error: {code}; {detail}")));
        }

        let access_token = parsed
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| InfraError::OAuth("token response has no access_token".to_string()))?;

        Ok(TokenResponse {
            access_token,
            refresh_token: parsed.refresh_token,
            expires_in: parsed.expires_in.unwrap_or(0).max(0),
            token_type: parsed.token_type,
            scope: parsed.scope,
        })
    }
}
