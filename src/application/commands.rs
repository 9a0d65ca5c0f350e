use crate::application::board_sync::{BoardSyncService, SyncSummary};
use crate::application::error::SyncError;
use crate::application::oauth::{EnsureTokenResult, GoogleAuthorizer, GoogleOAuthSettings};
use crate::infrastructure::config::{
    self, AppConfig, GOOGLE_CLIENT_ID, GOOGLE_SECRET, MONDAY_API_KEY, parse_time_zone,
};
use crate::infrastructure::credential_store::FileCredentialStore;
use crate::infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;
use crate::infrastructure::monday_client::ReqwestMondayClient;
use crate::infrastructure::oauth_client::ReqwestOAuthClient;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Values from flags or the environment. Each one wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct SettingOverrides {
    pub monday_api_key: Option<String>,
    pub google_client_id: Option<String>,
    pub google_secret: Option<String>,
    pub timezone: Option<String>,
}

/// Remote endpoints. Tests point these at mock servers.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub monday_api: Option<String>,
    pub calendar_api: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
    pub overrides: SettingOverrides,
    pub endpoints: Endpoints,
}

impl CommandContext {
    pub fn new(config_path: PathBuf, cache_dir: PathBuf, overrides: SettingOverrides) -> Self {
        Self {
            config_path,
            cache_dir,
            overrides,
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn settings(&self) -> Result<Settings, SyncError> {
        let file = config::load_config(&self.config_path)?;
        Settings::resolve(file, &self.overrides)
    }

    fn token_store(&self) -> Arc<FileCredentialStore> {
        Arc::new(FileCredentialStore::in_dir(&self.cache_dir))
    }

    fn oauth_client(&self) -> Arc<ReqwestOAuthClient> {
        Arc::new(match &self.endpoints.token {
            Some(endpoint) => ReqwestOAuthClient::with_token_endpoint(endpoint.clone()),
            None => ReqwestOAuthClient::new(),
        })
    }
}

#[derive(Debug, Clone)]
struct Settings {
    monday_api_key: Option<String>,
    google_client_id: Option<String>,
    google_secret: Option<String>,
    time_zone: Tz,
    redirect_uri: String,
}

impl Settings {
    fn resolve(file: AppConfig, overrides: &SettingOverrides) -> Result<Self, SyncError> {
        let pick = |flag: &Option<String>, stored: Option<String>| {
            flag.as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned)
                .or(stored)
        };
        let time_zone = match overrides.timezone.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => parse_time_zone(name)?,
            _ => file.time_zone()?,
        };

        Ok(Self {
            monday_api_key: pick(&overrides.monday_api_key, file.monday_api_key),
            google_client_id: pick(&overrides.google_client_id, file.google_client_id),
            google_secret: pick(&overrides.google_secret, file.google_secret),
            time_zone,
            redirect_uri: file.redirect_uri,
        })
    }

    fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, SyncError> {
        value.as_deref().ok_or(SyncError::MissingSetting(key))
    }

    fn oauth(&self) -> Result<GoogleOAuthSettings, SyncError> {
        Ok(GoogleOAuthSettings::new(
            Self::required(&self.google_client_id, GOOGLE_CLIENT_ID)?,
            Self::required(&self.google_secret, GOOGLE_SECRET)?,
            self.redirect_uri.clone(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The user has to open this URL and come back with `--code`.
    AuthorizationUrl(String),
    Authenticated { expires_at: DateTime<Utc> },
}

pub async fn sync_board_impl(
    context: &CommandContext,
    board_id: u64,
) -> Result<SyncSummary, SyncError> {
    let settings = context.settings()?;
    let monday_api_key = Settings::required(&settings.monday_api_key, MONDAY_API_KEY)?;
    let authorizer = GoogleAuthorizer::new(
        settings.oauth()?,
        context.token_store(),
        context.oauth_client(),
    );

    let access_token = match authorizer.ensure_access_token().await? {
        EnsureTokenResult::Existing(token) => token.access_token,
        EnsureTokenResult::Refreshed(token) => {
            debug!("using refreshed google token");
            token.access_token
        }
        EnsureTokenResult::ReauthenticationRequired => {
            return Err(SyncError::AuthorizationRequired);
        }
    };

    let board_client = Arc::new(match &context.endpoints.monday_api {
        Some(endpoint) => ReqwestMondayClient::with_endpoint(monday_api_key, endpoint.clone()),
        None => ReqwestMondayClient::new(monday_api_key),
    });
    let calendar_client = Arc::new(match &context.endpoints.calendar_api {
        Some(base) => ReqwestGoogleCalendarClient::with_api_base(base.clone()),
        None => ReqwestGoogleCalendarClient::new(),
    });

    info!(board_id, time_zone = settings.time_zone.name(), "syncing board");
    BoardSyncService::new(board_client, calendar_client, settings.time_zone)
        .sync_board(&access_token, board_id)
        .await
}

pub async fn authenticate_impl(
    context: &CommandContext,
    authorization_code: Option<String>,
) -> Result<AuthOutcome, SyncError> {
    let settings = context.settings()?;
    let authorizer = GoogleAuthorizer::new(
        settings.oauth()?,
        context.token_store(),
        context.oauth_client(),
    );

    match authorization_code {
        Some(code) => {
            let token = authorizer.authenticate_with_code(&code).await?;
            Ok(AuthOutcome::Authenticated {
                expires_at: token.expires_at,
            })
        }
        None => {
            let request = authorizer.authorization_request()?;
            debug!(state = %request.state, "built authorization url");
            Ok(AuthOutcome::AuthorizationUrl(request.url))
        }
    }
}

pub fn config_set_impl(config_path: &Path, assignments: &[String]) -> Result<AppConfig, SyncError> {
    let updated = config::set_values(config_path, assignments)?;
    info!(path = %config_path.display(), keys = assignments.len(), "config updated");
    Ok(updated)
}
