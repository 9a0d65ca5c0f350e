use crate::domain::models::OAuthToken;
use crate::infrastructure::error::InfraError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const TOKEN_FILE_NAME: &str = "google-token.json";

pub trait CredentialStore: Send + Sync {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError>;
    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError>;
}

/// Keeps the Google token as a JSON file in the user's cache directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(TOKEN_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                InfraError::Credential(format!("failed creating {}: {error}", parent.display()))
            })?;
        }
        let payload = serde_json::to_string_pretty(token)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        fs::write(&self.path, format!("{payload}\n")).map_err(|error| {
            InfraError::Credential(format!("failed writing {}: {error}", self.path.display()))
        })
    }

    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError> {
        let payload = match fs::read_to_string(&self.path) {
            Ok(value) => value,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(InfraError::Credential(format!(
                    "failed reading {}: {error}",
                    self.path.display()
                )));
            }
        };

        let token = serde_json::from_str::<OAuthToken>(&payload).map_err(|error| {
            InfraError::Credential(format!("corrupt token cache {}: {error}", self.path.display()))
        })?;
        Ok(Some(token))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<OAuthToken>>,
}

impl InMemoryCredentialStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<OAuthToken>>, InfraError> {
        self.token
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError> {
        *self.lock()? = Some(token.clone());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError> {
        Ok(self.lock()?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn token() -> OAuthToken {
        OAuthToken {
            access_token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
                .single()
                .expect("valid instant")
                + Duration::seconds(3599),
            token_type: "Bearer".to_string(),
            scope: Some("https://www.googleapis.com/auth/calendar".to_string()),
        }
    }

    fn temp_store() -> FileCredentialStore {
        FileCredentialStore::in_dir(&std::env::temp_dir().join(format!(
            "boardcal-token-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4()
        )))
    }

    #[test]
    fn file_store_round_trips_and_overwrites() {
        let store = temp_store();
        assert_eq!(store.load_token().expect("empty load"), None);

        store.save_token(&token()).expect("save");
        assert!(store.path().ends_with(TOKEN_FILE_NAME));
        assert_eq!(store.load_token().expect("load"), Some(token()));

        let mut refreshed = token();
        refreshed.access_token = "ya29.refreshed".to_string();
        store.save_token(&refreshed).expect("overwrite");
        assert_eq!(store.load_token().expect("reload"), Some(refreshed));

        if let Some(parent) = store.path().parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn corrupt_cache_is_a_credential_error() {
        let store = temp_store();
        let parent = store.path().parent().expect("parent").to_path_buf();
        fs::create_dir_all(&parent).expect("mkdir");
        fs::write(store.path(), "not json").expect("write");

        let error = store.load_token().expect_err("corrupt");
        assert!(matches!(error, InfraError::Credential(_)));

        let _ = fs::remove_dir_all(parent);
    }

    #[test]
    fn in_memory_store_replaces_previous_token() {
        let store = InMemoryCredentialStore::default();
        store.save_token(&token()).expect("save");

        let mut newer = token();
        newer.access_token = "ya29.newer".to_string();
        store.save_token(&newer).expect("save newer");

        assert_eq!(store.load_token().expect("load"), Some(newer));
    }
}
