use directories::BaseDirs;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Resolved client settings: where the issuer lives and where the token
/// pair is kept on disk.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub credentials_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials_path: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("no abacus.yaml found")]
    Missing,
    #[error("settings invalid: {0}")]
    Invalid(String),
}

impl SettingsError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Missing => {
                "No abacus.yaml found—create one with the issuer base URL.".to_string()
            }
            Self::Invalid(detail) => format!("Settings invalid—{detail}. Update abacus.yaml."),
        }
    }
}

impl ClientSettings {
    /// Loads settings from the first `abacus.yaml` candidate found.
    ///
    /// # Errors
    /// `SettingsError::Missing` when no candidate exists (callers usually
    /// fall back to `Self::default()`); `SettingsError::Invalid` for an
    /// unreadable or malformed file.
    pub fn load() -> Result<Self, SettingsError> {
        let path = locate_settings_file().ok_or(SettingsError::Missing)?;
        let contents = fs::read_to_string(&path).map_err(|err| {
            SettingsError::Invalid(format!("failed to read {}: {err}", path.display()))
        })?;
        let config: AbacusConfig = serde_yaml::from_str(&contents)
            .map_err(|err| SettingsError::Invalid(format!("invalid abacus.yaml: {err}")))?;
        resolve_client_settings(config.client.unwrap_or_default())
    }
}

fn resolve_client_settings(section: ClientSection) -> Result<ClientSettings, SettingsError> {
    let base_url = match section.base_url {
        Some(raw) => {
            let trimmed = raw.trim().trim_end_matches('/').to_string();
            let parsed = url::Url::parse(&trimmed)
                .map_err(|err| SettingsError::Invalid(format!("bad base_url `{trimmed}`: {err}")))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(SettingsError::Invalid(format!(
                    "base_url must be http or https, got `{}`",
                    parsed.scheme()
                )));
            }
            trimmed
        }
        None => DEFAULT_BASE_URL.to_string(),
    };
    Ok(ClientSettings {
        base_url,
        credentials_path: section.credentials_path,
    })
}

fn locate_settings_file() -> Option<PathBuf> {
    settings_file_candidates()
        .into_iter()
        .find(|path| path.exists())
}

fn settings_file_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(base) = BaseDirs::new() {
        let config_dir = base.config_dir().join("abacus");
        paths.push(config_dir.join("abacus.yaml"));
        paths.push(config_dir.join("abacus.yml"));
        let home_dir = base.home_dir();
        paths.push(home_dir.join(".abacus").join("abacus.yaml"));
        paths.push(home_dir.join(".abacus").join("abacus.yml"));
    } else {
        paths.push(PathBuf::from("abacus.yaml"));
        paths.push(PathBuf::from("abacus.yml"));
    }
    paths
}

#[derive(Debug, Deserialize)]
struct AbacusConfig {
    client: Option<ClientSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientSection {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    credentials_path: Option<PathBuf>,
}
