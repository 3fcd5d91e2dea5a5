//! Environment-driven configuration

use crate::llm::LlmConfig;
use std::path::PathBuf;

const DEFAULT_REGION: &str = "US";
const DEFAULT_LANGUAGE: &str = "en-US";
const LOG_FILE: &str = "cinechat.log";

/// Everything the binary reads from its environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub tmdb_api_key: Option<String>,
    pub trakt_client_id: Option<String>,
    pub trakt_access_token: Option<String>,
    /// Catalog region for availability lookups
    pub region: String,
    pub language: String,
    /// Root for saved sessions and the log file
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = non_empty("CINECHAT_DATA_DIR").map_or_else(
            || {
                non_empty("HOME")
                    .map_or_else(|| PathBuf::from("."), PathBuf::from)
                    .join(".config")
                    .join("cinechat")
            },
            PathBuf::from,
        );

        Self {
            llm: LlmConfig::from_lookup(&lookup),
            tmdb_api_key: non_empty("TMDB_API_KEY"),
            trakt_client_id: non_empty("TRAKT_CLIENT_ID"),
            trakt_access_token: non_empty("TRAKT_ACCESS_TOKEN"),
            region: non_empty("CINECHAT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            language: non_empty("CINECHAT_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            data_dir,
        }
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    pub fn log_file_name(&self) -> &'static str {
        LOG_FILE
    }

    /// Both halves of the Trakt credential, or nothing
    pub fn trakt_credentials(&self) -> Option<(String, String)> {
        self.trakt_client_id
            .clone()
            .zip(self.trakt_access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("HOME", "/home/viewer")]);
        assert_eq!(config.region, "US");
        assert_eq!(config.language, "en-US");
        assert_eq!(config.data_dir, PathBuf::from("/home/viewer/.config/cinechat"));
        assert_eq!(
            config.sessions_dir(),
            PathBuf::from("/home/viewer/.config/cinechat/sessions")
        );
        assert!(config.tmdb_api_key.is_none());
        assert!(config.trakt_credentials().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CINECHAT_DATA_DIR", "/tmp/cc"),
            ("CINECHAT_REGION", "GB"),
            ("CINECHAT_LANGUAGE", "en-GB"),
            ("TMDB_API_KEY", "tmdb-key"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ]);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/cc"));
        assert_eq!(config.region, "GB");
        assert_eq!(config.language, "en-GB");
        assert_eq!(config.tmdb_api_key.as_deref(), Some("tmdb-key"));
        assert_eq!(config.llm.anthropic_api_key.as_deref(), Some("sk-ant"));
    }

    #[test]
    fn test_trakt_needs_both_halves() {
        let partial = config_from(&[("TRAKT_CLIENT_ID", "client")]);
        assert!(partial.trakt_credentials().is_none());

        let full = config_from(&[
            ("TRAKT_CLIENT_ID", "client"),
            ("TRAKT_ACCESS_TOKEN", "token"),
        ]);
        assert_eq!(
            full.trakt_credentials(),
            Some(("client".to_string(), "token".to_string()))
        );
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = config_from(&[("CINECHAT_REGION", "  "), ("TMDB_API_KEY", "")]);
        assert_eq!(config.region, "US");
        assert!(config.tmdb_api_key.is_none());
    }
}
