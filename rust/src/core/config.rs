use std::path::Path;

use serde::Deserialize;

const CONFIG_FILE: &str = "popup_config.json";
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_VERSION_FIELD: &str = "version";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PayloadEncoding {
    #[default]
    Raw,
    Base64,
}

/// Runtime knobs read from `popup_config.json` in the data dir.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PopupConfig {
    pub(crate) disable_network: Option<bool>,
    pub(crate) config_urls: Option<Vec<String>>,
    pub(crate) fetch_timeout_ms: Option<u64>,
    pub(crate) payload_encoding: Option<PayloadEncoding>,
    pub(crate) version_field: Option<String>,
}

impl PopupConfig {
    pub(crate) fn network_enabled(&self) -> bool {
        self.disable_network != Some(true)
    }

    /// Configured routes, else `POPUP_CONFIG_URL` from the environment.
    pub(crate) fn routes(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .config_urls
            .iter()
            .flatten()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(ToString::to_string)
            .collect();
        if !configured.is_empty() {
            return configured;
        }
        match std::env::var("POPUP_CONFIG_URL") {
            Ok(url) if !url.trim().is_empty() => vec![url.trim().to_string()],
            _ => vec![],
        }
    }

    pub(crate) fn fetch_timeout_ms(&self) -> u64 {
        self.fetch_timeout_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_MS)
    }

    pub(crate) fn payload_encoding(&self) -> PayloadEncoding {
        self.payload_encoding.unwrap_or_default()
    }

    pub(crate) fn version_field(&self) -> &str {
        self.version_field
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_VERSION_FIELD)
    }
}

pub(crate) fn load_popup_config(data_dir: &str) -> PopupConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(_) => return PopupConfig::default(),
    };
    match serde_json::from_str::<PopupConfig>(&data) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(%e, path = %path.display(), "ignoring malformed popup config");
            PopupConfig::default()
        }
    }
}
