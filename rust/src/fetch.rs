//! Default HTTP fetcher: races every configured route and keeps the first
//! non-empty answer.

use std::time::{Duration, Instant};

use base64::Engine;

use crate::core::config::{PayloadEncoding, PopupConfig};
use crate::source::{ConfigFetcher, FetchError};

pub(crate) struct HttpConfigFetcher {
    routes: Vec<String>,
    encoding: PayloadEncoding,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpConfigFetcher {
    /// `None` when networking is disabled or there is nowhere to fetch from.
    pub(crate) fn from_config(config: &PopupConfig) -> Option<Self> {
        if !config.network_enabled() {
            tracing::info!("network disabled; no default config fetcher");
            return None;
        }
        let routes = config.routes();
        if routes.is_empty() {
            tracing::info!("no config routes; no default config fetcher");
            return None;
        }
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms()))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(%e, "failed to build http client");
                return None;
            }
        };
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::warn!(%e, "failed to build fetch runtime");
                return None;
            }
        };
        Some(Self {
            routes,
            encoding: config.payload_encoding(),
            client,
            runtime,
        })
    }
}

impl ConfigFetcher for HttpConfigFetcher {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        if self.routes.is_empty() {
            return Err(FetchError::NotConfigured);
        }
        let attempts = self
            .routes
            .iter()
            .map(|route| Box::pin(fetch_route(self.client.clone(), route.clone())));
        let (body, _slower) = self.runtime.block_on(futures::future::select_ok(attempts))?;
        decode_payload(body, self.encoding)
    }
}

async fn fetch_route(client: reqwest::Client, route: String) -> Result<Vec<u8>, FetchError> {
    let started = Instant::now();
    let network = |e: reqwest::Error| FetchError::Network {
        reason: e.to_string(),
    };
    let body = client
        .get(&route)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(network)?
        .bytes()
        .await
        .map_err(network)?;
    if body.is_empty() {
        tracing::debug!(route = %route, "config route returned empty body");
        return Err(FetchError::Other {
            reason: "empty body".into(),
        });
    }
    tracing::debug!(
        route = %route,
        elapsed_ms = started.elapsed().as_millis() as u64,
        bytes = body.len(),
        "config route answered"
    );
    Ok(body.to_vec())
}

pub(crate) fn decode_payload(
    body: Vec<u8>,
    encoding: PayloadEncoding,
) -> Result<Vec<u8>, FetchError> {
    match encoding {
        PayloadEncoding::Raw => Ok(body),
        PayloadEncoding::Base64 => {
            let text = String::from_utf8_lossy(&body);
            base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| FetchError::Other {
                    reason: format!("payload is not base64: {e}"),
                })
        }
    }
}
