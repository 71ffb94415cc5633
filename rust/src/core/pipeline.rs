// Background half of a presentation: acquire, decide, fall back to the cache.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::store::{SharedStore, StoreError};
use crate::dialog::{parse, should_show, DialogSpec, IgnoredVersionSet, ParseError};
use crate::source::{ConfigFetcher, CryptoError, Decryptor, FetchError, KeyDeriver, KeyMaterial};
use crate::state::{ConfigSource, PresentOutcome};

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("no config fetcher installed")]
    NoFetcher,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("fetched payload is empty")]
    EmptyPayload,
    #[error("no key deriver installed")]
    NoKeyDeriver,
    #[error(transparent)]
    KeyDerivation(CryptoError),
    #[error("derived key is empty")]
    EmptyKey,
    #[error("no decryptor installed")]
    NoDecryptor,
    #[error(transparent)]
    Decrypt(CryptoError),
    #[error("decrypted config is empty")]
    EmptyPlaintext,
    #[error("parse: {0}")]
    Parse(#[from] ParseError),
    #[error("collaborator panicked")]
    Panicked,
}

impl AcquireError {
    pub fn stage(&self) -> &'static str {
        match self {
            AcquireError::NoFetcher | AcquireError::Fetch(_) | AcquireError::EmptyPayload => {
                "fetch"
            }
            AcquireError::NoKeyDeriver | AcquireError::KeyDerivation(_) | AcquireError::EmptyKey => {
                "derive_key"
            }
            AcquireError::NoDecryptor | AcquireError::Decrypt(_) | AcquireError::EmptyPlaintext => {
                "decrypt"
            }
            AcquireError::Parse(_) => "parse",
            AcquireError::Panicked => "collaborator",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("cache empty")]
    Empty,
    #[error("cache unreadable: {0}")]
    Store(StoreError),
    #[error("cached config unparsable: {0}")]
    Parse(ParseError),
}

/// What the foreground should do once the background run is over.
#[derive(Debug)]
pub(crate) enum PipelineDecision {
    Render {
        spec: DialogSpec,
        source: ConfigSource,
    },
    Done(PresentOutcome),
}

/// One presentation's worth of collaborators, captured when the run is queued.
pub(crate) struct Pipeline {
    pub(crate) fetcher: Option<Arc<dyn ConfigFetcher>>,
    pub(crate) key_deriver: Option<Arc<dyn KeyDeriver>>,
    pub(crate) decryptor: Option<Arc<dyn Decryptor>>,
    pub(crate) store: SharedStore,
    pub(crate) version_field: String,
}

impl Pipeline {
    pub(crate) fn run(&self) -> PipelineDecision {
        let acquired = catch_unwind(AssertUnwindSafe(|| self.acquire()))
            .unwrap_or(Err(AcquireError::Panicked));
        match acquired {
            Ok((spec, plaintext)) => {
                tracing::info!(stage = "acquire", source = "live", "config acquired");
                // The newest good config is kept even when it ends up suppressed.
                if let Err(e) = self.store.put_cached_config(&plaintext) {
                    tracing::warn!(%e, "failed to cache config");
                }
                self.decide(spec, ConfigSource::Live)
            }
            Err(e) => {
                tracing::warn!(stage = e.stage(), %e, "acquisition failed; trying cache");
                self.fallback()
            }
        }
    }

    /// Fetch → derive key → decrypt → parse. Returns the spec and the plaintext it came from.
    fn acquire(&self) -> Result<(DialogSpec, String), AcquireError> {
        let fetcher = self.fetcher.as_ref().ok_or(AcquireError::NoFetcher)?;
        let key_deriver = self.key_deriver.as_ref().ok_or(AcquireError::NoKeyDeriver)?;
        let decryptor = self.decryptor.as_ref().ok_or(AcquireError::NoDecryptor)?;

        let payload = fetcher.fetch()?;
        if payload.is_empty() {
            return Err(AcquireError::EmptyPayload);
        }
        tracing::debug!(stage = "fetch", bytes = payload.len(), "payload fetched");

        let key = KeyMaterial::new(
            key_deriver
                .derive_key()
                .map_err(AcquireError::KeyDerivation)?,
        );
        if key.is_empty() {
            return Err(AcquireError::EmptyKey);
        }

        let decrypted = decryptor.decrypt(payload, key.to_vec());
        drop(key);
        let plaintext = decrypted.map_err(AcquireError::Decrypt)?;
        if plaintext.trim().is_empty() {
            return Err(AcquireError::EmptyPlaintext);
        }

        let spec = parse(&plaintext, &self.version_field)?;
        Ok((spec, plaintext))
    }

    fn fallback(&self) -> PipelineDecision {
        match self.load_cached() {
            Ok(spec) => {
                tracing::info!(stage = "fallback", source = "cache", "using cached config");
                self.decide(spec, ConfigSource::Cache)
            }
            Err(e) => {
                tracing::warn!(stage = "fallback", %e, "no usable cached config");
                PipelineDecision::Done(PresentOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn load_cached(&self) -> Result<DialogSpec, FallbackError> {
        let cached = self
            .store
            .cached_config()
            .map_err(FallbackError::Store)?
            .ok_or(FallbackError::Empty)?;
        parse(&cached, &self.version_field).map_err(FallbackError::Parse)
    }

    fn decide(&self, spec: DialogSpec, source: ConfigSource) -> PipelineDecision {
        let ignored = self.store.ignored_versions().unwrap_or_else(|e| {
            tracing::warn!(%e, "ignored versions unreadable; treating as none");
            IgnoredVersionSet::new()
        });
        if should_show(&spec, &ignored) {
            return PipelineDecision::Render { spec, source };
        }
        let version = spec.version.unwrap_or_default();
        tracing::info!(stage = "decide", source = source.tag(), version = %version, "version ignored; suppressing");
        PipelineDecision::Done(PresentOutcome::Suppressed { version, source })
    }
}
