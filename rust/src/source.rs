//! Acquisition collaborators: payload fetch, key derivation, decryption.
//!
//! The core makes no assumption about transport or cipher. Each stage is a
//! possibly-failing call; the host installs implementations through
//! `FfiPopup::set_*`, and Rust callers may implement the traits directly.

use std::sync::{Arc, RwLock};

use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FetchError {
    #[error("network error: {reason}")]
    Network { reason: String },
    #[error("no route configured")]
    NotConfigured,
    #[error("fetch failed: {reason}")]
    Other { reason: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for FetchError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Other { reason: e.reason }
    }
}

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CryptoError {
    #[error("key derivation failed: {reason}")]
    KeyDerivation { reason: String },
    #[error("decryption failed: {reason}")]
    Decrypt { reason: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for CryptoError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Decrypt { reason: e.reason }
    }
}

#[uniffi::export(callback_interface)]
pub trait ConfigFetcher: Send + Sync + 'static {
    /// Returns the opaque encrypted configuration payload.
    fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

#[uniffi::export(callback_interface)]
pub trait KeyDeriver: Send + Sync + 'static {
    fn derive_key(&self) -> Result<Vec<u8>, CryptoError>;
}

#[uniffi::export(callback_interface)]
pub trait Decryptor: Send + Sync + 'static {
    /// Decrypts `payload` with `key` into UTF-8 JSON text.
    ///
    /// `key` is a copy the core no longer tracks; implementations must zeroize
    /// it (and anything derived from it) before returning.
    fn decrypt(&self, payload: Vec<u8>, key: Vec<u8>) -> Result<String, CryptoError>;
}

/// Derived key bytes. Overwritten with zeros when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy handed across the collaborator boundary; the receiver owns its scrubbing.
    pub(crate) fn to_vec(&self) -> Vec<u8> {
        self.0.clone()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial({} bytes)", self.0.len())
    }
}

pub(crate) type SharedSlot<T> = Arc<RwLock<Option<Arc<T>>>>;
pub(crate) type SharedFetcher = SharedSlot<dyn ConfigFetcher>;
pub(crate) type SharedKeyDeriver = SharedSlot<dyn KeyDeriver>;
pub(crate) type SharedDecryptor = SharedSlot<dyn Decryptor>;

pub(crate) fn empty_slot<T: ?Sized>() -> SharedSlot<T> {
    Arc::new(RwLock::new(None))
}

pub(crate) fn read_slot<T: ?Sized>(slot: &SharedSlot<T>) -> Option<Arc<T>> {
    match slot.read() {
        Ok(g) => g.clone(),
        Err(poison) => poison.into_inner().clone(),
    }
}

pub(crate) fn write_slot<T: ?Sized>(slot: &SharedSlot<T>, value: Arc<T>) {
    match slot.write() {
        Ok(mut g) => *g = Some(value),
        Err(poison) => *poison.into_inner() = Some(value),
    }
}
