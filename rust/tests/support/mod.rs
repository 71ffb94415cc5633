#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use popup_core::{
    ConfigFetcher, ConfigStore, CryptoError, Decryptor, FetchError, FfiPopup, HostError,
    KeyDeriver, NativeDialog, PopupHost, PopupReconciler, PopupState, PopupUpdate,
    SqliteConfigStore, StyleTarget,
};
use tempfile::TempDir;
use zeroize::Zeroize;

pub const KEY: &[u8] = b"popup-test-key-0";

fn xor(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

/// Toy cipher so the decrypt stage genuinely depends on the derived key.
pub fn seal(plaintext: &str) -> Vec<u8> {
    xor(plaintext.as_bytes(), KEY)
}

#[derive(Clone, Default)]
pub struct FakeFetcher {
    responses: Arc<Mutex<VecDeque<Result<Vec<u8>, String>>>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeFetcher {
    pub fn push_sealed(&self, plaintext: &str) {
        self.responses.lock().unwrap().push_back(Ok(seal(plaintext)));
    }

    pub fn push_err(&self, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ConfigFetcher for FakeFetcher {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        *self.calls.lock().unwrap() += 1;
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(reason)) => Err(FetchError::Network { reason }),
            None => Err(FetchError::NotConfigured),
        }
    }
}

pub struct FixedKeyDeriver;

impl KeyDeriver for FixedKeyDeriver {
    fn derive_key(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(KEY.to_vec())
    }
}

#[derive(Clone, Default)]
pub struct XorDecryptor {
    failing: Arc<Mutex<bool>>,
}

impl XorDecryptor {
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl Decryptor for XorDecryptor {
    fn decrypt(&self, payload: Vec<u8>, mut key: Vec<u8>) -> Result<String, CryptoError> {
        if *self.failing.lock().unwrap() {
            key.zeroize();
            return Err(CryptoError::Decrypt {
                reason: "authentication tag mismatch".into(),
            });
        }
        let plain = xor(&payload, &key);
        key.zeroize();
        String::from_utf8(plain).map_err(|e| CryptoError::Decrypt {
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Shown(NativeDialog),
    Dismissed(u64),
    Color(u64, StyleTarget, u32),
    OpenedUrl(String),
    Copied(String),
    Toast(String),
}

#[derive(Clone, Default)]
pub struct RecordingHost {
    events: Arc<Mutex<Vec<HostEvent>>>,
    finishing: Arc<Mutex<bool>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn shown(&self) -> Vec<NativeDialog> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Shown(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn set_finishing(&self, finishing: bool) {
        *self.finishing.lock().unwrap() = finishing;
    }

    fn record(&self, event: HostEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PopupHost for RecordingHost {
    fn is_finishing(&self) -> bool {
        *self.finishing.lock().unwrap()
    }

    fn show_dialog(&self, dialog: NativeDialog) -> Result<(), HostError> {
        self.record(HostEvent::Shown(dialog));
        Ok(())
    }

    fn dismiss_dialog(&self, dialog_id: u64) -> Result<(), HostError> {
        self.record(HostEvent::Dismissed(dialog_id));
        Ok(())
    }

    fn apply_color(&self, dialog_id: u64, target: StyleTarget, argb: u32) -> Result<(), HostError> {
        self.record(HostEvent::Color(dialog_id, target, argb));
        Ok(())
    }

    fn open_url(&self, url: String) -> Result<(), HostError> {
        self.record(HostEvent::OpenedUrl(url));
        Ok(())
    }

    fn copy_to_clipboard(&self, text: String) -> Result<(), HostError> {
        self.record(HostEvent::Copied(text));
        Ok(())
    }

    fn show_toast(&self, message: String) {
        self.record(HostEvent::Toast(message));
    }
}

#[derive(Clone, Default)]
pub struct Collector {
    pub updates: Arc<Mutex<Vec<PopupUpdate>>>,
}

impl PopupReconciler for Collector {
    fn reconcile(&self, update: PopupUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

pub fn write_config(data_dir: &Path, extra: serde_json::Value) {
    let mut v = serde_json::json!({ "disable_network": true });
    if let (Some(base), Some(extra)) = (v.as_object_mut(), extra.as_object()) {
        for (k, val) in extra {
            base.insert(k.clone(), val.clone());
        }
    }
    std::fs::write(data_dir.join("popup_config.json"), serde_json::to_vec(&v).unwrap()).unwrap();
}

pub fn wait_until(what: &str, timeout: Duration, mut f: impl FnMut() -> bool) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("{what}: condition not met within {timeout:?}");
}

/// One `FfiPopup` on a fresh data dir, wired to fake collaborators.
pub struct Fixture {
    pub dir: TempDir,
    pub popup: Arc<FfiPopup>,
    pub fetcher: FakeFetcher,
    pub decryptor: XorDecryptor,
    pub host: RecordingHost,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(serde_json::json!({}), &[])
    }

    pub fn build(config: serde_json::Value, ignored: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), config);
        if !ignored.is_empty() {
            let store = SqliteConfigStore::open(&dir.path().to_string_lossy()).unwrap();
            for v in ignored {
                store.add_ignored_version(v).unwrap();
            }
        }
        let popup = FfiPopup::new(dir.path().to_string_lossy().to_string());
        let fixture = Self {
            dir,
            popup,
            fetcher: FakeFetcher::default(),
            decryptor: XorDecryptor::default(),
            host: RecordingHost::default(),
        };
        fixture.attach(&fixture.popup);
        fixture
    }

    /// Installs this fixture's collaborators on `popup`.
    pub fn attach(&self, popup: &FfiPopup) {
        popup.set_config_fetcher(Box::new(self.fetcher.clone()));
        popup.set_key_deriver(Box::new(FixedKeyDeriver));
        popup.set_decryptor(Box::new(self.decryptor.clone()));
    }

    pub fn present(&self) {
        self.popup.present(Some(Arc::new(self.host.clone())));
    }

    pub fn settle(&self) -> PopupState {
        assert!(
            self.popup.wait_idle(Duration::from_secs(10)),
            "popup queues did not drain"
        );
        self.popup.state()
    }
}
