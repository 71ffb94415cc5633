mod actions;
mod core;
mod dialog;
mod fetch;
mod host;
mod logging;
mod scheduler;
mod source;
mod state;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use flume::Receiver;

use crate::core::pipeline::{Pipeline, PipelineDecision};
use crate::core::store::SharedStore;
use crate::core::PopupCore;
use crate::scheduler::{BackgroundQueue, ForegroundQueue};
use crate::source::{
    empty_slot, read_slot, write_slot, SharedDecryptor, SharedFetcher, SharedKeyDeriver,
};

pub use crate::actions::ActionKind;
pub use crate::core::pipeline::{AcquireError, FallbackError};
pub use crate::core::store::{ConfigStore, MemoryConfigStore, SqliteConfigStore, StoreError};
pub use crate::dialog::{
    parse, should_show, ButtonSpec, Color, DialogBehavior, DialogSpec, DialogStyle,
    IgnoredVersionSet, ParseError, DEFAULT_TITLE, MAX_BUTTONS,
};
pub use crate::host::*;
pub use crate::source::{ConfigFetcher, CryptoError, Decryptor, FetchError, KeyDeriver};
pub use crate::state::*;
pub use crate::updates::PopupUpdate;

uniffi::setup_scaffolding!();

#[uniffi::export(callback_interface)]
pub trait PopupReconciler: Send + Sync + 'static {
    fn reconcile(&self, update: PopupUpdate);
}

#[derive(uniffi::Object)]
pub struct FfiPopup {
    foreground: ForegroundQueue<updates::CoreMsg>,
    background: BackgroundQueue,
    update_rx: Receiver<PopupUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<PopupState>>,
    store: SharedStore,
    fetcher: SharedFetcher,
    key_deriver: SharedKeyDeriver,
    decryptor: SharedDecryptor,
    version_field: String,
}

#[uniffi::export]
impl FfiPopup {
    #[uniffi::constructor]
    pub fn new(data_dir: String) -> Arc<Self> {
        logging::init_logging(&data_dir);
        tracing::info!(data_dir = %data_dir, "FfiPopup::new() starting");

        let config = crate::core::config::load_popup_config(&data_dir);
        let store = crate::core::store::open_store(&data_dir);

        let fetcher: SharedFetcher = empty_slot();
        if let Some(http) = fetch::HttpConfigFetcher::from_config(&config) {
            let http: Arc<dyn ConfigFetcher> = Arc::new(http);
            write_slot(&fetcher, http);
        }

        let (update_tx, update_rx) = flume::unbounded();
        let shared_state = Arc::new(RwLock::new(PopupState::empty()));

        let shared_for_core = shared_state.clone();
        let store_for_core = store.clone();
        let foreground: ForegroundQueue<updates::CoreMsg> = ForegroundQueue::start(
            "popup-ui",
            move |queue: ForegroundQueue<updates::CoreMsg>| {
                PopupCore::new(update_tx, shared_for_core, store_for_core, queue)
            },
            |core: &mut PopupCore, msg: updates::CoreMsg| core.handle_message(msg),
        );
        let background = BackgroundQueue::start("popup-pipeline");

        Arc::new(Self {
            foreground,
            background,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
            store,
            fetcher,
            key_deriver: empty_slot(),
            decryptor: empty_slot(),
            version_field: config.version_field().to_string(),
        })
    }

    /// Fetch, decide and show. Never blocks the caller; the outcome lands in `state()`.
    pub fn present_popup(&self, host: Box<dyn PopupHost>) {
        self.present(Some(Arc::from(host)));
    }

    pub fn button_pressed(&self, dialog_id: u64, role: ButtonRole) {
        let _ = self
            .foreground
            .post(updates::CoreMsg::ButtonPressed { dialog_id, role });
    }

    pub fn dialog_cancelled(&self, dialog_id: u64) {
        let _ = self
            .foreground
            .post(updates::CoreMsg::DialogCancelled { dialog_id });
    }

    pub fn set_config_fetcher(&self, fetcher: Box<dyn ConfigFetcher>) {
        write_slot(&self.fetcher, Arc::from(fetcher));
    }

    pub fn set_key_deriver(&self, key_deriver: Box<dyn KeyDeriver>) {
        write_slot(&self.key_deriver, Arc::from(key_deriver));
    }

    pub fn set_decryptor(&self, decryptor: Box<dyn Decryptor>) {
        write_slot(&self.decryptor, Arc::from(decryptor));
    }

    pub fn state(&self) -> PopupState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn listen_for_updates(&self, reconciler: Box<dyn PopupReconciler>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                reconciler.reconcile(update);
            }
        });
    }
}

impl FfiPopup {
    /// Rust entry point behind `present_popup`; `None` models a host that is already gone.
    pub fn present(&self, host: Option<Arc<dyn PopupHost>>) {
        let host = match host {
            Some(h) if !h.is_finishing() => h,
            Some(_) => return self.skip("host finishing"),
            None => return self.skip("no host"),
        };

        let fetcher = self.fetcher.clone();
        let key_deriver = self.key_deriver.clone();
        let decryptor = self.decryptor.clone();
        let store = self.store.clone();
        let version_field = self.version_field.clone();
        let foreground = self.foreground.clone();
        let queued = self.background.submit(move || {
            // Collaborators are read when the run starts, not when it was queued.
            let pipeline = Pipeline {
                fetcher: read_slot(&fetcher),
                key_deriver: read_slot(&key_deriver),
                decryptor: read_slot(&decryptor),
                store,
                version_field,
            };
            let msg = match pipeline.run() {
                PipelineDecision::Render { spec, source } => updates::CoreMsg::Render {
                    host,
                    spec: Box::new(spec),
                    source,
                },
                PipelineDecision::Done(outcome) => updates::CoreMsg::Outcome(outcome),
            };
            let _ = foreground.post(msg);
        });
        if !queued {
            tracing::error!("pipeline worker gone; popup not presented");
        }
    }

    /// Blocks until everything submitted before this call has finished on both
    /// queues, or `timeout` passes. Returns whether the queues drained in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let (tx, rx) = flume::bounded(1);
        let foreground = self.foreground.clone();
        let queued = self.background.submit(move || {
            let _ = foreground.post(updates::CoreMsg::Barrier(tx));
        });
        queued && rx.recv_timeout(timeout).is_ok()
    }

    fn skip(&self, reason: &str) {
        tracing::info!(reason, "present_popup precondition failed");
        let outcome = PresentOutcome::Skipped {
            reason: reason.to_string(),
        };
        // Through the worker, so outcomes stay in call order.
        let foreground = self.foreground.clone();
        let _ = self.background.submit(move || {
            let _ = foreground.post(updates::CoreMsg::Outcome(outcome));
        });
    }
}
