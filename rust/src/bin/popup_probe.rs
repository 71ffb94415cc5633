use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use popup_core::{
    ButtonRole, ConfigFetcher, ConfigStore, CryptoError, Decryptor, FetchError, FfiPopup,
    HostError, KeyDeriver, NativeDialog, PopupHost, SqliteConfigStore, StyleTarget,
};

const USAGE: &str =
    "usage: popup_probe <config.json> [--press positive|negative|neutral] [--ignore VERSION] [--data-dir DIR]";

/// Serves the plaintext file as the "encrypted" payload.
struct FileFetcher(PathBuf);

impl ConfigFetcher for FileFetcher {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        std::fs::read(&self.0).map_err(|e| FetchError::Other {
            reason: e.to_string(),
        })
    }
}

struct ProbeKey;

impl KeyDeriver for ProbeKey {
    fn derive_key(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(b"popup-probe".to_vec())
    }
}

struct PlaintextDecryptor;

impl Decryptor for PlaintextDecryptor {
    fn decrypt(&self, payload: Vec<u8>, _key: Vec<u8>) -> Result<String, CryptoError> {
        String::from_utf8(payload).map_err(|e| CryptoError::Decrypt {
            reason: e.to_string(),
        })
    }
}

struct ConsoleHost;

impl PopupHost for ConsoleHost {
    fn is_finishing(&self) -> bool {
        false
    }

    fn show_dialog(&self, dialog: NativeDialog) -> Result<(), HostError> {
        println!("── dialog #{} ──", dialog.dialog_id);
        println!("title:   {}", dialog.title.plain);
        println!("message: {}", dialog.message.plain.replace('\n', "\n         "));
        for b in &dialog.buttons {
            println!("button:  [{}] {}", b.role.tag(), b.label);
        }
        println!(
            "cancelable={} dim={:?}",
            dialog.cancelable, dialog.dim_amount
        );
        Ok(())
    }

    fn dismiss_dialog(&self, dialog_id: u64) -> Result<(), HostError> {
        println!("dismissed #{dialog_id}");
        Ok(())
    }

    fn apply_color(&self, dialog_id: u64, target: StyleTarget, argb: u32) -> Result<(), HostError> {
        println!("color #{dialog_id} {target:?} = #{argb:08X}");
        Ok(())
    }

    fn open_url(&self, url: String) -> Result<(), HostError> {
        println!("open url: {url}");
        Ok(())
    }

    fn copy_to_clipboard(&self, text: String) -> Result<(), HostError> {
        println!("clipboard: {text}");
        Ok(())
    }

    fn show_toast(&self, message: String) {
        println!("toast: {message}");
    }
}

fn parse_role(s: &str) -> anyhow::Result<ButtonRole> {
    ButtonRole::ALL
        .into_iter()
        .find(|r| r.tag() == s)
        .ok_or_else(|| anyhow::anyhow!("unknown button role: {s}"))
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!(USAGE))?;

    let mut press: Option<ButtonRole> = None;
    let mut ignore: Vec<String> = vec![];
    let mut data_dir = std::env::temp_dir().join("popup_probe");
    while let Some(a) = args.next() {
        if a == "--press" {
            let role = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--press requires a role"))?;
            press = Some(parse_role(&role)?);
            continue;
        }
        if a == "--ignore" {
            let v = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--ignore requires a version"))?;
            ignore.push(v);
            continue;
        }
        if a == "--data-dir" {
            let d = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--data-dir requires a path"))?;
            data_dir = PathBuf::from(d);
            continue;
        }
        return Err(anyhow::anyhow!("unknown arg: {a}\n{USAGE}"));
    }

    std::fs::create_dir_all(&data_dir)?;
    let data_dir = data_dir.to_string_lossy().to_string();
    if !ignore.is_empty() {
        let store = SqliteConfigStore::open(&data_dir)?;
        for v in &ignore {
            store.add_ignored_version(v)?;
        }
    }

    let popup = FfiPopup::new(data_dir);
    popup.set_config_fetcher(Box::new(FileFetcher(config_path)));
    popup.set_key_deriver(Box::new(ProbeKey));
    popup.set_decryptor(Box::new(PlaintextDecryptor));

    let timeout = Duration::from_secs(15);
    popup.present(Some(Arc::new(ConsoleHost)));
    if !popup.wait_idle(timeout) {
        anyhow::bail!("timed out waiting for the popup pipeline");
    }
    let state = popup.state();
    println!("outcome: {:?}", state.last_outcome);

    if let Some(role) = press {
        let live = state
            .live_dialog
            .ok_or_else(|| anyhow::anyhow!("no dialog on screen to press"))?;
        popup.button_pressed(live.dialog_id, role);
        if !popup.wait_idle(timeout) {
            anyhow::bail!("timed out waiting for the button action");
        }
        println!("live after press: {:?}", popup.state().live_dialog);
    }
    Ok(())
}
