use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "popup_core=debug,info";

static INIT: Once = Once::new();

/// Installs the process-wide subscriber once. Later calls are no-ops.
pub fn init_logging(data_dir: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);

        #[cfg(target_os = "android")]
        let installed = registry
            .with(paranoid_android::layer("popup_core"))
            .try_init();

        #[cfg(target_os = "ios")]
        let installed = registry
            .with(tracing_oslog::OsLogger::new("popup_core", "default"))
            .try_init();

        #[cfg(not(any(target_os = "android", target_os = "ios")))]
        let installed = registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();

        // The embedding app or a test binary may own the global subscriber already.
        if let Err(e) = installed {
            eprintln!("popup_core: logging not installed: {e}");
            return;
        }
        tracing::debug!(data_dir, "logging initialized");
    });
}
