use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::*;

pub fn init() {
    let filt = tracing_subscriber::EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filt)
        .init();
    info!("logging started");
}

/// Append-only error log, served back to operators over the authority-only
/// `log` endpoint.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Appends one structured line. Logging must never take the node down,
    /// so failures are only warned about.
    pub fn append(&self, method: &str, detail: &str) {
        let line = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "method": method,
            "error": detail,
        });

        let _guard = self.lock.lock().expect("error log lock poisoned");
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(err) = result {
            warn!(%err, path = %self.path.display(), "could not append to error log");
        }
    }

    pub fn read(&self) -> String {
        let _guard = self.lock.lock().expect("error log lock poisoned");
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }
}
