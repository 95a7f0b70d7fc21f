use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::app::ports::{PrintQueuePort, PrintRequest};
use crate::error::{InventoryError, Result};

/// Appends one JSON line per print request to a file.
pub struct NdjsonPrintQueue {
    path: PathBuf,
}

impl NdjsonPrintQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PrintQueuePort for NdjsonPrintQueue {
    fn enqueue(&self, request: &PrintRequest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(request)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Collects print requests in memory
#[derive(Default)]
pub struct InMemoryPrintQueue {
    requests: Mutex<Vec<PrintRequest>>,
}

impl InMemoryPrintQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<PrintRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl PrintQueuePort for InMemoryPrintQueue {
    fn enqueue(&self, request: &PrintRequest) -> Result<()> {
        self.requests
            .lock()
            .map_err(|_| InventoryError::Storage("print queue lock poisoned".to_string()))?
            .push(request.clone());
        Ok(())
    }
}
