use std::{
    fs::{File, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context as _;

use crate::foundation::error::{PrintError, PrintResult};

/// Column names, in write order.
pub const FAILURE_LOG_COLUMNS: [&str; 8] = [
    "timestamp",
    "stage",
    "order_context",
    "leaf_folder",
    "ready_folder",
    "customer",
    "exception_type",
    "message",
];

/// One failed order as recorded in the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureRecord {
    /// Step that failed: `prepare`, `render` or `panic`.
    pub stage: String,
    /// Order record path, followed by its scratch directory when one was created.
    pub order_context: String,
    /// Folder holding the order's inputs.
    pub leaf_folder: String,
    /// Destination folder for rendered files.
    pub ready_folder: String,
    /// Customer name hint.
    pub customer: String,
    /// Stable error kind.
    pub exception_type: String,
    /// Human-readable error chain.
    pub message: String,
}

/// Append-only CSV of failed orders, shared by all workers.
pub struct FailureLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FailureLog {
    /// Open (or create) the log at `path`, writing the header if the file is new or empty.
    pub fn open(path: impl Into<PathBuf>) -> PrintResult<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create failure log directory '{}'", dir.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open failure log '{}'", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("stat failure log '{}'", path.display()))?
            .len();
        if len == 0 {
            writeln!(file, "{}", FAILURE_LOG_COLUMNS.join(","))
                .with_context(|| format!("write failure log header '{}'", path.display()))?;
        }
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// File being appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row stamped with the current local time.
    pub fn append(&self, record: &FailureRecord) -> PrintResult<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let fields: [&str; 8] = [
            timestamp.as_str(),
            &record.stage,
            &record.order_context,
            &record.leaf_folder,
            &record.ready_folder,
            &record.customer,
            &record.exception_type,
            &record.message,
        ];
        let line = fields.map(escape_field).join(",");

        let mut file = self
            .file
            .lock()
            .map_err(|_| PrintError::render("failure log lock poisoned"))?;
        writeln!(file, "{line}")
            .and_then(|()| file.flush())
            .with_context(|| format!("append to failure log '{}'", self.path.display()))?;
        Ok(())
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/failure_log.rs"]
mod tests;
