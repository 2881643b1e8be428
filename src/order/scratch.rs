use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context as _;

use crate::foundation::error::PrintResult;

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Per-order scratch directory, removed recursively on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh, uniquely named directory under `root` (created if needed).
    pub fn create(root: &Path, label: &str) -> PrintResult<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("create scratch root '{}'", root.display()))?;
        let label = sanitize_label(label);
        loop {
            let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
            let path = root.join(format!("{label}_{}_{seq}", std::process::id()));
            match std::fs::create_dir(&path) {
                Ok(()) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("create scratch dir '{}'", path.display()))
                        .into());
                }
            }
        }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for a new file inside the directory; the file is owned by the returned guard.
    pub fn file(&self, name: &str) -> ScratchFile {
        ScratchFile::new(self.path.join(name))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove scratch dir");
        }
    }
}

/// A temporary file removed on drop.
#[derive(Debug)]
pub struct ScratchFile(PathBuf);

impl ScratchFile {
    /// Take ownership of `path`; whatever is there when the guard drops is deleted.
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::debug!(path = %self.0.display(), error = %e, "failed to remove scratch file");
        }
    }
}

fn sanitize_label(label: &str) -> String {
    let s: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(48)
        .collect();
    if s.is_empty() { "order".to_string() } else { s }
}
