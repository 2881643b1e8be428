use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    foundation::error::{PrintError, PrintResult},
    sanitize::{
        fonts::DEFAULT_FALLBACK_FAMILIES,
        markup::SanitizeOptions,
        normalizer::{ImageNormalizer, InProcessNormalizer, MagickNormalizer},
    },
};

/// File name of the failure log when none is configured.
pub const DEFAULT_FAILURE_LOG_NAME: &str = "render_failures.csv";

/// Which [`ImageNormalizer`] the sanitizer uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizerKind {
    /// ImageMagick subprocess.
    #[default]
    Magick,
    /// `image` crate decoding inside the process.
    InProcess,
}

/// Runtime settings. Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrintConfig {
    /// Batch worker threads.
    pub workers: usize,
    /// Parent of per-order scratch directories.
    pub scratch_root: PathBuf,
    /// Failure log path; `<output>/render_failures.csv` when unset.
    pub failure_log: Option<PathBuf>,
    /// Appended to every output file name.
    pub file_suffix: String,
    /// Image normalizer implementation.
    pub normalizer: NormalizerKind,
    /// Executable for [`NormalizerKind::Magick`].
    pub normalizer_program: PathBuf,
    /// Seconds before a normalizer subprocess is killed.
    pub normalizer_timeout_secs: u64,
    /// Appended to every `font-family` list in designs.
    pub fallback_font_families: Vec<String>,
    /// Extra directories scanned for fonts in addition to the system fonts.
    pub font_dirs: Vec<PathBuf>,
    /// Timeout for fetching `http(s)` images; `None` disables remote fetching.
    pub remote_fetch_timeout_secs: Option<u64>,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            scratch_root: std::env::temp_dir().join("tumblerprint"),
            failure_log: None,
            file_suffix: String::new(),
            normalizer: NormalizerKind::default(),
            normalizer_program: PathBuf::from("magick"),
            normalizer_timeout_secs: 60,
            fallback_font_families: DEFAULT_FALLBACK_FAMILIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            font_dirs: Vec::new(),
            remote_fetch_timeout_secs: Some(20),
        }
    }
}

impl PrintConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> PrintResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json(&text)
    }

    /// Parse and validate JSON text.
    pub fn from_json(text: &str) -> PrintResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| PrintError::validation(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero workers and zero timeouts.
    pub fn validate(&self) -> PrintResult<()> {
        if self.workers == 0 {
            return Err(PrintError::validation("config 'workers' must be >= 1"));
        }
        if self.normalizer_timeout_secs == 0 {
            return Err(PrintError::validation(
                "config 'normalizer_timeout_secs' must be >= 1",
            ));
        }
        if self.remote_fetch_timeout_secs == Some(0) {
            return Err(PrintError::validation(
                "config 'remote_fetch_timeout_secs' must be >= 1 when set",
            ));
        }
        Ok(())
    }

    /// Configured failure log, or the default one inside `output_dir`.
    pub fn failure_log_path(&self, output_dir: &Path) -> PathBuf {
        self.failure_log
            .clone()
            .unwrap_or_else(|| output_dir.join(DEFAULT_FAILURE_LOG_NAME))
    }

    /// Normalizer selected by [`PrintConfig::normalizer`].
    pub fn build_normalizer(&self) -> Arc<dyn ImageNormalizer> {
        match self.normalizer {
            NormalizerKind::Magick => Arc::new(MagickNormalizer {
                program: self.normalizer_program.clone(),
                timeout: Duration::from_secs(self.normalizer_timeout_secs),
                temp_dir: self.scratch_root.clone(),
            }),
            NormalizerKind::InProcess => Arc::new(InProcessNormalizer),
        }
    }

    /// Sanitizer options carrying the configured fallback families.
    pub fn sanitize_options(&self) -> SanitizeOptions {
        SanitizeOptions {
            fallback_families: self.fallback_font_families.clone(),
            ..SanitizeOptions::default()
        }
    }

    /// Remote image fetch timeout, `None` when fetching is disabled.
    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote_fetch_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
