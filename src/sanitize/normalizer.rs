use std::{
    io::Read as _,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::atomic::{AtomicU64, Ordering},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crate::order::scratch::ScratchFile;

/// Why an image could not be normalized. Always recoverable: the caller substitutes a
/// transparent placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// The source file does not exist.
    SourceMissing,
    /// The external tool could not be started or exited non-zero.
    ToolFailed(String),
    /// The external tool did not finish within its time limit and was killed.
    TimedOut(Duration),
    /// The (normalized) bytes could not be decoded.
    Undecodable(String),
    /// The batch was cancelled before the tool was launched.
    Cancelled,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceMissing => write!(f, "source image missing"),
            Self::ToolFailed(msg) => write!(f, "normalizer failed: {msg}"),
            Self::TimedOut(d) => write!(f, "normalizer timed out after {}s", d.as_secs()),
            Self::Undecodable(msg) => write!(f, "image undecodable: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one normalization attempt.
#[derive(Debug)]
pub enum NormalizeOutcome {
    /// 8-bit straight-alpha RGBA, upright, metadata-free.
    Normalized(image::RgbaImage),
    /// Degrade to a placeholder.
    Fallback(FallbackReason),
}

/// Converts arbitrary source images into canonical RGBA8.
///
/// Implementations never fail hard; every problem is reported as
/// [`NormalizeOutcome::Fallback`].
pub trait ImageNormalizer: Send + Sync {
    /// Normalize the image at `source`.
    fn normalize(&self, source: &Path) -> NormalizeOutcome;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Decodes with the `image` crate in-process and applies EXIF orientation.
///
/// Pixels are taken as sRGB; embedded ICC profiles are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct InProcessNormalizer;

impl ImageNormalizer for InProcessNormalizer {
    fn normalize(&self, source: &Path) -> NormalizeOutcome {
        if !source.is_file() {
            return NormalizeOutcome::Fallback(FallbackReason::SourceMissing);
        }
        match decode_upright(source) {
            Ok(img) => NormalizeOutcome::Normalized(img),
            Err(e) => NormalizeOutcome::Fallback(FallbackReason::Undecodable(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}

fn decode_upright(source: &Path) -> image::ImageResult<image::RgbaImage> {
    use image::ImageDecoder as _;

    let mut decoder = image::ImageReader::open(source)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder
        .orientation()
        .unwrap_or(image::metadata::Orientation::NoTransforms);
    let mut img = image::DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img.to_rgba8())
}

static NORMALIZE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Runs ImageMagick out of process:
/// `<program> <in> -auto-orient -colorspace sRGB -alpha on -strip -depth 8 PNG32:<out>`.
#[derive(Clone, Debug)]
pub struct MagickNormalizer {
    /// Executable, `magick` (IMv7) or `convert` (IMv6).
    pub program: PathBuf,
    /// Maximum wall time per call; the process is killed afterwards.
    pub timeout: Duration,
    /// Directory for the tool's output file.
    pub temp_dir: PathBuf,
}

impl Default for MagickNormalizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("magick"),
            timeout: Duration::from_secs(60),
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl MagickNormalizer {
    fn build_command(&self, source: &Path, out: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .arg(source)
            .args([
                "-auto-orient",
                "-colorspace",
                "sRGB",
                "-alpha",
                "on",
                "-strip",
                "-depth",
                "8",
            ])
            .arg(format!("PNG32:{}", out.display()));
        cmd
    }

    fn run(&self, source: &Path, out: &Path) -> Result<(), FallbackReason> {
        let mut child = self
            .build_command(source, out)
            .spawn()
            .map_err(|e| FallbackReason::ToolFailed(format!("spawn {}: {e}", self.program.display())))?;

        let mut stderr = child.stderr.take();
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            if let Some(s) = stderr.as_mut() {
                let _ = s.read_to_end(&mut bytes);
            }
            bytes
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    stop_child(&mut child, stderr_drain);
                    return Err(FallbackReason::TimedOut(self.timeout));
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(20)),
                Err(e) => {
                    stop_child(&mut child, stderr_drain);
                    return Err(FallbackReason::ToolFailed(format!("wait: {e}")));
                }
            }
        };
        let stderr_bytes = stderr_drain.join().unwrap_or_default();

        if !status.success() {
            return Err(FallbackReason::ToolFailed(format!(
                "exited with {status}: {}",
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        let produced = std::fs::metadata(out).map(|m| m.len()).unwrap_or(0);
        if produced == 0 {
            return Err(FallbackReason::ToolFailed("produced no output".to_string()));
        }
        Ok(())
    }
}

impl ImageNormalizer for MagickNormalizer {
    fn normalize(&self, source: &Path) -> NormalizeOutcome {
        if !source.is_file() {
            return NormalizeOutcome::Fallback(FallbackReason::SourceMissing);
        }
        let source = std::path::absolute(source).unwrap_or_else(|_| source.to_path_buf());
        let out = ScratchFile::new(self.temp_dir.join(format!(
            "tumblerprint_norm_{}_{}.png",
            std::process::id(),
            NORMALIZE_SEQ.fetch_add(1, Ordering::Relaxed)
        )));

        if let Err(reason) = self.run(&source, out.path()) {
            return NormalizeOutcome::Fallback(reason);
        }
        match image::open(out.path()) {
            Ok(img) => NormalizeOutcome::Normalized(img.to_rgba8()),
            Err(e) => NormalizeOutcome::Fallback(FallbackReason::Undecodable(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "magick"
    }
}

/// Kill and reap an abandoned tool process and join its stderr reader.
fn stop_child(child: &mut Child, stderr_drain: JoinHandle<Vec<u8>>) {
    let _ = child.kill();
    let _ = child.wait();
    let _ = stderr_drain.join();
}

#[cfg(test)]
#[path = "../../tests/unit/sanitize/normalizer.rs"]
mod tests;
