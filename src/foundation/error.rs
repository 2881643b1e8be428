/// Result alias used across the crate.
pub type PrintResult<T> = Result<T, PrintError>;

/// Order-fatal error.
///
/// Soft conditions (a missing template image, a failed normalization, a barcode that cannot be
/// encoded) never surface as a `PrintError`; they are absorbed where they are detected.
#[derive(thiserror::Error, Debug)]
pub enum PrintError {
    /// Malformed or incomplete order record.
    #[error("validation error: {0}")]
    Validation(String),

    /// A required input file could not be located.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Parsing, rasterizing, compositing or encoding failed.
    #[error("render error: {0}")]
    Render(String),

    /// Work was skipped because the batch was cancelled.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Anything else, usually an I/O failure with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PrintError {
    /// Build a [`PrintError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PrintError::MissingInput`].
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    /// Build a [`PrintError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`PrintError::Cancelled`].
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Stable name of the variant, written to the failure log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::MissingInput(_) => "MissingInputError",
            Self::Render(_) => "RenderError",
            Self::Cancelled(_) => "Cancelled",
            Self::Other(_) => "IoError",
        }
    }

    /// Message including every context layer, on one line.
    pub fn detail(&self) -> String {
        match self {
            Self::Other(e) => format!("{e:#}"),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for PrintError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
