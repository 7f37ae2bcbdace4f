//! Error types shared across Montage crates.

use std::path::PathBuf;

/// Maximum number of characters of backend diagnostic kept in an error.
pub const DIAGNOSTIC_LIMIT: usize = 500;

/// Top-level error type for Montage operations.
#[derive(Debug, thiserror::Error)]
pub enum MontageError {
    /// The timeline (or output settings) failed validation. Raised before
    /// any backend command runs.
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Project has no clips to export")]
    EmptyProject,

    /// A clip references a source or asset id missing from the caller-supplied maps.
    #[error("Missing {kind} {id}")]
    UnresolvedReference { kind: ReferenceKind, id: String },

    /// An external media command failed.
    #[error("{operation} failed: {diagnostic}")]
    Backend {
        operation: String,
        diagnostic: String,
    },

    #[error("Media backend unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("Probe error for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// Temp-directory or disk failures.
    #[error("Resource error: {message}")]
    Resource { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// What kind of reference could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A video source (`sourceId` of a video clip).
    Source,
    /// A user asset (image or audio).
    Asset,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Source => f.write_str("source video"),
            ReferenceKind::Asset => f.write_str("asset"),
        }
    }
}

/// Result type alias using MontageError.
pub type MontageResult<T> = Result<T, MontageError>;

impl MontageError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Build a backend failure, truncating the diagnostic to [`DIAGNOSTIC_LIMIT`].
    pub fn backend(operation: impl Into<String>, diagnostic: impl AsRef<str>) -> Self {
        Self::Backend {
            operation: operation.into(),
            diagnostic: truncate_diagnostic(diagnostic.as_ref(), DIAGNOSTIC_LIMIT),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: msg.into(),
        }
    }

    pub fn probe(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource {
            message: msg.into(),
        }
    }

    pub fn missing_source(id: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind: ReferenceKind::Source,
            id: id.into(),
        }
    }

    pub fn missing_asset(id: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind: ReferenceKind::Asset,
            id: id.into(),
        }
    }

    /// Whether this error came from an external media command.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

/// Trim a backend diagnostic to `limit` characters, appending `...` when cut.
pub fn truncate_diagnostic(raw: &str, limit: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Video processing command failed".to_string();
    }
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_diagnostic_bounds_length() {
        let long = "x".repeat(2000);
        let cut = truncate_diagnostic(&long, DIAGNOSTIC_LIMIT);
        assert_eq!(cut.len(), DIAGNOSTIC_LIMIT + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_truncate_diagnostic_empty_falls_back() {
        assert_eq!(
            truncate_diagnostic("   \n", 10),
            "Video processing command failed"
        );
    }

    #[test]
    fn test_backend_error_message() {
        let err = MontageError::backend("concat", "boom\n");
        assert_eq!(err.to_string(), "concat failed: boom");
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_empty_project_message() {
        assert!(MontageError::EmptyProject.to_string().contains("no clips"));
    }
}
