//! Error types for susfs_fixup
//!
//! Textual mismatches are not errors: they are reported as fix outcomes (see
//! [`crate::models::FixOutcome`]). `PatchError` only covers the infrastructure
//! around the fixes, i.e. the kernel tree itself and file I/O.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Kernel patching operation errors.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Kernel root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to back up {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write report {}: {reason}", .path.display())]
    Report { path: PathBuf, reason: String },
}

impl PatchError {
    /// Get a user-facing error message suitable for the final status line
    pub fn user_message(&self) -> String {
        match self {
            PatchError::RootNotFound(path) => format!(
                "Kernel source tree '{}' does not exist or is not a directory",
                path.display()
            ),
            PatchError::Read { path, source } => {
                format!("Could not read '{}': {}", path.display(), source)
            }
            PatchError::Write { path, source } => {
                format!("Could not write '{}': {}", path.display(), source)
            }
            PatchError::Backup { path, .. } => {
                format!("Could not save a backup of '{}'", path.display())
            }
            PatchError::Report { path, reason } => {
                format!("Could not write report '{}': {}", path.display(), reason)
            }
        }
    }
}

/// Result type for patching operations
pub type PatchResult<T> = std::result::Result<T, PatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_not_found_display() {
        let err = PatchError::RootNotFound(PathBuf::from("/nonexistent/kernel"));
        assert_eq!(err.to_string(), "Kernel root not found: /nonexistent/kernel");
    }

    #[test]
    fn test_read_error_keeps_source() {
        let err = PatchError::Read {
            path: PathBuf::from("fs/namei.c"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "Failed to read fs/namei.c: denied");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_user_message_root() {
        let err = PatchError::RootNotFound(PathBuf::from("android-kernel"));
        assert!(err.user_message().contains("android-kernel"));
    }

    #[test]
    fn test_user_message_read_names_file_once() {
        let err = PatchError::Read {
            path: PathBuf::from("/kernel/fs/namei.c"),
            source: io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8"),
        };
        let message = err.user_message();
        assert_eq!(
            message,
            "Could not read '/kernel/fs/namei.c': stream did not contain valid UTF-8"
        );
    }

    #[test]
    fn test_result_type_err() {
        let result: PatchResult<i32> = Err(PatchError::Report {
            path: PathBuf::from("report.json"),
            reason: "disk full".to_string(),
        });
        assert!(result.is_err());
    }
}
