use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum C2gError {
    #[error(
        "Configuration file {} not found. You can create a new one by running the command `c2g init`.",
        .0.display()
    )]
    ConfigNotFound(PathBuf),

    #[error("The configuration file is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("The configuration file must contain a single JSON object.")]
    ConfigNotObject,

    #[error("The value of {field} in the configuration file must be {expected}.")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error(
        "The value of sourceDir in the configuration file must be a valid path: {}",
        .0.display()
    )]
    InvalidPath(PathBuf),

    #[error("{} not found.", .0.display())]
    CredentialsNotFound(PathBuf),

    #[error("Invalid credentials in {}: {source}", .path.display())]
    InvalidCredentials {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Authorization failed: {0}")]
    Auth(#[source] BoxError),

    #[error("You are not logged in. Please run `c2g login`.")]
    NotAuthorized,

    #[error("No CSV files found.")]
    NoCsvFilesFound,

    #[error("Failed to read {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{count} Google Sheets files named {name:?} exist in the target folder; cannot decide which one to update.")]
    AmbiguousMatch { name: String, count: usize },

    #[error("Failed to create CSV folder for some reason. Please try again.")]
    FolderCreationFailed,

    #[error("Google Drive request failed while trying to {action}: {source}")]
    Remote {
        action: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove {}: {source}", .path.display())]
    RemoveToken {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read answer: {0}")]
    Prompt(#[source] io::Error),
}

impl C2gError {
    pub fn remote(action: &'static str, source: impl Into<BoxError>) -> Self {
        C2gError::Remote {
            action,
            source: source.into(),
        }
    }

    /// Process exit status for this failure. Problems with the configuration
    /// file exit with 2, everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            C2gError::ConfigNotFound(_)
            | C2gError::InvalidJson(_)
            | C2gError::ConfigNotObject
            | C2gError::TypeMismatch { .. }
            | C2gError::InvalidPath(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let err = C2gError::TypeMismatch {
            field: "sourceDir",
            expected: "a string",
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "The value of sourceDir in the configuration file must be a string."
        );
        assert_eq!(C2gError::ConfigNotFound(PathBuf::from("c2g.config.json")).exit_code(), 2);
    }

    #[test]
    fn runtime_errors_exit_with_one() {
        assert_eq!(C2gError::NotAuthorized.exit_code(), 1);
        assert_eq!(C2gError::FolderCreationFailed.exit_code(), 1);
        let remote = C2gError::remote("list files", io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(remote.exit_code(), 1);
        assert!(remote.to_string().contains("list files"));
    }
}
