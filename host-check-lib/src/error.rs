//! Error handling for list collection and setup operations.
//!
//! Per-domain probe failures are never errors: the prober folds them into a
//! [`ProbeResult`](crate::ProbeResult). This type covers the setup phase
//! (directories, list files, downloads, configuration), which is fatal.

use std::fmt;

/// Main error type for host-check operations.
#[derive(Debug, Clone)]
pub enum HostCheckError {
    /// The list directory could not be created or listed
    DirectoryError { path: String, message: String },

    /// A list file could not be read
    FileError { path: String, message: String },

    /// Network-related errors (client construction, connection, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// A remote list could not be downloaded
    DownloadError { url: String, message: String },

    /// Configuration errors (invalid settings, unparseable files)
    ConfigError { message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl HostCheckError {
    /// Create a new directory error.
    pub fn directory<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::DirectoryError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new download error.
    pub fn download<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::DownloadError {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for HostCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryError { path, message } => {
                write!(f, "Directory error at '{}': {}", path, message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::DownloadError { url, message } => {
                write!(f, "Download of '{}' failed: {}", url, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for HostCheckError {}

impl From<reqwest::Error> for HostCheckError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else if err.is_timeout() {
            Self::network_with_source("Request timed out", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<std::io::Error> for HostCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<toml::de::Error> for HostCheckError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}
