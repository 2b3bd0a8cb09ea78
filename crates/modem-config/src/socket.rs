use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const UNIX_SCHEME: &str = "unix://";

/// Path-addressed control socket shared by the daemon and its clients.
///
/// The textual form is either a bare filesystem path or a `unix://` URL so
/// configuration written for older tooling keeps working.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct SocketEndpoint {
    path: Utf8PathBuf,
}

impl SocketEndpoint {
    /// Builds an endpoint for the given socket path.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Filesystem path of the socket.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Ensures the socket's parent directory exists.
    ///
    /// Newly created directories are restricted to the owner; an existing
    /// directory such as `/var/run` is left untouched.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(parent) = self.path.parent().filter(|parent| !parent.as_str().is_empty())
        else {
            return Err(SocketPreparationError::MissingParent {
                path: self.path.clone(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{UNIX_SCHEME}{}", self.path)
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let path = match trimmed.split_once("://") {
            Some(("unix", path)) => path,
            Some((scheme, _)) => {
                return Err(SocketParseError::UnsupportedScheme(scheme.to_owned()));
            }
            None => trimmed,
        };
        if path.is_empty() {
            return Err(SocketParseError::MissingPath(input.to_owned()));
        }
        Ok(Self::unix(path))
    }
}

impl TryFrom<String> for SocketEndpoint {
    type Error = SocketParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SocketEndpoint> for String {
    fn from(endpoint: SocketEndpoint) -> Self {
        endpoint.path.into_string()
    }
}

/// Errors encountered while parsing a [`SocketEndpoint`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SocketParseError {
    /// Only local Unix sockets are served.
    #[error("unsupported socket scheme '{0}'")]
    UnsupportedScheme(String),
    /// Socket path was absent.
    #[error("missing socket path in '{0}'")]
    MissingPath(String),
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// The socket path has no parent directory.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// Failed to create the socket directory.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
