//! FTP-addressed backend.
//!
//! Every key is one file in a remote directory. The driver caches the last
//! directory listing and only asks the server again after a mutation.

use std::io;

use tracing::{debug, info};

use super::{Backend, FtpClient};
use crate::engine::FtpTarget;
use crate::error::{Result, StoreError};

// == Session Trait ==
/// Primitive remote operations the FTP driver needs from a session.
pub trait FtpSession: Send {
    /// Downloads a remote file.
    fn retrieve(&mut self, name: &str) -> io::Result<Vec<u8>>;

    /// Uploads (creates or replaces) a remote file.
    fn store(&mut self, name: &str, data: &[u8]) -> io::Result<()>;

    /// Deletes a remote file.
    fn remove(&mut self, name: &str) -> io::Result<()>;

    /// Raw `LIST -a` lines for the current directory.
    fn list(&mut self) -> io::Result<Vec<String>>;

    /// Changes the remote working directory.
    fn cwd(&mut self, path: &str) -> io::Result<()>;

    /// Creates a remote directory.
    fn mkdir(&mut self, path: &str) -> io::Result<()>;
}

// == FTP Backend ==
/// Driver used by the `ftp://` scheme.
pub struct FtpBackend<S> {
    session: S,
    /// Set by mutations; forces the next `keys()` to list again
    updated: bool,
    listing: Option<Vec<String>>,
}

impl FtpBackend<FtpClient> {
    /// Logs in to the server described by `target` and enters its path.
    ///
    /// # Errors
    /// Returns [`StoreError::BackendUnavailable`] if the server cannot be
    /// reached, rejects the login, or the remote path cannot be created.
    pub fn connect(target: &FtpTarget) -> Result<Self> {
        let client = FtpClient::connect(&target.address(), &target.user, &target.password)
            .map_err(|e| {
                StoreError::BackendUnavailable(format!("ftp {}: {}", target.address(), e))
            })?;
        info!(host = %target.host, path = %target.path, "Connected to FTP store");
        Self::with_session(client, &target.path)
    }
}

impl<S: FtpSession> FtpBackend<S> {
    /// Wraps an established session, entering (and creating if needed) `path`.
    pub fn with_session(mut session: S, path: &str) -> Result<Self> {
        if session.cwd(path).is_err() {
            make_remote_dirs(&mut session, path).map_err(|e| {
                StoreError::BackendUnavailable(format!("cannot create remote path {}: {}", path, e))
            })?;
        }

        Ok(Self {
            session,
            updated: true,
            listing: None,
        })
    }

    /// Borrows the underlying session.
    pub fn session(&self) -> &S {
        &self.session
    }
}

/// Walks `path` one component at a time, creating what is missing.
fn make_remote_dirs<S: FtpSession>(session: &mut S, path: &str) -> io::Result<()> {
    if path.starts_with('/') {
        session.cwd("/")?;
    }
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if session.cwd(part).is_err() {
            session.mkdir(part)?;
            session.cwd(part)?;
        }
    }
    Ok(())
}

/// Extracts regular file names from `LIST -a` output.
///
/// The name is the last whitespace-separated field; only entries whose
/// mode field starts with `-` count, and `.`/`..` are skipped.
pub fn parse_listing<I, L>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.as_ref().split_whitespace().collect();
            let (mode, name) = (fields.first()?, fields.last()?);
            (mode.starts_with('-') && *name != "." && *name != "..").then(|| name.to_string())
        })
        .collect()
}

/// Session failures on the write and listing paths.
fn session_error(err: io::Error) -> StoreError {
    match err.kind() {
        io::ErrorKind::NotConnected => StoreError::BackendUnavailable(err.to_string()),
        _ => StoreError::Io(err),
    }
}

/// Names must survive a `LIST -a` round-trip and stay one command argument.
fn valid_remote_name(key: &str) -> bool {
    !key.is_empty() && !key.contains(|c: char| c == '/' || c.is_whitespace() || c.is_control())
}

impl<S: FtpSession> Backend for FtpBackend<S> {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        if !valid_remote_name(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        self.session
            .retrieve(key)
            .map_err(|_| StoreError::NotFound(key.to_string()))
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        if !valid_remote_name(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        self.session.store(key, &value).map_err(session_error)?;
        self.updated = true;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if !valid_remote_name(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        self.session
            .remove(key)
            .map_err(|_| StoreError::NotFound(key.to_string()))?;
        self.updated = true;
        Ok(())
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        if self.updated || self.listing.is_none() {
            let lines = self.session.list().map_err(session_error)?;
            let names = parse_listing(&lines);
            debug!(count = names.len(), "Refreshed remote listing");
            self.listing = Some(names);
            self.updated = false;
        }
        Ok(self.listing.clone().unwrap_or_default())
    }
}
