//! Persisted session credentials.
//!
//! The session only reaches the stored base URL, token and user id through
//! the [`CredentialStore`] accessor; where they live is up to the caller.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Credential {
    BaseUrl,
    Token,
    UserId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub base_url: String,
    pub token: String,
    pub user_id: String,
}

impl Credentials {
    pub fn get(&self, field: Credential) -> &str {
        match field {
            Credential::BaseUrl => &self.base_url,
            Credential::Token => &self.token,
            Credential::UserId => &self.user_id,
        }
    }

    fn set(&mut self, field: Credential, value: &str) {
        let slot = match field {
            Credential::BaseUrl => &mut self.base_url,
            Credential::Token => &mut self.token,
            Credential::UserId => &mut self.user_id,
        };
        *slot = value.to_string();
    }
}

/// Key-value access to the persisted credentials.
///
/// Unset values read as empty strings.
pub trait CredentialStore: Send + Sync + 'static {
    fn get(&self, field: Credential) -> String;

    /// Replaces all three values at once. On error nothing is changed.
    fn set_all(&self, credentials: &Credentials) -> Result<(), SessionError>;

    fn set(&self, field: Credential, value: &str) -> Result<(), SessionError> {
        let mut credentials = Credentials {
            base_url: self.get(Credential::BaseUrl),
            token: self.get(Credential::Token),
            user_id: self.get(Credential::UserId),
        };
        credentials.set(field, value);
        self.set_all(&credentials)
    }
}

/// Credentials kept for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    inner: RwLock<Credentials>,
}

impl MemoryCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(credentials),
        }
    }

    pub fn snapshot(&self) -> Credentials {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryCredentials {
    fn get(&self, field: Credential) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(field)
            .to_string()
    }

    fn set_all(&self, credentials: &Credentials) -> Result<(), SessionError> {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = credentials.clone();
        Ok(())
    }

    fn set(&self, field: Credential, value: &str) -> Result<(), SessionError> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(field, value);
        Ok(())
    }
}

/// Credentials stored as a JSON file.
///
/// Every change rewrites the whole file through a temporary sibling that is
/// renamed over it, so readers see either the old or the new credentials.
#[derive(Debug)]
pub struct FileCredentials {
    path: PathBuf,
    inner: RwLock<Credentials>,
}

impl FileCredentials {
    /// Loads the file, starting empty when it does not exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let credentials = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|err| SessionError::Credentials(format!("{}: {err}", path.display())))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Credentials::default(),
            Err(err) => {
                return Err(SessionError::Credentials(format!(
                    "{}: {err}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            inner: RwLock::new(credentials),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy, persists it, then swaps it in.
    fn update(&self, change: impl FnOnce(&mut Credentials)) -> Result<(), SessionError> {
        let mut current = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = current.clone();
        change(&mut next);
        if next == *current {
            return Ok(());
        }
        self.persist(&next)
            .map_err(|err| SessionError::Credentials(format!("{}: {err}", self.path.display())))?;
        tracing::debug!("credentials written to {}", self.path.display());
        *current = next;
        Ok(())
    }

    fn persist(&self, credentials: &Credentials) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut staged = self.path.clone().into_os_string();
        staged.push(".partial");
        let staged = PathBuf::from(staged);

        let mut file = fs::File::create(&staged)?;
        serde_json::to_writer_pretty(&mut file, credentials)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staged, &self.path).inspect_err(|_| {
            let _ = fs::remove_file(&staged);
        })
    }
}

impl CredentialStore for FileCredentials {
    fn get(&self, field: Credential) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(field)
            .to_string()
    }

    fn set_all(&self, credentials: &Credentials) -> Result<(), SessionError> {
        self.update(|next| *next = credentials.clone())
    }

    fn set(&self, field: Credential, value: &str) -> Result<(), SessionError> {
        self.update(|next| next.set(field, value))
    }
}
