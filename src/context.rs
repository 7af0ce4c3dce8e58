//! Application contexts: theme and session state, passed explicitly to whatever needs them.
//!
//! Both are initialized once from their persisted state and change only through their setters.
//! A context opened without a path is ephemeral and never touches the disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::config::Config;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt session file '{path}': {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn read_optional(path: &Path) -> Result<Option<String>, ContextError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ContextError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write(path: &Path, contents: &str) -> Result<(), ContextError> {
    let io_err = |source| ContextError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

/// Reads a dark-background hint from a `COLORFGBG` value such as `15;0`.
///
/// The last field is the background color index. Indices 0 to 6 and 8 are dark.
pub fn system_prefers_dark(colorfgbg: Option<&str>) -> bool {
    colorfgbg
        .and_then(|v| v.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .is_some_and(|bg| bg <= 6 || bg == 8)
}

/// Dark-mode preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeContext {
    dark: bool,
    path: Option<PathBuf>,
}

impl ThemeContext {
    /// Stored `true` means dark; any other stored value means light. With nothing stored the
    /// system hint decides.
    pub fn load(path: PathBuf, system_dark: bool) -> Result<Self, ContextError> {
        let dark = match read_optional(&path)? {
            Some(saved) => saved.trim() == "true",
            None => system_dark,
        };
        debug!(dark, "theme loaded");
        Ok(Self {
            dark,
            path: Some(path),
        })
    }

    pub fn ephemeral(dark: bool) -> Self {
        Self { dark, path: None }
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn set_dark(&mut self, dark: bool) -> Result<(), ContextError> {
        self.dark = dark;
        if let Some(path) = &self.path {
            write(path, if dark { "true" } else { "false" })?;
        }
        Ok(())
    }

    /// Flips the preference and returns the new value.
    pub fn toggle(&mut self) -> Result<bool, ContextError> {
        self.set_dark(!self.dark)?;
        Ok(self.dark)
    }
}

/// The signed-in user, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user: Option<AuthUser>,
    path: Option<PathBuf>,
}

impl SessionContext {
    pub fn load(path: PathBuf) -> Result<Self, ContextError> {
        let user = match read_optional(&path)? {
            Some(json) => Some(serde_json::from_str(&json).map_err(|source| ContextError::Corrupt {
                path: path.clone(),
                source,
            })?),
            None => None,
        };
        Ok(Self {
            user,
            path: Some(path),
        })
    }

    pub fn ephemeral() -> Self {
        Self {
            user: None,
            path: None,
        }
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn sign_in(&mut self, user: AuthUser) -> Result<(), ContextError> {
        if let Some(path) = &self.path {
            write(path, &serde_json::to_string_pretty(&user)?)?;
        }
        info!(email = %user.email, "session started");
        self.user = Some(user);
        Ok(())
    }

    pub fn sign_out(&mut self) -> Result<(), ContextError> {
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(ContextError::Io {
                        path: path.clone(),
                        source,
                    })
                }
            }
        }
        if let Some(user) = self.user.take() {
            info!(email = %user.email, "session ended");
        }
        Ok(())
    }
}

/// Everything a view needs besides its service.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub theme: ThemeContext,
    pub session: SessionContext,
}

impl AppContext {
    /// Opens the persisted theme and session under the configured data directory.
    pub fn open(config: Config, system_dark: bool) -> Result<Self, ContextError> {
        let data_dir = config.store.data_dir();
        let theme = ThemeContext::load(data_dir.join("theme"), system_dark)?;
        let session = SessionContext::load(data_dir.join("session.json"))?;
        Ok(Self {
            config,
            theme,
            session,
        })
    }

    pub fn ephemeral(config: Config) -> Self {
        Self {
            config,
            theme: ThemeContext::ephemeral(false),
            session: SessionContext::ephemeral(),
        }
    }
}
