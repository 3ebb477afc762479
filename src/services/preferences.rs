//! User preferences.
//!
//! Only the theme survives a restart; it lives in a small JSON file that is
//! read once at startup and rewritten whenever the theme changes. The display
//! profile is kept in memory.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{SettingsResponse, Theme, UpdateSettingsRequest, UserProfile};

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to write preferences: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk shape of the preferences file.
#[derive(Debug, Serialize, Deserialize)]
struct StoredPreferences {
    theme: Theme,
}

#[derive(Debug)]
struct Inner {
    theme: Theme,
    profile: UserProfile,
}

#[derive(Clone)]
pub struct Preferences {
    path: Arc<PathBuf>,
    inner: Arc<Mutex<Inner>>,
    /// Held across the compare-write-commit sequence of a theme change.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Preferences {
    /// Load the stored theme, falling back to `system_default`, then light.
    pub async fn load(path: PathBuf, system_default: Option<Theme>) -> Self {
        let theme = match read_stored(&path).await {
            Some(stored) => stored.theme,
            None => system_default.unwrap_or_default(),
        };

        debug!(path = %path.display(), theme = theme.as_str(), "Preferences loaded");

        Self {
            path: Arc::new(path),
            inner: Arc::new(Mutex::new(Inner {
                theme,
                profile: UserProfile::default(),
            })),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn theme(&self) -> Theme {
        self.inner.lock().theme
    }

    pub fn snapshot(&self) -> SettingsResponse {
        let inner = self.inner.lock();
        SettingsResponse {
            theme: inner.theme,
            profile: inner.profile.clone(),
        }
    }

    /// Change the theme and persist it. Writing is skipped when unchanged.
    ///
    /// The in-memory theme only changes once the file is written, so a failed
    /// write leaves both sides on the old value.
    pub async fn set_theme(&self, theme: Theme) -> Result<(), PreferencesError> {
        let _write = self.write_lock.lock().await;
        if self.theme() == theme {
            return Ok(());
        }
        write_stored(&self.path, &StoredPreferences { theme }).await?;
        self.inner.lock().theme = theme;
        Ok(())
    }

    pub fn update_profile(&self, name: Option<String>, avatar: Option<Option<String>>) {
        let mut inner = self.inner.lock();
        if let Some(name) = name {
            inner.profile.name = name;
        }
        if let Some(avatar) = avatar {
            inner.profile.avatar = avatar;
        }
    }

    /// Apply a settings update and return the resulting settings.
    pub async fn apply(&self, req: UpdateSettingsRequest) -> Result<SettingsResponse, PreferencesError> {
        self.update_profile(req.name, req.avatar);
        if let Some(theme) = req.theme {
            self.set_theme(theme).await?;
        }
        Ok(self.snapshot())
    }
}

async fn read_stored(path: &Path) -> Option<StoredPreferences> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read preferences");
            return None;
        }
    };

    match serde_json::from_slice(&data) {
        Ok(stored) => Some(stored),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed preferences file");
            None
        }
    }
}

async fn write_stored(path: &Path, stored: &StoredPreferences) -> Result<(), PreferencesError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let data = serde_json::to_vec_pretty(stored)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await?;

    debug!(path = %path.display(), theme = stored.theme.as_str(), "Preferences saved");
    Ok(())
}
