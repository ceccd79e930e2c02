//! User preferences
//!
//! Two values survive restarts: the selected mosque slug and the display
//! theme. Both go through a [`KeyValueStore`] and follow the same rule: the
//! store is written first and memory only changes once that write succeeded.

use crate::error::{MosqueTimesError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Storage key of the selected mosque slug
pub const SELECTED_MOSQUE_KEY: &str = "selected_mosque_slug";

/// Storage key of the JSON encoded settings blob
pub const SETTINGS_KEY: &str = "app_settings";

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Asynchronous string key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;
    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()>;
    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Store backed by a single JSON object file
///
/// Writes go to a temporary file that is renamed over the existing one, so a
/// failed write leaves the previous contents in place.
pub struct FileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, values: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|e| MosqueTimesError::Storage(format!("Failed to write preferences: {e}")))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| MosqueTimesError::Storage(format!("Failed to replace preferences: {e}")))
    }

    async fn update(&self, key: &str, value: Option<&str>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut values = match self.read_all().await {
            Ok(values) => values,
            Err(MosqueTimesError::Json(e)) => {
                warn!(
                    "Replacing unreadable preferences file {}: {e}",
                    self.path.display()
                );
                self.back_up_unreadable().await;
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        match value {
            Some(value) => values.insert(key.to_string(), value.to_string()),
            None => values.remove(key),
        };
        self.write_all(&values).await
    }

    // Keeps the unreadable contents next to the file before they are replaced
    async fn back_up_unreadable(&self) {
        let backup = self.path.with_extension("json.bak");
        match tokio::fs::copy(&self.path, &backup).await {
            Ok(_) => info!("Unreadable preferences kept in {}", backup.display()),
            Err(e) => warn!("Failed to back up unreadable preferences: {e}"),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.read_all().await?.remove(key)) })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.update(key, Some(value)))
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.update(key, None))
    }
}

/// Store that keeps values for the lifetime of the process
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn with_values<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> Result<R> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| MosqueTimesError::Storage("Memory store lock poisoned".to_string()))?;
        Ok(f(&mut values))
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move { self.with_values(|values| values.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.with_values(|values| {
                values.insert(key.to_string(), value.to_string());
            })
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.with_values(|values| {
                values.remove(key);
            })
        })
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = MosqueTimesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(MosqueTimesError::from(format!("Invalid theme: {s}"))),
        }
    }
}

/// Persisted settings blob
#[derive(Debug, Default, Deserialize, Serialize)]
struct StoredSettings {
    #[serde(default)]
    theme: Theme,
}

/// In-memory view of the preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceSnapshot {
    pub selected_mosque: Option<String>,
    pub theme: Theme,
    /// `false` until [`Preferences::load_initial_data`] has run
    pub is_ready: bool,
}

impl Default for PreferenceSnapshot {
    fn default() -> Self {
        Self {
            selected_mosque: None,
            theme: Theme::Dark,
            is_ready: false,
        }
    }
}

/// Selected mosque and theme, owned by the application state
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<PreferenceSnapshot>,
}

impl Preferences {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            state: RwLock::new(PreferenceSnapshot::default()),
        }
    }

    /// Reads both persisted values and marks the preferences ready.
    ///
    /// Unreadable values fall back to the defaults (no mosque, dark theme);
    /// nothing is written back to the store.
    pub async fn load_initial_data(&self) {
        let selected_mosque = match self.store.get(SELECTED_MOSQUE_KEY).await {
            Ok(slug) => slug.filter(|slug| !slug.trim().is_empty()),
            Err(e) => {
                error!("Error loading selected mosque: {e}");
                None
            }
        };

        let theme = match self.store.get(SETTINGS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<StoredSettings>(&raw) {
                Ok(settings) => settings.theme,
                Err(e) => {
                    warn!("Ignoring unreadable settings: {e}");
                    Theme::default()
                }
            },
            Ok(None) => Theme::default(),
            Err(e) => {
                error!("Error loading settings: {e}");
                Theme::default()
            }
        };

        match self.state.write() {
            Ok(mut state) => {
                *state = PreferenceSnapshot {
                    selected_mosque,
                    theme,
                    is_ready: true,
                };
                info!(
                    "Preferences loaded: mosque={:?}, theme={}",
                    state.selected_mosque, state.theme
                );
            }
            Err(_) => error!("Failed to acquire preferences write lock"),
        }
    }

    /// Persists `slug` as the selected mosque, then updates memory
    ///
    /// # Errors
    ///
    /// Returns an error for an empty slug or when the store write fails; the
    /// in-memory selection is unchanged in both cases
    pub async fn set_selected_mosque(&self, slug: &str) -> Result<()> {
        if slug.trim().is_empty() {
            return Err(MosqueTimesError::from("Mosque slug cannot be empty"));
        }

        self.store.set(SELECTED_MOSQUE_KEY, slug).await.map_err(|e| {
            error!("Error saving selected mosque: {e}");
            e
        })?;

        self.commit(|state| state.selected_mosque = Some(slug.to_string()))?;
        info!("Selected mosque changed to {slug}");
        Ok(())
    }

    /// Removes the persisted selection, then clears it in memory
    ///
    /// # Errors
    ///
    /// Returns an error when the store write fails
    pub async fn clear_selected_mosque(&self) -> Result<()> {
        self.store.remove(SELECTED_MOSQUE_KEY).await.map_err(|e| {
            error!("Error clearing selected mosque: {e}");
            e
        })?;

        self.commit(|state| state.selected_mosque = None)?;
        info!("Selected mosque cleared");
        Ok(())
    }

    /// Persists `theme`, then updates memory
    ///
    /// # Errors
    ///
    /// Returns an error when the store write fails
    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        let settings = serde_json::to_string(&StoredSettings { theme })?;
        self.store.set(SETTINGS_KEY, &settings).await.map_err(|e| {
            error!("Error saving theme: {e}");
            e
        })?;

        self.commit(|state| state.theme = theme)?;
        debug!("Theme changed to {theme}");
        Ok(())
    }

    /// Switches between light and dark
    ///
    /// # Errors
    ///
    /// Returns an error when the store write fails
    pub async fn toggle_theme(&self) -> Result<Theme> {
        let theme = self.theme().toggled();
        self.set_theme(theme).await?;
        Ok(theme)
    }

    #[must_use]
    pub fn snapshot(&self) -> PreferenceSnapshot {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn selected_mosque(&self) -> Option<String> {
        self.snapshot().selected_mosque
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.snapshot().theme
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.snapshot().is_ready
    }

    fn commit(&self, update: impl FnOnce(&mut PreferenceSnapshot)) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| MosqueTimesError::from("Failed to acquire preferences write lock"))?;
        update(&mut state);
        Ok(())
    }
}
