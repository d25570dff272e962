//! Light/dark theme preference. An explicit choice is persisted and wins over
//! the system signal; without one the console follows the system.

use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, warn};

pub const THEME_STORAGE_KEY: &str = "ui-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn from_system(prefers_dark: bool) -> Self {
        if prefers_dark {
            Self::Dark
        } else {
            Self::Light
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Key/value storage for user preferences. Reads and writes never fail from
/// the caller's point of view; an unavailable store behaves as empty.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }
}

/// Preferences kept in a flat TOML table on disk.
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return BTreeMap::new(),
        };
        toml::from_str(&raw).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "ignoring unreadable preferences");
            BTreeMap::new()
        })
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.read_all();
        values.insert(key.to_string(), value.to_string());
        let written = toml::to_string(&values)
            .map_err(|err| err.to_string())
            .and_then(|raw| fs::write(&self.path, raw).map_err(|err| err.to_string()));
        if let Err(err) = written {
            warn!(path = %self.path.display(), error = %err, "failed to persist preference");
        }
    }
}

/// Stored "dark"/"light" wins; anything else defers to the system.
pub fn resolve_initial_theme(store: &dyn PreferenceStore, system_prefers_dark: bool) -> Theme {
    store
        .get(THEME_STORAGE_KEY)
        .as_deref()
        .and_then(Theme::parse)
        .unwrap_or_else(|| Theme::from_system(system_prefers_dark))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeToggleView {
    pub pressed: bool,
    pub title: &'static str,
    pub icon: &'static str,
}

pub fn render_toggle(theme: Theme) -> ThemeToggleView {
    match theme {
        Theme::Dark => ThemeToggleView {
            pressed: true,
            title: "Switch to light mode",
            icon: "🌙",
        },
        Theme::Light => ThemeToggleView {
            pressed: false,
            title: "Switch to dark mode",
            icon: "☀️",
        },
    }
}

pub struct ThemeController<S> {
    store: S,
    current: Mutex<Theme>,
}

impl<S: PreferenceStore> ThemeController<S> {
    pub fn init(store: S, system_prefers_dark: bool) -> Self {
        let theme = resolve_initial_theme(&store, system_prefers_dark);
        debug!(theme = theme.as_str(), "theme initialised");
        Self {
            store,
            current: Mutex::new(theme),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Theme> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Theme {
        *self.lock()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Flips the theme and records it as the explicit preference.
    pub fn toggle(&self) -> Theme {
        let mut current = self.lock();
        let next = current.toggled();
        self.store.set(THEME_STORAGE_KEY, next.as_str());
        *current = next;
        next
    }

    /// Follows the system only while no preference has been stored.
    pub fn on_system_change(&self, prefers_dark: bool) -> Theme {
        let mut current = self.lock();
        if self.store.get(THEME_STORAGE_KEY).is_none() {
            *current = Theme::from_system(prefers_dark);
        }
        *current
    }

    pub fn toggle_view(&self) -> ThemeToggleView {
        render_toggle(self.current())
    }
}
