use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::LogSource;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleSettings {
    pub base_url: String,
    pub csrf_token: Option<String>,
    pub session_cookie: Option<String>,
    pub pull_auto_close_ms: u64,
    pub default_source: LogSource,
    pub page_size: u32,
    pub preferences_path: PathBuf,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            csrf_token: None,
            session_cookie: None,
            pull_auto_close_ms: 2000,
            default_source: LogSource::Django,
            page_size: 100,
            preferences_path: PathBuf::from("console-preferences.toml"),
        }
    }
}

impl ConsoleSettings {
    pub fn pull_auto_close_delay(&self) -> Duration {
        Duration::from_millis(self.pull_auto_close_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    csrf_token: Option<String>,
    session_cookie: Option<String>,
    pull_auto_close_ms: Option<u64>,
    default_source: Option<LogSource>,
    page_size: Option<u32>,
    preferences_path: Option<PathBuf>,
}

/// Defaults, then `console.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<ConsoleSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<ConsoleSettings> {
    let mut settings = ConsoleSettings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        apply_file(&mut settings, file_cfg);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.base_url = normalize_base_url(&settings.base_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut ConsoleSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.base_url {
        settings.base_url = v;
    }
    if file_cfg.csrf_token.is_some() {
        settings.csrf_token = file_cfg.csrf_token;
    }
    if file_cfg.session_cookie.is_some() {
        settings.session_cookie = file_cfg.session_cookie;
    }
    if let Some(v) = file_cfg.pull_auto_close_ms {
        settings.pull_auto_close_ms = v;
    }
    if let Some(v) = file_cfg.default_source {
        settings.default_source = v;
    }
    if let Some(v) = file_cfg.page_size.filter(|v| *v > 0) {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.preferences_path {
        settings.preferences_path = v;
    }
}

fn apply_env(settings: &mut ConsoleSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("CONSOLE_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = var("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = var("CONSOLE_CSRF_TOKEN") {
        settings.csrf_token = Some(v);
    }
    if let Some(v) = var("APP__CSRF_TOKEN") {
        settings.csrf_token = Some(v);
    }

    if let Some(v) = var("CONSOLE_SESSION_COOKIE") {
        settings.session_cookie = Some(v);
    }
    if let Some(v) = var("APP__SESSION_COOKIE") {
        settings.session_cookie = Some(v);
    }

    if let Some(v) = var("APP__PULL_AUTO_CLOSE_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.pull_auto_close_ms = parsed;
        }
    }

    if let Some(v) = var("APP__DEFAULT_SOURCE") {
        if let Ok(parsed) = v.parse::<LogSource>() {
            settings.default_source = parsed;
        }
    }

    if let Some(v) = var("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<u32>() {
            if parsed > 0 {
                settings.page_size = parsed;
            }
        }
    }

    if let Some(v) = var("APP__PREFERENCES_PATH") {
        settings.preferences_path = PathBuf::from(v);
    }
}

/// Validates the service root and strips trailing slashes so endpoint paths
/// can be appended verbatim.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).with_context(|| format!("invalid base url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("base url '{raw}' must use http or https");
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
