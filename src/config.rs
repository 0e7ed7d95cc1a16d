//! Client configuration loading, including the static category catalog.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{categories::CategoryEntry, countdown::CountdownDefaults};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FACT_FICTION_CONFIG_PATH";
/// Rummage shuffle period used when none is configured.
const DEFAULT_RUMMAGE_INTERVAL_MS: u64 = 400;

#[derive(Debug, Clone)]
/// Immutable runtime configuration of a client session.
pub struct AppConfig {
    categories: Vec<CategoryEntry>,
    countdowns: CountdownDefaults,
    rummage_interval: Duration,
    rummage_icons: Vec<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        categories = config.categories.len(),
                        "loaded client config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document; absent fields keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Static category catalog.
    pub fn categories(&self) -> &[CategoryEntry] {
        &self.categories
    }

    /// Countdown values shown before the first tick.
    pub fn countdowns(&self) -> CountdownDefaults {
        self.countdowns
    }

    /// Period of the rummage icon shuffle.
    pub fn rummage_interval(&self) -> Duration {
        self.rummage_interval
    }

    /// Icons the rummage effect cycles through.
    pub fn rummage_icons(&self) -> &[String] {
        &self.rummage_icons
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let categories = default_categories();
        let rummage_icons = icons_of(&categories);
        Self {
            categories,
            countdowns: CountdownDefaults::default(),
            rummage_interval: Duration::from_millis(DEFAULT_RUMMAGE_INTERVAL_MS),
            rummage_icons,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    categories: Option<Vec<RawCategory>>,
    question_seconds: Option<u32>,
    category_seconds: Option<u32>,
    next_round_seconds: Option<u32>,
    rummage_interval_ms: Option<u64>,
    rummage_icons: Option<Vec<String>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = CountdownDefaults::default();
        let categories = value
            .categories
            .map(|raw| raw.into_iter().map(Into::into).collect::<Vec<_>>())
            .unwrap_or_else(default_categories);
        let rummage_icons = value
            .rummage_icons
            .unwrap_or_else(|| icons_of(&categories));

        Self {
            countdowns: CountdownDefaults {
                question: value.question_seconds.unwrap_or(defaults.question),
                category: value.category_seconds.unwrap_or(defaults.category),
                next_round: value.next_round_seconds.unwrap_or(defaults.next_round),
            },
            // A zero period would make the shuffle timer panic.
            rummage_interval: Duration::from_millis(
                value
                    .rummage_interval_ms
                    .unwrap_or(DEFAULT_RUMMAGE_INTERVAL_MS)
                    .max(1),
            ),
            categories,
            rummage_icons,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single catalog entry inside the configuration file.
struct RawCategory {
    label: String,
    icon: String,
    #[serde(default)]
    description: String,
}

impl From<RawCategory> for CategoryEntry {
    fn from(value: RawCategory) -> Self {
        Self {
            label: value.label,
            icon: value.icon,
            description: value.description,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn icons_of(categories: &[CategoryEntry]) -> Vec<String> {
    categories.iter().map(|entry| entry.icon.clone()).collect()
}

/// Built-in category catalog shipped with the binary.
fn default_categories() -> Vec<CategoryEntry> {
    [
        ("Science", "science", "Physics, chemistry and the natural world"),
        ("History", "history_edu", "People and events that shaped the past"),
        ("Geography", "public", "Countries, capitals and landmarks"),
        ("Animals", "pets", "Creatures great and small"),
        ("Music", "music_note", "Artists, albums and instruments"),
        ("Film", "movie", "Cinema trivia from every era"),
        ("Food", "restaurant", "Dishes, ingredients and cuisines"),
        ("Sports", "sports_soccer", "Games, records and athletes"),
    ]
    .into_iter()
    .map(|(label, icon, description)| CategoryEntry {
        label: label.into(),
        icon: icon.into(),
        description: description.into(),
    })
    .collect()
}
