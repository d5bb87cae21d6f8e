//! Site configuration read from environment variables.
//!
//! Every value has a default so the site runs unconfigured. The serialized
//! (camelCase) form doubles as the source of menu template values, e.g.
//! `{github.username}`.
use std::{collections::BTreeMap, path::PathBuf};

use bevy::prelude::Resource;
use directories::ProjectDirs;
use serde::Serialize;
use serde_json::Value;

use crate::systems::positioning::environment::UserAgent;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialAccount {
    pub username: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubAccount {
    pub username: String,
    pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitterAccount {
    pub handle: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualConfig {
    pub primary_colors: Vec<String>,
    pub secondary_colors: Vec<String>,
    pub gradient_speed: f32,
    pub gradient_distortion: f32,
    pub gradient_swirl: f32,
    pub gradient_opacity: f32,
    pub wireframe_speed: f32,
    pub wireframe_opacity: f32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            primary_colors: colors(&["#000000", "#1a3b1a", "#2d5a27", "#0f1f0f"]),
            secondary_colors: colors(&["#0f1f0f", "#1a3b1a", "#2d5a27", "#4a7c59"]),
            gradient_speed: 0.3,
            gradient_distortion: 0.8,
            gradient_swirl: 0.1,
            gradient_opacity: 1.0,
            wireframe_speed: 0.2,
            wireframe_opacity: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfig {
    pub enabled: bool,
    pub show_boundaries: bool,
    pub show_center: bool,
    pub log_position_changes: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            show_boundaries: true,
            show_center: true,
            log_position_changes: true,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub site_title: String,
    pub username: String,
    pub bio_url: String,
    pub github: GithubAccount,
    pub twitter: TwitterAccount,
    pub farcaster: SocialAccount,
    #[serde(skip)]
    pub menu_file: Option<PathBuf>,
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(skip)]
    pub user_agent: UserAgent,
    pub visual: VisualConfig,
    pub debug: DebugConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl SiteConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let text = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: f32| match var(key) {
            Some(raw) => match raw.trim().parse::<f32>() {
                Ok(value) if value != 0.0 => value,
                Ok(_) => default,
                Err(error) => {
                    log::warn!("{key}={raw:?} is not a number ({error}); using {default}");
                    default
                }
            },
            None => default,
        };
        let palette = |key: &str, default: Vec<String>| {
            var(key)
                .map(|raw| {
                    raw.split(',')
                        .map(|color| color.trim().to_string())
                        .filter(|color| !color.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|colors| !colors.is_empty())
                .unwrap_or(default)
        };

        let visual_defaults = VisualConfig::default();
        let github_username = text("GITHUB_USERNAME", "yourusername");

        Self {
            site_title: text("SITE_TITLE", "Your Name"),
            username: text("USERNAME", "yourusername"),
            bio_url: text("BIO_URL", "https://yourwebsite.com/"),
            github: GithubAccount {
                repo: text("GITHUB_REPO", &format!("{github_username}/yourrepo")),
                username: github_username,
            },
            twitter: TwitterAccount {
                handle: text("TWITTER_HANDLE", "yourhandle"),
                url: text("TWITTER_URL", "https://x.com/yourhandle"),
            },
            farcaster: SocialAccount {
                username: text("FARCASTER_USERNAME", "yourusername"),
                url: text("FARCASTER_URL", "https://farcaster.xyz/yourusername"),
            },
            menu_file: var("XMB_MENU_FILE").map(PathBuf::from),
            data_dir: var("XMB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            user_agent: UserAgent::new(
                var("XMB_USER_AGENT").unwrap_or_default(),
                var("XMB_USER_AGENT_VENDOR").unwrap_or_default(),
            ),
            visual: VisualConfig {
                primary_colors: palette("PRIMARY_COLORS", visual_defaults.primary_colors),
                secondary_colors: palette("SECONDARY_COLORS", visual_defaults.secondary_colors),
                gradient_speed: number("GRADIENT_SPEED", visual_defaults.gradient_speed),
                gradient_distortion: number("GRADIENT_DISTORTION", visual_defaults.gradient_distortion),
                gradient_swirl: number("GRADIENT_SWIRL", visual_defaults.gradient_swirl),
                gradient_opacity: number("GRADIENT_OPACITY", visual_defaults.gradient_opacity),
                wireframe_speed: number("WIREFRAME_SPEED", visual_defaults.wireframe_speed),
                wireframe_opacity: number("WIREFRAME_OPACITY", visual_defaults.wireframe_opacity),
            },
            debug: DebugConfig {
                enabled: var("DEBUG_MODE").is_some_and(|value| value == "true"),
                show_boundaries: var("DEBUG_BOUNDARIES").is_none_or(|value| value != "false"),
                show_center: var("DEBUG_CENTER").is_none_or(|value| value != "false"),
                log_position_changes: var("DEBUG_LOG_POSITIONS")
                    .is_none_or(|value| value != "false"),
            },
        }
    }

    /// Dotted-path view of the configuration used for `{key.path}` template
    /// substitution. Arrays are joined with commas.
    pub fn template_values(&self) -> BTreeMap<String, Value> {
        let mut flattened = BTreeMap::new();
        match serde_json::to_value(self) {
            Ok(value) => flatten_into(&mut flattened, String::new(), value),
            Err(error) => log::warn!("site configuration could not be flattened: {error}"),
        }
        flattened
    }
}

fn flatten_into(target: &mut BTreeMap<String, Value>, prefix: String, value: Value) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(target, path, value);
            }
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(",");
            target.insert(prefix, Value::String(joined));
        }
        other => {
            target.insert(prefix, other);
        }
    }
}

/// The per-user data directory, or `.xmbfolio` when the platform has no
/// home directory to offer.
pub fn default_data_dir() -> PathBuf {
    match ProjectDirs::from("", "", "xmbfolio") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => {
            log::warn!("no per-user data directory; storing data under ./.xmbfolio");
            PathBuf::from(".xmbfolio")
        }
    }
}

fn colors(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
