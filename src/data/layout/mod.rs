//! Menu layout configuration: breakpoints, presets, dimensions, timings.
//!
//! The document is embedded at compile time and parsed once. A broken
//! document never takes the menu down; it is reported and the built-in
//! defaults are used instead.
use std::{collections::HashMap, fmt, time::Duration};

use bevy::prelude::*;
use enum_map::{enum_map, EnumMap};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::systems::{
    motion::Easing,
    positioning::{
        calculator::{BoundaryMargins, DimensionTable, MenuDimensions, Offset},
        environment::{Browser, Device},
        preset::{Preset, PresetTable},
    },
};

const MENU_LAYOUT_JSON: &str = include_str!("./menu_layout.json");

static MENU_LAYOUT: Lazy<Result<MenuLayoutConfig, LayoutConfigError>> =
    Lazy::new(|| MenuLayoutConfig::from_json_str(MENU_LAYOUT_JSON));

#[derive(Debug, Clone)]
pub enum LayoutConfigError {
    Parse(String),
}

impl fmt::Display for LayoutConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid menu layout: {message}"),
        }
    }
}

impl std::error::Error for LayoutConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoints {
    pub mobile: f32,
    pub tablet: f32,
    pub desktop: f32,
    pub wide: f32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            mobile: 480.0,
            tablet: 768.0,
            desktop: 1024.0,
            wide: 1440.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSettings {
    /// Anchor repositioning, in milliseconds.
    pub transition_duration: u64,
    pub easing: Easing,
    /// Item and sub-item steps, in milliseconds.
    pub navigation_duration: u64,
    pub navigation_easing: Easing,
    /// Upper bound on waiting for a navigation step to settle.
    pub transition_timeout: u64,
}

impl AnimationSettings {
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_duration)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_duration)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.transition_timeout)
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            transition_duration: 300,
            easing: Easing::EaseInOut,
            navigation_duration: 300,
            navigation_easing: Easing::EaseIn,
            transition_timeout: 1500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugDisplay {
    pub enabled: bool,
    pub show_boundaries: bool,
    pub show_center: bool,
    pub show_grid: bool,
    pub log_position_changes: bool,
}

impl Default for DebugDisplay {
    fn default() -> Self {
        Self {
            enabled: false,
            show_boundaries: true,
            show_center: true,
            show_grid: false,
            log_position_changes: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZIndexTable {
    pub background: i32,
    pub background_overlay: i32,
    pub menu: i32,
    pub sub_menu: i32,
    pub modal: i32,
    pub debug: i32,
    pub controls: i32,
}

impl ZIndexTable {
    /// World-space depth for a stacking index.
    pub fn depth(index: i32) -> f32 {
        index as f32 * 0.1
    }
}

impl Default for ZIndexTable {
    fn default() -> Self {
        Self {
            background: -12,
            background_overlay: -11,
            menu: 1000,
            sub_menu: 1001,
            modal: 2000,
            debug: 3000,
            controls: 3001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageKeys {
    pub user_position: String,
    pub debug_mode: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            user_position: String::from("xmb_menu_user_position"),
            debug_mode: String::from("xmb_menu_debug_mode"),
        }
    }
}

/// Extra vertical step taken by the sub-item that jumps the category icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "HashMap<Device, f32>",
    into = "HashMap<Device, f32>"
)]
pub struct VerticalOffsets(pub EnumMap<Device, f32>);

impl VerticalOffsets {
    pub fn for_device(&self, device: Device) -> f32 {
        self.0[device]
    }
}

impl Default for VerticalOffsets {
    fn default() -> Self {
        Self(enum_map! {
            Device::Mobile | Device::Tablet => 200.0,
            Device::Desktop | Device::Wide => 250.0,
        })
    }
}

impl From<HashMap<Device, f32>> for VerticalOffsets {
    fn from(table: HashMap<Device, f32>) -> Self {
        let mut offsets = Self::default();
        for (device, offset) in table {
            offsets.0[device] = offset;
        }
        offsets
    }
}

impl From<VerticalOffsets> for HashMap<Device, f32> {
    fn from(offsets: VerticalOffsets) -> Self {
        offsets.0.into_iter().collect()
    }
}

/// Narrow viewports push every top-level item right by `offset` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileRowOffset {
    pub max_width: f32,
    pub offset: f32,
}

impl MobileRowOffset {
    pub fn for_width(&self, width: f32) -> f32 {
        if width <= self.max_width {
            self.offset
        } else {
            0.0
        }
    }
}

impl Default for MobileRowOffset {
    fn default() -> Self {
        Self {
            max_width: 768.0,
            offset: 100.0,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuLayoutConfig {
    #[serde(default)]
    pub breakpoints: Breakpoints,
    #[serde(default = "default_platforms")]
    pub platforms: PresetTable,
    #[serde(default = "default_dimensions")]
    pub menu_dimensions: DimensionTable,
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub boundaries: BoundaryMargins,
    #[serde(default)]
    pub debug: DebugDisplay,
    #[serde(default)]
    pub z_index: ZIndexTable,
    #[serde(default)]
    pub storage_keys: StorageKeys,
    #[serde(default = "default_zone_presets")]
    pub presets: HashMap<String, Preset>,
    #[serde(default)]
    pub vertical_offsets: VerticalOffsets,
    #[serde(default)]
    pub mobile_row_offset: MobileRowOffset,
}

impl MenuLayoutConfig {
    pub fn from_json_str(json: &str) -> Result<Self, LayoutConfigError> {
        serde_json::from_str(json).map_err(|error| LayoutConfigError::Parse(error.to_string()))
    }

    /// The compiled-in layout, or the built-in defaults when it fails to
    /// parse.
    pub fn embedded() -> Self {
        match MENU_LAYOUT.as_ref() {
            Ok(config) => config.clone(),
            Err(error) => {
                warn!("{error}; using built-in menu layout");
                Self::default()
            }
        }
    }

    pub fn zone_preset(&self, name: &str) -> Option<Preset> {
        self.presets.get(name).copied()
    }
}

impl Default for MenuLayoutConfig {
    fn default() -> Self {
        Self {
            breakpoints: Breakpoints::default(),
            platforms: default_platforms(),
            menu_dimensions: default_dimensions(),
            animation: AnimationSettings::default(),
            boundaries: BoundaryMargins::default(),
            debug: DebugDisplay::default(),
            z_index: ZIndexTable::default(),
            storage_keys: StorageKeys::default(),
            presets: default_zone_presets(),
            vertical_offsets: VerticalOffsets::default(),
            mobile_row_offset: MobileRowOffset::default(),
        }
    }
}

fn platform_preset(top: f32, right: f32, scale: f32, horizontal: f32, vertical: f32) -> Preset {
    Preset {
        top: Offset::Percent(top),
        right: Offset::Percent(right),
        scale: Some(scale),
        horizontal_move: Some(horizontal),
        vertical_move: Some(vertical),
    }
}

fn default_platforms() -> PresetTable {
    PresetTable(HashMap::from([
        (
            Device::Mobile,
            HashMap::from([(Browser::Default, platform_preset(31.0, 32.0, 0.85, 100.0, 90.0))]),
        ),
        (
            Device::Tablet,
            HashMap::from([
                (Browser::Safari, platform_preset(35.0, 15.0, 0.95, 140.0, 110.0)),
                (Browser::Default, platform_preset(40.0, 20.0, 1.0, 140.0, 110.0)),
            ]),
        ),
        (
            Device::Desktop,
            HashMap::from([
                (Browser::Safari, platform_preset(35.0, 25.0, 1.0, 170.0, 120.0)),
                (Browser::Chrome, platform_preset(45.0, 25.0, 1.0, 170.0, 120.0)),
                (Browser::Firefox, platform_preset(43.0, 25.0, 1.0, 170.0, 120.0)),
                (Browser::Edge, platform_preset(45.0, 25.0, 1.0, 170.0, 120.0)),
                (Browser::Default, platform_preset(45.0, 25.0, 1.0, 170.0, 120.0)),
            ]),
        ),
        (
            Device::Wide,
            HashMap::from([(Browser::Default, platform_preset(45.0, 30.0, 1.0, 170.0, 120.0))]),
        ),
    ]))
}

fn default_dimensions() -> DimensionTable {
    DimensionTable(HashMap::from([
        (
            Device::Mobile,
            MenuDimensions {
                item_width: 120.0,
                item_height: 500.0,
                sub_item_width: 300.0,
                sub_item_height: 100.0,
            },
        ),
        (
            Device::Tablet,
            MenuDimensions {
                item_width: 150.0,
                item_height: 550.0,
                sub_item_width: 350.0,
                sub_item_height: 110.0,
            },
        ),
        (Device::Desktop, MenuDimensions::default()),
    ]))
}

fn default_zone_presets() -> HashMap<String, Preset> {
    let zone = |top: f32, right: f32| Preset {
        top: Offset::Percent(top),
        right: Offset::Percent(right),
        scale: Some(1.0),
        horizontal_move: None,
        vertical_move: None,
    };

    [
        ("topLeft", zone(10.0, 75.0)),
        ("topCenter", zone(10.0, 45.0)),
        ("topRight", zone(10.0, 10.0)),
        ("centerLeft", zone(45.0, 75.0)),
        ("center", zone(45.0, 45.0)),
        ("centerRight", zone(45.0, 10.0)),
        ("bottomLeft", zone(80.0, 75.0)),
        ("bottomCenter", zone(80.0, 45.0)),
        ("bottomRight", zone(80.0, 10.0)),
    ]
    .into_iter()
    .map(|(name, preset)| (String::from(name), preset))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_layout_parses_and_matches_defaults() {
        let parsed = MenuLayoutConfig::from_json_str(MENU_LAYOUT_JSON)
            .expect("embedded menu layout should parse");
        let defaults = MenuLayoutConfig::default();

        assert_eq!(parsed.breakpoints, defaults.breakpoints);
        assert_eq!(parsed.animation, defaults.animation);
        assert_eq!(parsed.boundaries, defaults.boundaries);
        assert_eq!(parsed.z_index, defaults.z_index);
        assert_eq!(parsed.storage_keys, defaults.storage_keys);
        assert_eq!(parsed.vertical_offsets, defaults.vertical_offsets);
        assert_eq!(parsed.menu_dimensions, defaults.menu_dimensions);
        assert_eq!(parsed.presets.len(), defaults.presets.len());
        assert_eq!(
            parsed.zone_preset("bottomRight").map(|preset| preset.top),
            Some(Offset::Percent(80.0))
        );
        for (device, browsers) in &defaults.platforms.0 {
            assert_eq!(parsed.platforms.0[device].len(), browsers.len());
        }
    }

    #[test]
    fn missing_sections_fall_back_per_section() {
        let parsed = MenuLayoutConfig::from_json_str(
            r#"{ "breakpoints": { "mobile": 400, "tablet": 700, "desktop": 1000, "wide": 1400 } }"#,
        )
        .expect("partial layout");
        assert_eq!(parsed.breakpoints.mobile, 400.0);
        assert_eq!(parsed.animation, AnimationSettings::default());
        assert_eq!(parsed.presets.len(), 9);
    }

    #[test]
    fn broken_json_is_reported() {
        let error = MenuLayoutConfig::from_json_str("{ not json").unwrap_err();
        assert!(error.to_string().starts_with("invalid menu layout"));
    }

    #[test]
    fn vertical_offsets_fill_missing_devices() {
        let offsets: VerticalOffsets = serde_json::from_str(r#"{ "wide": 300 }"#).expect("offsets");
        assert_eq!(offsets.for_device(Device::Wide), 300.0);
        assert_eq!(offsets.for_device(Device::Mobile), 200.0);
        assert_eq!(offsets.for_device(Device::Desktop), 250.0);
    }

    #[test]
    fn mobile_row_offset_applies_up_to_threshold() {
        let offset = MobileRowOffset::default();
        assert_eq!(offset.for_width(768.0), 100.0);
        assert_eq!(offset.for_width(769.0), 0.0);
    }
}
