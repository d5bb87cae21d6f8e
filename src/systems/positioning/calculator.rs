//! Turns a preset, user overrides and the environment into a concrete,
//! boundary-constrained menu position.
use std::{collections::HashMap, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{
    environment::{Device, Environment},
    preset::Preset,
};

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 1.5;
/// Fixed number of top-level columns assumed when estimating the footprint.
/// Not derived from the live item count.
pub const MENU_COLUMNS: f32 = 4.0;
pub const DEFAULT_HORIZONTAL_MOVE: f32 = 170.0;
pub const DEFAULT_VERTICAL_MOVE: f32 = 120.0;

/// A percentage of a reference length or a literal pixel value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Offset {
    Percent(f32),
    Pixels(f32),
}

impl Offset {
    /// Parses `"45%"`, `"120px"` or `"120"`. Anything else is zero pixels.
    pub fn parse(value: &str) -> Offset {
        let value = value.trim();
        if let Some(percent) = value.strip_suffix('%') {
            return Offset::Percent(percent.trim().parse().unwrap_or(0.0));
        }
        let pixels = value.strip_suffix("px").unwrap_or(value).trim();
        Offset::Pixels(pixels.parse().unwrap_or(0.0))
    }

    pub fn resolve(self, reference: f32) -> f32 {
        match self {
            Offset::Percent(percent) => percent / 100.0 * reference,
            Offset::Pixels(pixels) => pixels,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Percent(percent) => write!(f, "{percent}%"),
            Offset::Pixels(pixels) => write!(f, "{pixels}px"),
        }
    }
}

impl Serialize for Offset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOffset {
    Number(f32),
    Text(String),
}

impl<'de> Deserialize<'de> for Offset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawOffset::deserialize(deserializer)? {
            RawOffset::Number(pixels) => Offset::Pixels(pixels),
            RawOffset::Text(text) => Offset::parse(&text),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub top: f32,
    pub right: f32,
    pub scale: f32,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            top: 0.0,
            right: 0.0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationAmounts {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Default for NavigationAmounts {
    fn default() -> Self {
        Self {
            horizontal: DEFAULT_HORIZONTAL_MOVE,
            vertical: DEFAULT_VERTICAL_MOVE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<Offset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Offset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
}

impl UserOverrides {
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.right.is_none() && self.scale.is_none()
    }

    /// Absolute overrides pinning every component of `position`.
    pub fn pinned(position: Position) -> Self {
        Self {
            top: Some(Offset::Pixels(position.top)),
            right: Some(Offset::Pixels(position.right)),
            scale: Some(position.scale),
        }
    }
}

/// Minimum distance from each viewport edge, in percent of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryMargins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for BoundaryMargins {
    fn default() -> Self {
        Self {
            top: 5.0,
            bottom: 5.0,
            left: 5.0,
            right: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDimensions {
    pub item_width: f32,
    pub item_height: f32,
    pub sub_item_width: f32,
    pub sub_item_height: f32,
}

impl Default for MenuDimensions {
    fn default() -> Self {
        Self {
            item_width: 170.0,
            item_height: 600.0,
            sub_item_width: 400.0,
            sub_item_height: 120.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionTable(pub HashMap<Device, MenuDimensions>);

impl DimensionTable {
    /// Platforms without their own entry use the desktop dimensions.
    pub fn for_platform(&self, platform: Device) -> MenuDimensions {
        self.0
            .get(&platform)
            .or_else(|| self.0.get(&Device::Desktop))
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub width: f32,
    pub height: f32,
}

impl Footprint {
    pub fn estimate(dimensions: MenuDimensions, scale: f32) -> Self {
        Self {
            width: dimensions.item_width * MENU_COLUMNS * scale,
            height: dimensions.item_height * scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calculation {
    pub position: Position,
    pub navigation: NavigationAmounts,
}

pub fn calculate(
    preset: &Preset,
    overrides: &UserOverrides,
    environment: &Environment,
    boundaries: &BoundaryMargins,
    dimensions: &DimensionTable,
) -> Calculation {
    let viewport = environment.viewport;

    let top = overrides.top.unwrap_or(preset.top).resolve(viewport.height);
    let right = overrides.right.unwrap_or(preset.right).resolve(viewport.width);
    let scale = overrides.scale.or(preset.scale).unwrap_or(1.0);

    Calculation {
        position: constrain(
            Position { top, right, scale },
            environment,
            boundaries,
            dimensions,
        ),
        navigation: navigation_amounts(preset),
    }
}

pub fn navigation_amounts(preset: &Preset) -> NavigationAmounts {
    NavigationAmounts {
        horizontal: preset
            .horizontal_move
            .filter(|amount| *amount != 0.0)
            .unwrap_or(DEFAULT_HORIZONTAL_MOVE),
        vertical: preset
            .vertical_move
            .filter(|amount| *amount != 0.0)
            .unwrap_or(DEFAULT_VERTICAL_MOVE),
    }
}

/// Clamps `position` into the viewport margins minus the estimated
/// footprint. When the viewport is too small for the margins, the upper
/// bound drops below the lower one and the value collapses to the lower
/// bound.
pub fn constrain(
    position: Position,
    environment: &Environment,
    boundaries: &BoundaryMargins,
    dimensions: &DimensionTable,
) -> Position {
    let viewport = environment.viewport;
    let scale = clamp_scale(position.scale);
    let footprint = Footprint::estimate(dimensions.for_platform(environment.platform), scale);

    let min_top = boundaries.top / 100.0 * viewport.height;
    let min_right = boundaries.right / 100.0 * viewport.width;
    let max_top = viewport.height - footprint.height - boundaries.bottom / 100.0 * viewport.height;
    let max_right = viewport.width - footprint.width - boundaries.left / 100.0 * viewport.width;

    Position {
        top: collapse_to_min(position.top, min_top, max_top),
        right: collapse_to_min(position.right, min_right, max_right),
        scale,
    }
}

pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

// Not `f32::clamp`, which panics when min > max.
fn collapse_to_min(value: f32, min: f32, max: f32) -> f32 {
    min.max(max.min(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::layout::Breakpoints,
        systems::positioning::environment::{detect, EnvironmentSignals, UserAgent, Viewport},
    };

    fn environment(width: f32, height: f32) -> Environment {
        detect(
            &EnvironmentSignals::new(Viewport::new(width, height), UserAgent::default()),
            &Breakpoints::default(),
        )
    }

    fn desktop_preset() -> Preset {
        Preset {
            top: Offset::Percent(45.0),
            right: Offset::Percent(25.0),
            scale: Some(1.0),
            horizontal_move: Some(170.0),
            vertical_move: Some(120.0),
        }
    }

    fn desktop_dimensions() -> DimensionTable {
        DimensionTable(HashMap::from([(
            Device::Desktop,
            MenuDimensions {
                item_width: 170.0,
                item_height: 600.0,
                sub_item_width: 400.0,
                sub_item_height: 120.0,
            },
        )]))
    }

    #[test]
    fn offsets_parse_percentages_pixels_and_garbage() {
        assert_eq!(Offset::parse("45%"), Offset::Percent(45.0));
        assert_eq!(Offset::parse("120px"), Offset::Pixels(120.0));
        assert_eq!(Offset::parse(" 12.5 "), Offset::Pixels(12.5));
        assert_eq!(Offset::parse("nonsense"), Offset::Pixels(0.0));
        assert_eq!(Offset::Percent(50.0).resolve(800.0), 400.0);
    }

    #[test]
    fn offsets_deserialize_from_numbers_and_strings() {
        let overrides: UserOverrides =
            serde_json::from_str(r#"{"top":"80px","right":33,"scale":1.2}"#).expect("overrides");
        assert_eq!(overrides.top, Some(Offset::Pixels(80.0)));
        assert_eq!(overrides.right, Some(Offset::Pixels(33.0)));
        assert_eq!(overrides.scale, Some(1.2));

        let json = serde_json::to_string(&UserOverrides {
            top: Some(Offset::Pixels(80.0)),
            ..Default::default()
        })
        .expect("serialize");
        assert_eq!(json, r#"{"top":"80px"}"#);
    }

    #[test]
    fn preset_percentages_resolve_against_viewport_axes() {
        let env = environment(1920.0, 1400.0);
        let result = calculate(
            &desktop_preset(),
            &UserOverrides::default(),
            &env,
            &BoundaryMargins::default(),
            &desktop_dimensions(),
        );
        assert!((result.position.top - 630.0).abs() < 1e-3);
        assert!((result.position.right - 480.0).abs() < 1e-3);
        assert_eq!(result.position.scale, 1.0);
        assert_eq!(result.navigation, NavigationAmounts::default());
    }

    #[test]
    fn overrides_win_over_preset() {
        let env = environment(1920.0, 1080.0);
        let overrides = UserOverrides {
            top: Some(Offset::Pixels(100.0)),
            right: None,
            scale: Some(1.2),
        };
        let result = calculate(
            &desktop_preset(),
            &overrides,
            &env,
            &BoundaryMargins::default(),
            &desktop_dimensions(),
        );
        assert_eq!(result.position.top, 100.0);
        assert!((result.position.right - 480.0).abs() < 1e-3);
        assert_eq!(result.position.scale, 1.2);
    }

    #[test]
    fn scale_is_always_clamped() {
        let env = environment(1920.0, 1080.0);
        for (requested, expected) in [(5.0, MAX_SCALE), (0.01, MIN_SCALE), (1.1, 1.1)] {
            let overrides = UserOverrides {
                scale: Some(requested),
                ..Default::default()
            };
            let result = calculate(
                &desktop_preset(),
                &overrides,
                &env,
                &BoundaryMargins::default(),
                &desktop_dimensions(),
            );
            assert_eq!(result.position.scale, expected);
        }
    }

    #[test]
    fn positions_are_kept_inside_margins() {
        let env = environment(1920.0, 1080.0);
        let overrides = UserOverrides {
            top: Some(Offset::Pixels(-500.0)),
            right: Some(Offset::Pixels(5000.0)),
            scale: None,
        };
        let result = calculate(
            &desktop_preset(),
            &overrides,
            &env,
            &BoundaryMargins::default(),
            &desktop_dimensions(),
        );
        // minTop = 5% of 1080.
        assert!((result.position.top - 54.0).abs() < 1e-3);
        // maxRight = 1920 - 170 * 4 - 5% of 1920.
        assert!((result.position.right - 1144.0).abs() < 1e-3);
    }

    #[test]
    fn tiny_viewports_collapse_to_the_lower_bound() {
        let env = environment(200.0, 300.0);
        let result = calculate(
            &desktop_preset(),
            &UserOverrides::default(),
            &env,
            &BoundaryMargins::default(),
            &desktop_dimensions(),
        );
        assert!((result.position.top - 15.0).abs() < 1e-3);
        assert!((result.position.right - 10.0).abs() < 1e-3);
    }

    #[test]
    fn missing_navigation_amounts_use_defaults() {
        let preset = Preset {
            horizontal_move: None,
            vertical_move: Some(0.0),
            ..desktop_preset()
        };
        assert_eq!(navigation_amounts(&preset), NavigationAmounts::default());
    }

    #[test]
    fn unknown_platform_dimensions_use_desktop() {
        let dimensions = desktop_dimensions();
        assert_eq!(
            dimensions.for_platform(Device::Wide),
            dimensions.for_platform(Device::Desktop)
        );
        assert_eq!(
            DimensionTable::default().for_platform(Device::Mobile),
            MenuDimensions::default()
        );
    }
}
