use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    calculator::Offset,
    environment::{Browser, Device, Environment},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub top: Offset,
    pub right: Offset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_move: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_move: Option<f32>,
}

/// Used when the table has no `desktop.default` entry either.
pub const SAFE_DEFAULT_PRESET: Preset = Preset {
    top: Offset::Percent(45.0),
    right: Offset::Percent(25.0),
    scale: Some(1.0),
    horizontal_move: Some(170.0),
    vertical_move: Some(120.0),
};

/// Presets keyed by platform, then browser. Every platform is expected to
/// carry a `default` browser entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetTable(pub HashMap<Device, HashMap<Browser, Preset>>);

impl PresetTable {
    fn desktop_default(&self) -> Preset {
        self.0
            .get(&Device::Desktop)
            .and_then(|browsers| browsers.get(&Browser::Default))
            .copied()
            .unwrap_or(SAFE_DEFAULT_PRESET)
    }
}

/// `table[platform][browser]`, then `table[platform].default`, then
/// `table.desktop.default`, then [`SAFE_DEFAULT_PRESET`].
pub fn resolve(environment: &Environment, table: &PresetTable) -> Preset {
    let Some(browsers) = table.0.get(&environment.platform) else {
        warn!(
            "no menu presets for platform {:?}; using desktop default",
            environment.platform
        );
        return table.desktop_default();
    };

    browsers
        .get(&environment.browser)
        .or_else(|| browsers.get(&Browser::Default))
        .copied()
        .unwrap_or_else(|| table.desktop_default())
}
