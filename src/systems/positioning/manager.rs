use bevy::prelude::*;
use enum_map::Enum;
use phf::phf_map;
use serde::Serialize;

use super::{
    calculator::{
        self, clamp_scale, NavigationAmounts, Position, UserOverrides,
    },
    environment::{detect, Environment, EnvironmentSignals},
    preset::{self, Preset},
};
use crate::data::{
    layout::MenuLayoutConfig,
    storage::{load_json, save_json, PreferenceStore, StorageError},
};

/// Notified whenever debug mode flips. Registered by whatever draws the
/// debug visuals; the manager never knows what that is.
pub trait DebugObserver: Send + Sync {
    fn on_enable(&self);
    fn on_disable(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Top,
    Right,
}

/// A position waiting to be written to the menu anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPlacement {
    pub position: Position,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub animate: bool,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenZone {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

static SCREEN_ZONES: phf::Map<&'static str, ScreenZone> = phf_map! {
    "topLeft" => ScreenZone::TopLeft,
    "topCenter" => ScreenZone::TopCenter,
    "topRight" => ScreenZone::TopRight,
    "centerLeft" => ScreenZone::CenterLeft,
    "center" => ScreenZone::Center,
    "centerRight" => ScreenZone::CenterRight,
    "bottomLeft" => ScreenZone::BottomLeft,
    "bottomCenter" => ScreenZone::BottomCenter,
    "bottomRight" => ScreenZone::BottomRight,
};

impl ScreenZone {
    /// Row-major, matching the digit keys 1 to 9.
    pub const ORDER: [ScreenZone; 9] = [
        ScreenZone::TopLeft,
        ScreenZone::TopCenter,
        ScreenZone::TopRight,
        ScreenZone::CenterLeft,
        ScreenZone::Center,
        ScreenZone::CenterRight,
        ScreenZone::BottomLeft,
        ScreenZone::BottomCenter,
        ScreenZone::BottomRight,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        SCREEN_ZONES.get(name).copied()
    }

    /// `1` is the top-left zone, `9` the bottom-right.
    pub fn from_digit(digit: usize) -> Option<Self> {
        digit
            .checked_sub(1)
            .and_then(|index| Self::ORDER.get(index))
            .copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ScreenZone::TopLeft => "topLeft",
            ScreenZone::TopCenter => "topCenter",
            ScreenZone::TopRight => "topRight",
            ScreenZone::CenterLeft => "centerLeft",
            ScreenZone::Center => "center",
            ScreenZone::CenterRight => "centerRight",
            ScreenZone::BottomLeft => "bottomLeft",
            ScreenZone::BottomCenter => "bottomCenter",
            ScreenZone::BottomRight => "bottomRight",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionStatus {
    pub environment: Environment,
    pub position: Position,
    pub user_overrides: UserOverrides,
    pub preset: Preset,
    pub navigation_amounts: NavigationAmounts,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedSettings<'a> {
    user_overrides: &'a UserOverrides,
    environment: &'a Environment,
    timestamp: &'a str,
}

/// Owns the menu position and everything it is derived from.
///
/// Every mutation goes through [`PositionManager::apply_position`], which
/// records the position and leaves an [`AnchorPlacement`] for the
/// placement system to pick up.
#[derive(Resource)]
pub struct PositionManager {
    layout: MenuLayoutConfig,
    store: Box<dyn PreferenceStore>,
    observer: Option<Box<dyn DebugObserver>>,
    current_position: Position,
    current_environment: Environment,
    user_overrides: UserOverrides,
    debug_mode: bool,
    signals: EnvironmentSignals,
    pending: Option<AnchorPlacement>,
    initialized: bool,
}

impl PositionManager {
    pub fn new(layout: MenuLayoutConfig, store: impl PreferenceStore + 'static) -> Self {
        let signals = EnvironmentSignals::default();
        let current_environment = detect(&signals, &layout.breakpoints);
        Self {
            layout,
            store: Box::new(store),
            observer: None,
            current_position: Position::default(),
            current_environment,
            user_overrides: UserOverrides::default(),
            debug_mode: false,
            signals,
            pending: None,
            initialized: false,
        }
    }

    pub fn init(&mut self, signals: EnvironmentSignals, debug_requested: bool) {
        self.load_preferences();
        self.calculate_and_apply_position(signals, true);
        self.initialized = true;

        if debug_requested || self.layout.debug.enabled || self.debug_mode {
            self.enable_debug_mode();
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_debug_observer(&mut self, observer: impl DebugObserver + 'static) {
        if self.debug_mode {
            observer.on_enable();
        }
        self.observer = Some(Box::new(observer));
    }

    pub fn calculate_and_apply_position(
        &mut self,
        signals: EnvironmentSignals,
        instant: bool,
    ) -> Position {
        self.current_environment = detect(&signals, &self.layout.breakpoints);
        self.signals = signals;

        if self.debug_mode {
            debug!("environment detected: {:?}", self.current_environment);
        }

        let position = self.calculate();
        self.apply_position(position, !instant);
        position
    }

    pub fn apply_position(&mut self, position: Position, animate: bool) {
        self.current_position = position;
        self.pending = Some(AnchorPlacement {
            position,
            viewport_width: self.current_environment.viewport.width,
            viewport_height: self.current_environment.viewport.height,
            animate,
        });

        if self.layout.debug.log_position_changes {
            info!(
                "menu positioned: top {:.1}px, right {:.1}px, scale {:.2}",
                position.top, position.right, position.scale
            );
        }
    }

    pub fn nudge_position(&mut self, axis: Axis, delta: f32) {
        let mut position = self.current_position;
        match axis {
            Axis::Top => position.top += delta,
            Axis::Right => position.right += delta,
        }

        let position = self.constrain(position);
        self.apply_position(position, true);

        let scale = self.user_overrides.scale;
        self.user_overrides = UserOverrides {
            scale,
            ..UserOverrides::pinned(position)
        };
        self.save_preferences();
    }

    pub fn scale_menu(&mut self, factor: f32) {
        let mut position = self.current_position;
        position.scale *= factor;
        self.set_scale(position);
    }

    pub fn reset_scale(&mut self) {
        let mut position = self.current_position;
        position.scale = 1.0;
        self.set_scale(position);
    }

    fn set_scale(&mut self, position: Position) {
        let position = self.constrain(position);
        self.apply_position(position, true);
        self.user_overrides.scale = Some(position.scale);
        self.save_preferences();
    }

    /// Moves the menu to one of the named screen zones. Returns `false` for
    /// unknown names.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let Some(zone) = ScreenZone::from_name(name) else {
            warn!("unknown menu position preset `{name}`");
            return false;
        };
        let Some(preset) = self.layout.zone_preset(zone.name()) else {
            warn!("menu layout has no `{}` preset", zone.name());
            return false;
        };

        let viewport = self.current_environment.viewport;
        let position = self.constrain(Position {
            top: preset.top.resolve(viewport.height),
            right: preset.right.resolve(viewport.width),
            scale: preset.scale.unwrap_or(1.0),
        });
        self.apply_position(position, true);

        self.user_overrides = UserOverrides::pinned(position);
        self.save_preferences();
        true
    }

    pub fn apply_zone(&mut self, zone: ScreenZone) -> bool {
        self.apply_preset(zone.name())
    }

    pub fn reset_to_default(&mut self) {
        self.user_overrides = UserOverrides::default();
        self.save_preferences();
        self.calculate_and_apply_position(self.signals.clone(), false);
    }

    pub fn navigation_amounts(&self) -> NavigationAmounts {
        calculator::navigation_amounts(&self.preset())
    }

    pub fn vertical_offset(&self) -> f32 {
        self.layout
            .vertical_offsets
            .for_device(self.current_environment.device)
    }

    pub fn status(&self) -> PositionStatus {
        PositionStatus {
            environment: self.current_environment,
            position: self.current_position,
            user_overrides: self.user_overrides,
            preset: self.preset(),
            navigation_amounts: self.navigation_amounts(),
        }
    }

    pub fn enable_debug_mode(&mut self) {
        self.debug_mode = true;
        self.save_preferences();
        if let Some(observer) = &self.observer {
            observer.on_enable();
        }
        info!("menu debug mode enabled");
    }

    pub fn disable_debug_mode(&mut self) {
        self.debug_mode = false;
        self.save_preferences();
        if let Some(observer) = &self.observer {
            observer.on_disable();
        }
        info!("menu debug mode disabled");
    }

    pub fn toggle_debug_mode(&mut self) {
        if self.debug_mode {
            self.disable_debug_mode();
        } else {
            self.enable_debug_mode();
        }
    }

    pub fn export_settings(&self, timestamp: &str) -> Result<String, StorageError> {
        serde_json::to_string_pretty(&ExportedSettings {
            user_overrides: &self.user_overrides,
            environment: &self.current_environment,
            timestamp,
        })
        .map_err(|error| StorageError::Encode(error.to_string()))
    }

    pub fn take_placement(&mut self) -> Option<AnchorPlacement> {
        self.pending.take()
    }

    pub fn position(&self) -> Position {
        self.current_position
    }

    pub fn environment(&self) -> &Environment {
        &self.current_environment
    }

    pub fn overrides(&self) -> &UserOverrides {
        &self.user_overrides
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn layout(&self) -> &MenuLayoutConfig {
        &self.layout
    }

    fn preset(&self) -> Preset {
        preset::resolve(&self.current_environment, &self.layout.platforms)
    }

    fn calculate(&self) -> Position {
        calculator::calculate(
            &self.preset(),
            &self.user_overrides,
            &self.current_environment,
            &self.layout.boundaries,
            &self.layout.menu_dimensions,
        )
        .position
    }

    fn constrain(&self, position: Position) -> Position {
        calculator::constrain(
            Position {
                scale: clamp_scale(position.scale),
                ..position
            },
            &self.current_environment,
            &self.layout.boundaries,
            &self.layout.menu_dimensions,
        )
    }

    fn load_preferences(&mut self) {
        let keys = &self.layout.storage_keys;
        self.user_overrides =
            load_json(self.store.as_ref(), &keys.user_position).unwrap_or_default();
        self.debug_mode = load_json(self.store.as_ref(), &keys.debug_mode).unwrap_or(false);
    }

    fn save_preferences(&mut self) {
        let keys = self.layout.storage_keys.clone();
        save_json(self.store.as_mut(), &keys.user_position, &self.user_overrides);
        save_json(self.store.as_mut(), &keys.debug_mode, &self.debug_mode);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        data::storage::MemoryStore,
        systems::positioning::{
            calculator::Offset,
            environment::{UserAgent, Viewport},
        },
    };

    fn signals(width: f32, height: f32) -> EnvironmentSignals {
        EnvironmentSignals::new(
            Viewport::new(width, height),
            UserAgent::new("Mozilla/5.0 Chrome/126.0 Safari/537.36", "Google Inc."),
        )
    }

    fn manager(store: &MemoryStore) -> PositionManager {
        let mut manager = PositionManager::new(MenuLayoutConfig::default(), store.clone());
        manager.init(signals(1920.0, 1080.0), false);
        manager
    }

    #[test]
    fn init_places_instantly_from_preset() {
        let store = MemoryStore::new();
        let mut manager = manager(&store);
        let placement = manager.take_placement().expect("initial placement");
        assert!(!placement.animate);
        // 45% of 1080 is 486, above maxTop = 1080 - 600 - 54.
        assert!((placement.position.top - 426.0).abs() < 1e-3);
        assert!((placement.position.right - 576.0).abs() < 1e-3);
        assert!(manager.take_placement().is_none());
    }

    #[test]
    fn nudged_position_survives_a_restart() {
        let store = MemoryStore::new();
        let mut first = manager(&store);
        let before = first.position().top;
        first.nudge_position(Axis::Top, -10.0);
        assert!((first.position().top - (before - 10.0)).abs() < 1e-3);
        assert_eq!(
            first.overrides().top,
            Some(Offset::Pixels(first.position().top))
        );

        let second = manager(&store);
        assert!((second.position().top - first.position().top).abs() < 1e-3);
        assert!((second.position().right - first.position().right).abs() < 1e-3);
    }

    #[test]
    fn scaling_is_clamped_and_persisted() {
        let store = MemoryStore::new();
        let mut manager = manager(&store);
        for _ in 0..10 {
            manager.scale_menu(1.1);
        }
        assert_eq!(manager.position().scale, 1.5);
        assert_eq!(manager.overrides().scale, Some(1.5));

        manager.reset_scale();
        assert_eq!(manager.position().scale, 1.0);
        assert_eq!(manager.overrides().scale, Some(1.0));
    }

    #[test]
    fn presets_pin_absolute_overrides() {
        let store = MemoryStore::new();
        let mut manager = manager(&store);
        assert!(manager.apply_preset("topRight"));
        // 10% of 1080 and 10% of 1920.
        assert!((manager.position().top - 108.0).abs() < 1e-3);
        assert!((manager.position().right - 192.0).abs() < 1e-3);
        assert_eq!(manager.overrides().scale, Some(1.0));

        let before = manager.position();
        assert!(!manager.apply_preset("nowhere"));
        assert_eq!(manager.position(), before);
    }

    #[test]
    fn reset_to_default_is_idempotent() {
        let store = MemoryStore::new();
        let mut manager = manager(&store);
        manager.apply_preset("bottomLeft");
        manager.reset_to_default();
        let once = manager.position();
        manager.reset_to_default();
        assert_eq!(manager.position(), once);
        assert!(manager.overrides().is_empty());
    }

    #[test]
    fn corrupt_stored_overrides_are_ignored() {
        let mut store = MemoryStore::new();
        store
            .save("xmb_menu_user_position", "{ definitely not json")
            .expect("seed");
        let manager = manager(&store);
        assert!(manager.overrides().is_empty());
    }

    #[test]
    fn zones_resolve_by_name_and_digit() {
        assert_eq!(ScreenZone::from_name("center"), Some(ScreenZone::Center));
        assert_eq!(ScreenZone::from_name("middle"), None);
        assert_eq!(ScreenZone::from_digit(1), Some(ScreenZone::TopLeft));
        assert_eq!(ScreenZone::from_digit(9), Some(ScreenZone::BottomRight));
        assert_eq!(ScreenZone::from_digit(0), None);
        for zone in ScreenZone::ORDER {
            assert_eq!(ScreenZone::from_name(zone.name()), Some(zone));
        }
    }

    struct CountingObserver {
        enabled: Arc<AtomicUsize>,
        disabled: Arc<AtomicUsize>,
    }

    impl DebugObserver for CountingObserver {
        fn on_enable(&self) {
            self.enabled.fetch_add(1, Ordering::SeqCst);
        }

        fn on_disable(&self) {
            self.disabled.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn debug_mode_notifies_observer_and_persists() {
        let store = MemoryStore::new();
        let mut manager = manager(&store);
        let enabled = Arc::new(AtomicUsize::new(0));
        let disabled = Arc::new(AtomicUsize::new(0));
        manager.set_debug_observer(CountingObserver {
            enabled: enabled.clone(),
            disabled: disabled.clone(),
        });

        manager.toggle_debug_mode();
        assert!(manager.debug_mode());
        assert_eq!(enabled.load(Ordering::SeqCst), 1);

        let restarted = self::manager(&store);
        assert!(restarted.debug_mode());

        manager.toggle_debug_mode();
        assert_eq!(disabled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn vertical_offset_follows_device() {
        let store = MemoryStore::new();
        let mut manager = manager(&store);
        assert_eq!(manager.vertical_offset(), 250.0);
        manager.calculate_and_apply_position(signals(400.0, 800.0), true);
        assert_eq!(manager.vertical_offset(), 200.0);
        assert_eq!(manager.navigation_amounts().horizontal, 100.0);
    }

    #[test]
    fn export_contains_overrides_environment_and_timestamp() {
        let store = MemoryStore::new();
        let mut manager = manager(&store);
        manager.nudge_position(Axis::Right, 20.0);
        let exported = manager.export_settings("1700000000").expect("export");
        let value: serde_json::Value = serde_json::from_str(&exported).expect("json");
        assert_eq!(value["timestamp"], "1700000000");
        assert_eq!(value["environment"]["browser"], "chrome");
        assert!(value["userOverrides"]["right"].as_str().is_some_and(|right| right.ends_with("px")));
    }
}
