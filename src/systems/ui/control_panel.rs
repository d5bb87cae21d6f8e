//! Live tuning panel for the menu position.
//!
//! Hidden by default. Ctrl/Super+Shift+M shows it; while it is visible the
//! keyboard nudges, scales and re-presets the menu through the
//! [`PositionManager`] and the panel reports the result.
use std::{path::PathBuf, time::Duration};

use bevy::{prelude::*, sprite::Anchor, window::PrimaryWindow};
use chrono::{SecondsFormat, Utc};

use crate::{
    data::{
        config::SiteConfig,
        layout::ZIndexTable,
        storage::{write_document, StorageError},
    },
    systems::{
        positioning::manager::{Axis, PositionManager, PositionStatus, ScreenZone},
        MenuSystems,
    },
};

pub const NUDGE_STEP: f32 = 5.0;
pub const NUDGE_STEP_LARGE: f32 = 20.0;
pub const SCALE_DOWN: f32 = 0.9;
pub const SCALE_UP: f32 = 1.1;
pub const AUTO_HIDE: Duration = Duration::from_secs(30);
pub const EXPORT_FILE: &str = "xmb-menu-settings.json";

const PANEL_SIZE: Vec2 = Vec2::new(440.0, 150.0);
const PANEL_MARGIN: f32 = 20.0;
const PANEL_PADDING: f32 = 12.0;
const PANEL_COLOR: Color = Color::srgba(0.0, 0.0, 0.0, 0.75);
const PANEL_TEXT_COLOR: Color = Color::srgb(0.85, 0.95, 0.85);
const PANEL_HELP: &str =
    "Ctrl+Arrows nudge (Shift x4)  -/= scale  0 reset scale\n1-9 zones  R reset  E export  Esc hide";

pub struct ControlPanelPlugin;
impl Plugin for ControlPanelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ControlPanel>()
            .add_systems(Startup, spawn_control_panel)
            .add_systems(
                Update,
                (handle_panel_keys, ControlPanel::auto_hide)
                    .chain()
                    .in_set(MenuSystems::Input),
            )
            .add_systems(
                Update,
                (sync_panel_visibility, update_panel_status, place_panel)
                    .after(MenuSystems::Apply),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelCommand {
    Toggle,
    Hide,
    Nudge(Axis, f32),
    Scale(f32),
    ResetScale,
    Zone(ScreenZone),
    ResetToDefault,
    Export,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Ctrl, or Super on macOS keyboards.
    pub command: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn from_keys(keys: &ButtonInput<KeyCode>) -> Self {
        Self {
            command: keys.any_pressed([
                KeyCode::ControlLeft,
                KeyCode::ControlRight,
                KeyCode::SuperLeft,
                KeyCode::SuperRight,
            ]),
            shift: keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]),
        }
    }
}

fn digit(key: KeyCode) -> Option<usize> {
    let digit = match key {
        KeyCode::Digit0 | KeyCode::Numpad0 => 0,
        KeyCode::Digit1 | KeyCode::Numpad1 => 1,
        KeyCode::Digit2 | KeyCode::Numpad2 => 2,
        KeyCode::Digit3 | KeyCode::Numpad3 => 3,
        KeyCode::Digit4 | KeyCode::Numpad4 => 4,
        KeyCode::Digit5 | KeyCode::Numpad5 => 5,
        KeyCode::Digit6 | KeyCode::Numpad6 => 6,
        KeyCode::Digit7 | KeyCode::Numpad7 => 7,
        KeyCode::Digit8 | KeyCode::Numpad8 => 8,
        KeyCode::Digit9 | KeyCode::Numpad9 => 9,
        _ => return None,
    };
    Some(digit)
}

/// Maps one key press to a panel command. Only the toggle works while the
/// panel is hidden.
pub fn command_for_key(key: KeyCode, modifiers: Modifiers, visible: bool) -> Option<PanelCommand> {
    if modifiers.command && modifiers.shift && key == KeyCode::KeyM {
        return Some(PanelCommand::Toggle);
    }
    if !visible {
        return None;
    }

    if modifiers.command {
        let step = if modifiers.shift {
            NUDGE_STEP_LARGE
        } else {
            NUDGE_STEP
        };
        return match key {
            KeyCode::ArrowUp => Some(PanelCommand::Nudge(Axis::Top, -step)),
            KeyCode::ArrowDown => Some(PanelCommand::Nudge(Axis::Top, step)),
            KeyCode::ArrowLeft => Some(PanelCommand::Nudge(Axis::Right, step)),
            KeyCode::ArrowRight => Some(PanelCommand::Nudge(Axis::Right, -step)),
            _ => None,
        };
    }

    match key {
        KeyCode::Escape => Some(PanelCommand::Hide),
        KeyCode::Minus | KeyCode::NumpadSubtract => Some(PanelCommand::Scale(SCALE_DOWN)),
        KeyCode::Equal | KeyCode::NumpadAdd => Some(PanelCommand::Scale(SCALE_UP)),
        KeyCode::KeyR => Some(PanelCommand::ResetToDefault),
        KeyCode::KeyE => Some(PanelCommand::Export),
        key => match digit(key)? {
            0 => Some(PanelCommand::ResetScale),
            zone => ScreenZone::from_digit(zone).map(PanelCommand::Zone),
        },
    }
}

#[derive(Resource, Debug)]
pub struct ControlPanel {
    visible: bool,
    idle: Timer,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            visible: false,
            idle: Timer::new(AUTO_HIDE, TimerMode::Once),
        }
    }
}

impl ControlPanel {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.touch();
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn toggle(&mut self) {
        if self.visible {
            self.hide();
        } else {
            self.show();
        }
    }

    /// Any interaction restarts the idle countdown.
    pub fn touch(&mut self) {
        self.idle.reset();
    }

    /// Returns true when the panel was hidden for being idle.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if !self.visible {
            return false;
        }
        self.idle.tick(delta);
        if self.idle.is_finished() {
            self.hide();
            return true;
        }
        false
    }

    fn auto_hide(time: Res<Time>, mut panel: ResMut<ControlPanel>) {
        if panel.tick(time.delta()) {
            debug!("control panel hidden after {}s idle", AUTO_HIDE.as_secs());
        }
    }
}

pub fn export_path(site: Option<&SiteConfig>) -> PathBuf {
    site.map(|site| site.data_dir.clone())
        .unwrap_or_else(|| SiteConfig::default().data_dir)
        .join(EXPORT_FILE)
}

/// The export document, stamped with the current UTC time in RFC 3339.
pub fn export_document(manager: &PositionManager) -> Result<String, StorageError> {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    manager.export_settings(&timestamp)
}

fn export_settings(manager: &PositionManager, site: Option<&SiteConfig>) {
    let path = export_path(site);
    let contents = match export_document(manager) {
        Ok(contents) => contents,
        Err(error) => {
            warn!("could not encode menu settings: {error}");
            return;
        }
    };
    match write_document(&path, &contents) {
        Ok(()) => info!("menu settings exported to {}", path.display()),
        Err(error) => warn!("could not export menu settings to {}: {error}", path.display()),
    }
}

pub fn apply_command(
    command: PanelCommand,
    panel: &mut ControlPanel,
    manager: &mut PositionManager,
    site: Option<&SiteConfig>,
) {
    panel.touch();
    match command {
        PanelCommand::Toggle => panel.toggle(),
        PanelCommand::Hide => panel.hide(),
        PanelCommand::Nudge(axis, delta) => manager.nudge_position(axis, delta),
        PanelCommand::Scale(factor) => manager.scale_menu(factor),
        PanelCommand::ResetScale => manager.reset_scale(),
        PanelCommand::Zone(zone) => {
            manager.apply_zone(zone);
        }
        PanelCommand::ResetToDefault => manager.reset_to_default(),
        PanelCommand::Export => export_settings(manager, site),
    }
}

fn handle_panel_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut panel: ResMut<ControlPanel>,
    manager: Option<ResMut<PositionManager>>,
    site: Option<Res<SiteConfig>>,
) {
    let Some(mut manager) = manager else {
        return;
    };
    let modifiers = Modifiers::from_keys(&keys);
    for key in keys.get_just_pressed() {
        if let Some(command) = command_for_key(*key, modifiers, panel.is_visible()) {
            apply_command(command, &mut panel, &mut manager, site.as_deref());
        }
    }
}

/// The lowercase name a value serializes to, e.g. `desktop` or `chrome`.
fn serde_name(value: impl serde::Serialize) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::from("?"),
    }
}

pub fn status_text(status: &PositionStatus) -> String {
    let position = status.position;
    let environment = status.environment;
    format!(
        "Position: top {:.0}px  right {:.0}px  scale {:.2}\n\
         Environment: {} / {}  {:.0}x{:.0}\n\
         Steps: {:.0}px across, {:.0}px down\n\n{PANEL_HELP}",
        position.top,
        position.right,
        position.scale,
        serde_name(environment.device),
        serde_name(environment.browser),
        environment.viewport.width,
        environment.viewport.height,
        status.navigation_amounts.horizontal,
        status.navigation_amounts.vertical,
    )
}

#[derive(Component)]
pub struct ControlPanelRoot;

#[derive(Component)]
pub struct ControlPanelStatus;

fn spawn_control_panel(mut commands: Commands) {
    let z = ZIndexTable::depth(ZIndexTable::default().controls);
    commands
        .spawn((
            Name::new("control_panel"),
            ControlPanelRoot,
            Sprite::from_color(PANEL_COLOR, PANEL_SIZE),
            Anchor::TOP_LEFT,
            Transform::from_xyz(0.0, 0.0, z),
            Visibility::Hidden,
        ))
        .with_children(|panel| {
            panel.spawn((
                Name::new("control_panel_status"),
                ControlPanelStatus,
                Text2d::new(PANEL_HELP),
                TextFont {
                    font_size: 13.0,
                    ..default()
                },
                TextColor(PANEL_TEXT_COLOR),
                Anchor::TOP_LEFT,
                Transform::from_xyz(PANEL_PADDING, -PANEL_PADDING, 0.01),
            ));
        });
}

fn sync_panel_visibility(
    panel: Res<ControlPanel>,
    mut roots: Query<&mut Visibility, With<ControlPanelRoot>>,
) {
    if !panel.is_changed() {
        return;
    }
    for mut visibility in &mut roots {
        *visibility = if panel.is_visible() {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    }
}

fn update_panel_status(
    panel: Res<ControlPanel>,
    manager: Option<Res<PositionManager>>,
    mut texts: Query<&mut Text2d, With<ControlPanelStatus>>,
) {
    let Some(manager) = manager else {
        return;
    };
    if !panel.is_visible() || !(panel.is_changed() || manager.is_changed()) {
        return;
    }
    let text = status_text(&manager.status());
    for mut status in &mut texts {
        status.0.clone_from(&text);
    }
}

fn place_panel(
    window: Query<&Window, With<PrimaryWindow>>,
    mut roots: Query<&mut Transform, With<ControlPanelRoot>>,
) {
    let Ok(window) = window.single() else {
        return;
    };
    for mut transform in &mut roots {
        transform.translation.x = -window.width() / 2.0 + PANEL_MARGIN;
        transform.translation.y = window.height() / 2.0 - PANEL_MARGIN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::layout::MenuLayoutConfig, data::storage::MemoryStore};

    const COMMAND: Modifiers = Modifiers {
        command: true,
        shift: false,
    };
    const COMMAND_SHIFT: Modifiers = Modifiers {
        command: true,
        shift: true,
    };

    #[test]
    fn only_the_toggle_works_while_hidden() {
        assert_eq!(
            command_for_key(KeyCode::KeyM, COMMAND_SHIFT, false),
            Some(PanelCommand::Toggle)
        );
        assert_eq!(command_for_key(KeyCode::ArrowUp, COMMAND, false), None);
        assert_eq!(command_for_key(KeyCode::Digit5, Modifiers::default(), false), None);
    }

    #[test]
    fn nudges_follow_arrow_direction_and_shift() {
        assert_eq!(
            command_for_key(KeyCode::ArrowUp, COMMAND, true),
            Some(PanelCommand::Nudge(Axis::Top, -NUDGE_STEP))
        );
        assert_eq!(
            command_for_key(KeyCode::ArrowLeft, COMMAND_SHIFT, true),
            Some(PanelCommand::Nudge(Axis::Right, NUDGE_STEP_LARGE))
        );
        assert_eq!(
            command_for_key(KeyCode::ArrowRight, COMMAND, true),
            Some(PanelCommand::Nudge(Axis::Right, -NUDGE_STEP))
        );
        assert_eq!(command_for_key(KeyCode::ArrowUp, Modifiers::default(), true), None);
    }

    #[test]
    fn digits_pick_zones_in_reading_order() {
        let plain = Modifiers::default();
        assert_eq!(
            command_for_key(KeyCode::Digit1, plain, true),
            Some(PanelCommand::Zone(ScreenZone::TopLeft))
        );
        assert_eq!(
            command_for_key(KeyCode::Numpad9, plain, true),
            Some(PanelCommand::Zone(ScreenZone::BottomRight))
        );
        assert_eq!(
            command_for_key(KeyCode::Digit0, plain, true),
            Some(PanelCommand::ResetScale)
        );
        assert_eq!(
            command_for_key(KeyCode::Escape, plain, true),
            Some(PanelCommand::Hide)
        );
    }

    #[test]
    fn idle_panel_hides_after_thirty_seconds() {
        let mut panel = ControlPanel::default();
        panel.show();
        assert!(!panel.tick(Duration::from_secs(20)));
        panel.touch();
        assert!(!panel.tick(Duration::from_secs(20)));
        assert!(panel.is_visible());
        assert!(panel.tick(Duration::from_secs(10)));
        assert!(!panel.is_visible());
    }

    #[test]
    fn commands_reach_the_manager() {
        let mut manager = PositionManager::new(MenuLayoutConfig::default(), MemoryStore::new());
        manager.init(Default::default(), false);
        let mut panel = ControlPanel::default();
        panel.show();

        let before = manager.position();
        apply_command(PanelCommand::Scale(SCALE_DOWN), &mut panel, &mut manager, None);
        assert!((manager.position().scale - before.scale * SCALE_DOWN).abs() < 1e-4);

        apply_command(PanelCommand::ResetScale, &mut panel, &mut manager, None);
        assert_eq!(manager.position().scale, 1.0);

        apply_command(PanelCommand::Hide, &mut panel, &mut manager, None);
        assert!(!panel.is_visible());
    }

    #[test]
    fn export_lands_in_the_data_directory() {
        let site = SiteConfig::from_lookup(|key| {
            (key == "XMB_DATA_DIR").then(|| String::from("/tmp/xmbfolio-export"))
        });
        assert_eq!(
            export_path(Some(&site)),
            PathBuf::from("/tmp/xmbfolio-export").join(EXPORT_FILE)
        );
    }

    #[test]
    fn export_is_stamped_with_an_rfc3339_time() {
        let mut manager = PositionManager::new(MenuLayoutConfig::default(), MemoryStore::new());
        manager.init(Default::default(), false);
        let document = export_document(&manager).expect("export encodes");
        let value: serde_json::Value = serde_json::from_str(&document).expect("export is json");
        let timestamp = value["timestamp"].as_str().expect("timestamp is a string");
        assert!(timestamp.ends_with('Z'));
        chrono::DateTime::parse_from_rfc3339(timestamp).expect("timestamp is rfc3339");
    }

    #[test]
    fn status_text_reports_position_and_environment() {
        let mut manager = PositionManager::new(MenuLayoutConfig::default(), MemoryStore::new());
        manager.init(Default::default(), false);
        let text = status_text(&manager.status());
        assert!(text.starts_with("Position: top "));
        // 1280 wide is past the desktop breakpoint.
        assert!(text.contains("wide / default"));
        assert!(text.contains("1280x720"));
    }
}
