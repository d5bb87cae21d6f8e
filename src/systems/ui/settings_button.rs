//! Floating button for touch-only users, pinned to the bottom-right corner.
//!
//! One tap toggles the control panel once the double-tap window has passed;
//! two taps inside the window toggle debug mode instead.
use std::time::Duration;

use bevy::{input::touch::Touches, prelude::*, window::PrimaryWindow};

use crate::{
    data::layout::ZIndexTable,
    startup::render::MainCamera,
    systems::{
        navigation::input::MenuHitbox,
        positioning::manager::PositionManager,
        ui::control_panel::ControlPanel,
        MenuSystems,
    },
};

pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);
/// Touches that travel further than this are drags, not taps.
pub const TAP_SLOP: f32 = 5.0;

const BUTTON_SIZE: f32 = 50.0;
const BUTTON_MARGIN: f32 = 20.0;
const BUTTON_COLOR: Color = Color::srgba(0.176, 0.353, 0.153, 0.9);
const BUTTON_DEBUG_COLOR: Color = Color::srgba(1.0, 0.392, 0.392, 0.9);

pub struct SettingsButtonPlugin;
impl Plugin for SettingsButtonPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TapTracker>()
            .add_message::<SettingsButtonTapped>()
            .add_systems(Startup, spawn_settings_button)
            .add_systems(
                Update,
                (detect_button_taps, resolve_taps)
                    .chain()
                    .in_set(MenuSystems::Input),
            )
            .add_systems(
                Update,
                (place_settings_button, tint_settings_button).after(MenuSystems::Apply),
            );
    }
}

#[derive(Component)]
pub struct SettingsButton;

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsButtonTapped;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapGesture {
    Single,
    Double,
}

/// A first tap waits out [`DOUBLE_TAP_WINDOW`]; a second one inside it
/// turns the pair into a double tap.
#[derive(Resource, Debug, Default)]
pub struct TapTracker {
    pending: Option<Timer>,
}

impl TapTracker {
    pub fn tap(&mut self) -> Option<TapGesture> {
        if self.pending.take().is_some() {
            return Some(TapGesture::Double);
        }
        self.pending = Some(Timer::new(DOUBLE_TAP_WINDOW, TimerMode::Once));
        None
    }

    pub fn tick(&mut self, delta: Duration) -> Option<TapGesture> {
        let timer = self.pending.as_mut()?;
        timer.tick(delta);
        if !timer.is_finished() {
            return None;
        }
        self.pending = None;
        Some(TapGesture::Single)
    }
}

pub fn is_tap(start: Vec2, end: Vec2) -> bool {
    (end - start).abs().max_element() <= TAP_SLOP
}

fn spawn_settings_button(mut commands: Commands) {
    let z = ZIndexTable::depth(ZIndexTable::default().controls);
    commands.spawn((
        Name::new("settings_button"),
        SettingsButton,
        Sprite::from_color(BUTTON_COLOR, Vec2::splat(BUTTON_SIZE)),
        MenuHitbox::new(BUTTON_SIZE, BUTTON_SIZE),
        Transform::from_xyz(0.0, 0.0, z),
    ));
}

fn detect_button_taps(
    touches: Res<Touches>,
    mouse: Res<ButtonInput<MouseButton>>,
    window: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    buttons: Query<(&MenuHitbox, &GlobalTransform), With<SettingsButton>>,
    mut tapped: MessageWriter<SettingsButtonTapped>,
) {
    let Ok((camera, camera_transform)) = camera.single() else {
        return;
    };
    let to_world = |screen: Vec2| camera.viewport_to_world_2d(camera_transform, screen).ok();

    let mut points: Vec<Vec2> = touches
        .iter_just_released()
        .filter(|touch| is_tap(touch.start_position(), touch.position()))
        .filter_map(|touch| to_world(touch.position()))
        .collect();
    if mouse.just_pressed(MouseButton::Left) {
        let cursor = window.single().ok().and_then(Window::cursor_position);
        points.extend(cursor.and_then(&to_world));
    }

    for point in points {
        if buttons
            .iter()
            .any(|(hitbox, transform)| hitbox.contains(transform, point))
        {
            tapped.write(SettingsButtonTapped);
        }
    }
}

fn resolve_taps(
    time: Res<Time>,
    mut tapped: MessageReader<SettingsButtonTapped>,
    mut tracker: ResMut<TapTracker>,
    mut panel: ResMut<ControlPanel>,
    mut manager: Option<ResMut<PositionManager>>,
) {
    let mut gestures: Vec<TapGesture> = tapped.read().filter_map(|_| tracker.tap()).collect();
    gestures.extend(tracker.tick(time.delta()));

    for gesture in gestures {
        match gesture {
            TapGesture::Single => {
                panel.toggle();
                debug!("settings button toggled the control panel");
            }
            TapGesture::Double => match manager.as_deref_mut() {
                Some(manager) => manager.toggle_debug_mode(),
                None => debug!("double tap ignored: no position manager"),
            },
        }
    }
}

fn place_settings_button(
    window: Query<&Window, With<PrimaryWindow>>,
    mut buttons: Query<&mut Transform, With<SettingsButton>>,
) {
    let Ok(window) = window.single() else {
        return;
    };
    let inset = BUTTON_MARGIN + BUTTON_SIZE / 2.0;
    for mut transform in &mut buttons {
        transform.translation.x = window.width() / 2.0 - inset;
        transform.translation.y = -window.height() / 2.0 + inset;
    }
}

fn tint_settings_button(
    manager: Option<Res<PositionManager>>,
    mut buttons: Query<&mut Sprite, With<SettingsButton>>,
) {
    let Some(manager) = manager else {
        return;
    };
    if !manager.is_changed() {
        return;
    }
    let color = if manager.debug_mode() {
        BUTTON_DEBUG_COLOR
    } else {
        BUTTON_COLOR
    };
    for mut sprite in &mut buttons {
        sprite.color = color;
    }
}

#[cfg(test)]
mod tests {
    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::data::{layout::MenuLayoutConfig, storage::MemoryStore};

    fn button_app() -> App {
        let mut manager = PositionManager::new(MenuLayoutConfig::default(), MemoryStore::new());
        manager.init(Default::default(), false);

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ButtonInput<MouseButton>>()
            .init_resource::<Touches>()
            .init_resource::<ControlPanel>()
            .insert_resource(manager)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .add_plugins(SettingsButtonPlugin);
        crate::systems::configure_menu_systems(&mut app);
        app.update();
        app
    }

    #[test]
    fn lone_tap_resolves_after_the_window() {
        let mut tracker = TapTracker::default();
        assert_eq!(tracker.tap(), None);
        assert_eq!(tracker.tick(Duration::from_millis(200)), None);
        assert_eq!(tracker.tick(Duration::from_millis(100)), Some(TapGesture::Single));
        assert_eq!(tracker.tick(Duration::from_millis(500)), None);
    }

    #[test]
    fn second_tap_inside_the_window_is_a_double() {
        let mut tracker = TapTracker::default();
        assert_eq!(tracker.tap(), None);
        assert_eq!(tracker.tick(Duration::from_millis(200)), None);
        assert_eq!(tracker.tap(), Some(TapGesture::Double));
        assert_eq!(tracker.tick(Duration::from_millis(500)), None);
    }

    #[test]
    fn drags_are_not_taps() {
        assert!(is_tap(Vec2::new(10.0, 10.0), Vec2::new(14.0, 6.0)));
        assert!(!is_tap(Vec2::new(10.0, 10.0), Vec2::new(10.0, 30.0)));
    }

    #[test]
    fn single_tap_opens_the_panel() {
        let mut app = button_app();
        app.world_mut().write_message(SettingsButtonTapped);
        app.update();
        assert!(!app.world().resource::<ControlPanel>().is_visible());

        for _ in 0..3 {
            app.update();
        }
        assert!(app.world().resource::<ControlPanel>().is_visible());
        assert!(!app.world().resource::<PositionManager>().debug_mode());
    }

    #[test]
    fn double_tap_toggles_debug_and_leaves_the_panel() {
        let mut app = button_app();
        app.world_mut().write_message(SettingsButtonTapped);
        app.update();
        app.world_mut().write_message(SettingsButtonTapped);
        app.update();
        for _ in 0..5 {
            app.update();
        }

        assert!(app.world().resource::<PositionManager>().debug_mode());
        assert!(!app.world().resource::<ControlPanel>().is_visible());
    }
}
