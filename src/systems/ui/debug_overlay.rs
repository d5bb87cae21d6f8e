//! Boundary visualisation for positioning work.
//!
//! The overlay registers a [`DebugOverlayFlag`] with the position manager
//! and draws with gizmos whenever the manager reports debug mode on.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bevy::prelude::*;

use crate::{
    data::layout::{DebugDisplay, MenuLayoutConfig},
    systems::{
        positioning::{
            calculator::{clamp_scale, Footprint, Position},
            environment::Environment,
            init_position_manager,
            manager::{DebugObserver, PositionManager},
        },
        ui::control_panel::Modifiers,
        MenuSystems,
    },
};

const BOUNDARY_COLOR: Color = Color::srgba(1.0, 0.2, 0.2, 0.8);
const CENTER_COLOR: Color = Color::srgba(0.2, 1.0, 0.2, 0.8);
const GRID_COLOR: Color = Color::srgba(1.0, 1.0, 1.0, 0.15);
const FOOTPRINT_COLOR: Color = Color::srgba(0.3, 0.6, 1.0, 0.9);
const CROSSHAIR_SIZE: f32 = 20.0;
const GRID_SPACING: f32 = 50.0;

pub struct DebugOverlayPlugin;
impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugOverlayFlag>()
            .add_systems(PostStartup, register_overlay.after(init_position_manager))
            .add_systems(Update, toggle_debug_shortcut.in_set(MenuSystems::Input))
            .add_systems(Update, draw_overlay.after(MenuSystems::Motion));
    }
}

/// Shared switch flipped by the manager through [`DebugObserver`].
#[derive(Resource, Debug, Clone, Default)]
pub struct DebugOverlayFlag(Arc<AtomicBool>);

impl DebugOverlayFlag {
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl DebugObserver for DebugOverlayFlag {
    fn on_enable(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    fn on_disable(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

fn register_overlay(flag: Res<DebugOverlayFlag>, manager: Option<ResMut<PositionManager>>) {
    let Some(mut manager) = manager else {
        warn!("no position manager; debug overlay disabled");
        return;
    };
    manager.set_debug_observer(flag.clone());
}

fn toggle_debug_shortcut(
    keys: Res<ButtonInput<KeyCode>>,
    manager: Option<ResMut<PositionManager>>,
) {
    let modifiers = Modifiers::from_keys(&keys);
    if !(modifiers.command && modifiers.shift && keys.just_pressed(KeyCode::KeyD)) {
        return;
    }
    if let Some(mut manager) = manager {
        manager.toggle_debug_mode();
    }
}

/// Everything the overlay draws, in world space with the camera centred on
/// the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayGeometry {
    pub viewport: Rect,
    pub allowed: Rect,
    pub footprint: Rect,
}

impl OverlayGeometry {
    pub fn new(environment: &Environment, position: Position, layout: &MenuLayoutConfig) -> Self {
        let width = environment.viewport.width;
        let height = environment.viewport.height;
        let margins = layout.boundaries;
        let half = Vec2::new(width, height) / 2.0;

        let viewport = Rect::from_center_size(Vec2::ZERO, Vec2::new(width, height));
        let allowed = Rect::from_corners(
            Vec2::new(
                -half.x + margins.left / 100.0 * width,
                -half.y + margins.bottom / 100.0 * height,
            ),
            Vec2::new(
                half.x - margins.right / 100.0 * width,
                half.y - margins.top / 100.0 * height,
            ),
        );

        let dimensions = layout.menu_dimensions.for_platform(environment.platform);
        let size = Footprint::estimate(dimensions, clamp_scale(position.scale));
        let anchor = Vec2::new(half.x - position.right, half.y - position.top);
        let footprint = Rect::from_corners(anchor, anchor - Vec2::new(size.width, size.height));

        Self {
            viewport,
            allowed,
            footprint,
        }
    }
}

fn draw_rect(gizmos: &mut Gizmos, rect: Rect, color: Color) {
    gizmos.rect_2d(Isometry2d::from_translation(rect.center()), rect.size(), color);
}

fn draw_overlay(
    mut gizmos: Gizmos,
    flag: Res<DebugOverlayFlag>,
    manager: Option<Res<PositionManager>>,
) {
    if !flag.is_enabled() {
        return;
    }
    let Some(manager) = manager else {
        return;
    };
    let layout = manager.layout();
    let DebugDisplay {
        show_boundaries,
        show_center,
        show_grid,
        ..
    } = layout.debug;
    let geometry = OverlayGeometry::new(manager.environment(), manager.position(), layout);

    if show_grid {
        let cells = (geometry.viewport.size() / GRID_SPACING).ceil().as_uvec2();
        gizmos.grid_2d(Isometry2d::IDENTITY, cells, Vec2::splat(GRID_SPACING), GRID_COLOR);
    }
    if show_boundaries {
        draw_rect(&mut gizmos, geometry.allowed, BOUNDARY_COLOR);
    }
    if show_center {
        gizmos.line_2d(
            Vec2::new(-CROSSHAIR_SIZE, 0.0),
            Vec2::new(CROSSHAIR_SIZE, 0.0),
            CENTER_COLOR,
        );
        gizmos.line_2d(
            Vec2::new(0.0, -CROSSHAIR_SIZE),
            Vec2::new(0.0, CROSSHAIR_SIZE),
            CENTER_COLOR,
        );
    }
    draw_rect(&mut gizmos, geometry.footprint, FOOTPRINT_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::storage::MemoryStore,
        systems::positioning::environment::{detect, EnvironmentSignals, UserAgent, Viewport},
    };

    #[test]
    fn flag_follows_manager_debug_mode() {
        let flag = DebugOverlayFlag::default();
        let mut manager = PositionManager::new(MenuLayoutConfig::default(), MemoryStore::new());
        manager.init(Default::default(), false);
        manager.set_debug_observer(flag.clone());

        assert!(!flag.is_enabled());
        manager.toggle_debug_mode();
        assert!(flag.is_enabled());
        manager.toggle_debug_mode();
        assert!(!flag.is_enabled());
    }

    #[test]
    fn geometry_hangs_the_footprint_from_the_anchor() {
        let layout = MenuLayoutConfig::default();
        let environment = detect(
            &EnvironmentSignals::new(Viewport::new(1000.0, 800.0), UserAgent::default()),
            &layout.breakpoints,
        );
        let position = Position {
            top: 100.0,
            right: 50.0,
            scale: 0.5,
        };
        let geometry = OverlayGeometry::new(&environment, position, &layout);

        assert_eq!(geometry.allowed.min, Vec2::new(-450.0, -360.0));
        assert_eq!(geometry.allowed.max, Vec2::new(450.0, 360.0));
        // Desktop item 170 wide, four columns, half scale.
        assert_eq!(geometry.footprint.max, Vec2::new(450.0, 300.0));
        assert_eq!(geometry.footprint.min, Vec2::new(110.0, 0.0));
    }
}
