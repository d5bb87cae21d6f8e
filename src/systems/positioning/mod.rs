pub mod calculator;
pub mod environment;
pub mod manager;
pub mod preset;

use bevy::{prelude::*, window::PrimaryWindow};

use crate::{
    data::{
        config::SiteConfig,
        layout::{MenuLayoutConfig, ZIndexTable},
        storage::{FileStore, MemoryStore},
    },
    systems::{
        configure_menu_systems,
        motion::AnchorTransition,
        resize::{EnvironmentChanged, ResizePlugin},
        MenuSystems,
    },
};
use environment::{EnvironmentSignals, UserAgent, Viewport};
use manager::{AnchorPlacement, PositionManager};

pub struct PositioningPlugin;
impl Plugin for PositioningPlugin {
    fn build(&self, app: &mut App) {
        configure_menu_systems(app);
        if !app.world().contains_resource::<MenuLayoutConfig>() {
            app.insert_resource(MenuLayoutConfig::embedded());
        }
        if !app.is_plugin_added::<ResizePlugin>() {
            app.add_plugins(ResizePlugin);
        }

        app.add_systems(PostStartup, init_position_manager)
            .add_systems(
                Update,
                (recompute_on_environment_change, place_menu_anchor)
                    .chain()
                    .in_set(MenuSystems::Apply),
            );
    }
}

/// Root of the menu. Its transform carries the anchor position and scale.
#[derive(Component, Debug, Default, Clone, Copy)]
#[require(Transform, Visibility)]
pub struct MenuAnchor;

fn current_signals(
    window: &Query<&Window, With<PrimaryWindow>>,
    user_agent: Option<&UserAgent>,
) -> EnvironmentSignals {
    let viewport = window
        .single()
        .map(|window| Viewport::new(window.width(), window.height()))
        .unwrap_or_default();
    EnvironmentSignals::new(viewport, user_agent.cloned().unwrap_or_default())
}

pub fn init_position_manager(
    mut commands: Commands,
    layout: Res<MenuLayoutConfig>,
    site: Option<Res<SiteConfig>>,
    user_agent: Option<Res<UserAgent>>,
    window: Query<&Window, With<PrimaryWindow>>,
    existing: Option<ResMut<PositionManager>>,
) {
    let signals = current_signals(&window, user_agent.as_deref());
    let debug_requested = site.as_ref().is_some_and(|site| site.debug.enabled);

    if let Some(mut manager) = existing {
        if !manager.is_initialized() {
            manager.init(signals, debug_requested);
        }
        return;
    }

    let mut layout = layout.clone();
    let mut manager = match site {
        Some(site) => {
            layout.debug.log_position_changes &= site.debug.log_position_changes;
            PositionManager::new(layout, FileStore::in_dir(&site.data_dir))
        }
        None => PositionManager::new(layout, MemoryStore::new()),
    };
    manager.init(signals, debug_requested);
    commands.insert_resource(manager);
}

fn recompute_on_environment_change(
    mut changes: MessageReader<EnvironmentChanged>,
    manager: Option<ResMut<PositionManager>>,
    user_agent: Option<Res<UserAgent>>,
) {
    let Some(latest) = changes.read().last().copied() else {
        return;
    };
    let Some(mut manager) = manager else {
        return;
    };

    let signals = EnvironmentSignals::new(
        latest.viewport,
        user_agent.as_deref().cloned().unwrap_or_default(),
    );
    manager.calculate_and_apply_position(signals, false);
}

/// World translation of the anchor for a CSS-style `top`/`right` position,
/// with the camera centred on the window.
pub fn anchor_translation(placement: &AnchorPlacement, menu_z_index: i32) -> Vec3 {
    Vec3::new(
        placement.viewport_width / 2.0 - placement.position.right,
        placement.viewport_height / 2.0 - placement.position.top,
        ZIndexTable::depth(menu_z_index),
    )
}

fn place_menu_anchor(
    mut commands: Commands,
    manager: Option<ResMut<PositionManager>>,
    mut anchors: Query<(Entity, &mut Transform), With<MenuAnchor>>,
) {
    let Some(mut manager) = manager else {
        return;
    };
    let Some(placement) = manager.take_placement() else {
        return;
    };

    let Ok((entity, mut transform)) = anchors.single_mut() else {
        warn!("menu anchor not found; skipping placement");
        return;
    };

    let layout = manager.layout();
    let translation = anchor_translation(&placement, layout.z_index.menu);
    let scale = placement.position.scale;

    if placement.animate {
        commands.entity(entity).insert(AnchorTransition::new(
            translation,
            scale,
            layout.animation.transition(),
            layout.animation.easing,
        ));
    } else {
        commands.entity(entity).remove::<AnchorTransition>();
        transform.translation = translation;
        transform.scale = Vec3::new(scale, scale, 1.0);
    }
}
