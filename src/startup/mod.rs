use bevy::{
    diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin},
    prelude::*,
};

use crate::{
    data::config::SiteConfig,
    scenes::ScenePlugin,
    systems::{
        backgrounds::MeshGradientPlugin, motion::MotionPlugin, navigation::NavigationPlugin,
        positioning::PositioningPlugin, resize::ResizePlugin, ui::MenuToolsPlugin, MenuSystems,
    },
};

pub mod render;
pub mod shortcuts;

use render::RenderPlugin;

pub struct StartupPlugin;
impl Plugin for StartupPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            RenderPlugin,
            ResizePlugin,
            MotionPlugin,
            PositioningPlugin,
            NavigationPlugin,
            MenuToolsPlugin,
            MeshGradientPlugin,
            ScenePlugin,
        ))
        .add_systems(Update, shortcuts::quit_shortcut.in_set(MenuSystems::Input));

        let debug = app
            .world()
            .get_resource::<SiteConfig>()
            .is_some_and(|site| site.debug.enabled);
        if debug {
            app.add_plugins(FrameTimeDiagnosticsPlugin::default())
                .add_plugins(LogDiagnosticsPlugin::default());
        }
    }
}
