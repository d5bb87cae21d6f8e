use bevy::prelude::*;

mod data;
mod scenes;
mod startup;
mod systems;

use data::{config::SiteConfig, layout::MenuLayoutConfig};
use startup::StartupPlugin;

fn main() {
    let site = SiteConfig::from_env();
    let user_agent = site.user_agent.clone();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: site.site_title.clone(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(MenuLayoutConfig::embedded())
        .insert_resource(user_agent)
        .insert_resource(site)
        .add_plugins(StartupPlugin)
        .run();
}
