//! Developer-facing surfaces layered over the menu: the live tuning panel,
//! its floating button and the boundary overlay. They talk to the position
//! manager only through its public operations.
pub mod control_panel;
pub mod debug_overlay;
pub mod settings_button;

use bevy::prelude::*;

use control_panel::ControlPanelPlugin;
use debug_overlay::DebugOverlayPlugin;
use settings_button::SettingsButtonPlugin;

pub struct MenuToolsPlugin;
impl Plugin for MenuToolsPlugin {
    fn build(&self, app: &mut App) {
        super::configure_menu_systems(app);
        app.add_plugins((ControlPanelPlugin, DebugOverlayPlugin, SettingsButtonPlugin));
    }
}
