use bevy::{app::AppExit, prelude::*};

use crate::systems::ui::control_panel::Modifiers;

/// Ctrl/Cmd+Q quits. Escape belongs to the control panel.
pub fn quit_shortcut(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if Modifiers::from_keys(&keys).command && keys.just_pressed(KeyCode::KeyQ) {
        info!("quit requested");
        exit.write(AppExit::Success);
    }
}
