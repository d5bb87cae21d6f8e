pub mod backgrounds;
pub mod motion;
pub mod navigation;
pub mod positioning;
pub mod resize;
pub mod ui;

use bevy::prelude::*;

/// Per-frame ordering of the menu: read input, apply cursor and placement
/// changes, advance tweens, then release locks for settled transitions.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum MenuSystems {
    Input,
    Apply,
    Motion,
    Release,
}

pub fn configure_menu_systems(app: &mut App) {
    app.configure_sets(
        Update,
        (
            MenuSystems::Input,
            MenuSystems::Apply,
            MenuSystems::Motion,
            MenuSystems::Release,
        )
            .chain(),
    );
}
