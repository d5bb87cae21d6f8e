use bevy::prelude::*;

pub struct RenderPlugin;
impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::BLACK))
            .add_systems(Startup, setup_cameras);
    }
}

/// The only camera. World space is centred on the window with +y up, one
/// unit per logical pixel.
#[derive(Component)]
pub struct MainCamera;

pub fn setup_cameras(mut commands: Commands, existing: Query<(), With<MainCamera>>) {
    if !existing.is_empty() {
        return;
    }
    commands.spawn((Name::new("main_camera"), Camera2d, MainCamera));
}
