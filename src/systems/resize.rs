use bevy::{
    prelude::*,
    window::WindowResized,
};

use super::{
    configure_menu_systems,
    positioning::environment::Viewport,
    MenuSystems,
};

pub struct ResizePlugin;
impl Plugin for ResizePlugin {
    fn build(&self, app: &mut App) {
        configure_menu_systems(app);
        app
            .add_message::<EnvironmentChanged>()
            .insert_resource(ResizeDebounce::default())
            .add_systems(Update, handle_resize.in_set(MenuSystems::Input));
    }
}

/// The window settled at a new size; positions must be recomputed.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentChanged {
    pub viewport: Viewport,
}

/// Plain resizes are debounced by `resize`. A flip between portrait and
/// landscape is debounced by `orientation` and then waits `settle` before
/// reporting, giving the window time to finish rotating.
#[derive(Resource)]
pub struct ResizeDebounce {
    pub resize: Timer,
    pub orientation: Timer,
    pub settle: Timer,
    latest: Option<Viewport>,
    landscape: Option<bool>,
}

impl Default for ResizeDebounce {
    fn default() -> Self {
        Self {
            resize: paused(0.1),
            orientation: paused(0.2),
            settle: paused(0.3),
            latest: None,
            landscape: None,
        }
    }
}

fn paused(seconds: f32) -> Timer {
    let mut timer = Timer::from_seconds(seconds, TimerMode::Once);
    timer.pause();
    timer
}

fn restart(timer: &mut Timer) {
    timer.reset();
    timer.unpause();
}

impl ResizeDebounce {
    /// Zero-area sizes (a minimized window) are not layouts and are dropped.
    pub fn record(&mut self, viewport: Viewport) {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            trace!("ignoring {}x{} viewport", viewport.width, viewport.height);
            return;
        }
        let landscape = viewport.width > viewport.height;
        if self.landscape.is_some_and(|previous| previous != landscape) {
            restart(&mut self.orientation);
            self.settle.reset();
            self.settle.pause();
        }
        self.landscape = Some(landscape);
        self.latest = Some(viewport);
        restart(&mut self.resize);
    }

    /// Advances every timer and returns how many recomputations are due.
    pub fn tick(&mut self, delta: std::time::Duration) -> usize {
        let mut due = 0;

        self.resize.tick(delta);
        if self.resize.just_finished() {
            self.resize.pause();
            due += 1;
        }

        // Settle first so it starts counting on the frame after the
        // orientation debounce ends.
        self.settle.tick(delta);
        if self.settle.just_finished() {
            self.settle.pause();
            due += 1;
        }

        self.orientation.tick(delta);
        if self.orientation.just_finished() {
            self.orientation.pause();
            restart(&mut self.settle);
        }

        due
    }

    pub fn latest(&self) -> Option<Viewport> {
        self.latest
    }
}

fn handle_resize(
    mut resize_events: MessageReader<WindowResized>,
    time: Res<Time>,
    mut debounce: ResMut<ResizeDebounce>,
    mut changed: MessageWriter<EnvironmentChanged>,
) {
    for event in resize_events.read() {
        debounce.record(Viewport::new(event.width, event.height));
    }

    let due = debounce.tick(time.delta());
    if let (true, Some(viewport)) = (due > 0, debounce.latest()) {
        changed.write(EnvironmentChanged { viewport });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn burst_of_resizes_reports_once_after_quiet_period() {
        let mut debounce = ResizeDebounce::default();
        for width in [800.0, 810.0, 820.0] {
            debounce.record(Viewport::new(width, 600.0));
            assert_eq!(debounce.tick(Duration::from_millis(50)), 0);
        }
        assert_eq!(debounce.tick(Duration::from_millis(60)), 1);
        assert_eq!(debounce.latest().map(|viewport| viewport.width), Some(820.0));
        assert_eq!(debounce.tick(Duration::from_millis(500)), 0);
    }

    #[test]
    fn minimized_window_is_not_reported() {
        let mut debounce = ResizeDebounce::default();
        debounce.record(Viewport::new(1280.0, 720.0));
        assert_eq!(debounce.tick(Duration::from_millis(150)), 1);

        debounce.record(Viewport::new(0.0, 0.0));
        assert_eq!(debounce.tick(Duration::from_millis(150)), 0);
        assert_eq!(debounce.latest(), Some(Viewport::new(1280.0, 720.0)));
    }

    #[test]
    fn orientation_flip_reports_again_after_settling() {
        let mut debounce = ResizeDebounce::default();
        debounce.record(Viewport::new(1024.0, 768.0));
        assert_eq!(debounce.tick(Duration::from_millis(150)), 1);

        debounce.record(Viewport::new(768.0, 1024.0));
        // Resize debounce fires at 100 ms.
        assert_eq!(debounce.tick(Duration::from_millis(100)), 1);
        // Orientation debounce ends at 200 ms and starts the settle timer.
        assert_eq!(debounce.tick(Duration::from_millis(100)), 0);
        assert_eq!(debounce.tick(Duration::from_millis(200)), 0);
        assert_eq!(debounce.tick(Duration::from_millis(100)), 1);
    }
}
