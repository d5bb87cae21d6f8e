use std::time::Duration;

use bevy::{
    ecs::{lifecycle::HookContext, world::DeferredWorld},
    math::curve::{Curve, EaseFunction},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use super::{configure_menu_systems, MenuSystems};

pub struct MotionPlugin;

impl Plugin for MotionPlugin {
    fn build(&self, app: &mut App) {
        configure_menu_systems(app);
        app.add_message::<TransitionEnded>().add_systems(
            Update,
            (
                NavigationTransition::enact,
                AnchorTransition::enact,
            )
                .in_set(MenuSystems::Motion),
        );
    }
}

/// Timing curves matching the CSS keywords used by the layout file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl Easing {
    pub fn sample(self, fraction: f32) -> f32 {
        let function = match self {
            Easing::Linear => EaseFunction::Linear,
            Easing::Ease => EaseFunction::SineInOut,
            Easing::EaseIn => EaseFunction::CubicIn,
            Easing::EaseOut => EaseFunction::CubicOut,
            Easing::EaseInOut => EaseFunction::CubicInOut,
        };
        function.sample_clamped(fraction.clamp(0.0, 1.0))
    }
}

/// Sent once per entity when its [`NavigationTransition`] settles.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEnded {
    pub entity: Entity,
}

/// Shifts an entity by `delta` from wherever its `Transform` is at insert
/// time. Re-inserting while a transition runs restarts from the live
/// translation, so steps never accumulate stale offsets.
#[derive(Component, Debug, Clone)]
#[component(on_insert = NavigationTransition::on_insert)]
pub struct NavigationTransition {
    pub delta: Vec2,
    start: Vec3,
    target: Vec3,
    easing: Easing,
    timer: Timer,
}

impl NavigationTransition {
    pub fn new(delta: Vec2, duration: Duration, easing: Easing) -> Self {
        Self {
            delta,
            start: Vec3::ZERO,
            target: delta.extend(0.0),
            easing,
            timer: Timer::new(duration, TimerMode::Once),
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    fn on_insert(mut world: DeferredWorld, HookContext { entity, .. }: HookContext) {
        let Some(translation) = world
            .entity(entity)
            .get::<Transform>()
            .map(|transform| transform.translation)
        else {
            warn!("navigation transition inserted on {entity} without a Transform");
            return;
        };

        if let Some(mut transition) = world.get_mut::<NavigationTransition>(entity) {
            transition.start = translation;
            transition.target = translation + transition.delta.extend(0.0);
        }
    }

    pub fn enact(
        time: Res<Time>,
        mut commands: Commands,
        mut ended: MessageWriter<TransitionEnded>,
        mut query: Query<(Entity, &mut NavigationTransition, &mut Transform)>,
    ) {
        for (entity, mut transition, mut transform) in &mut query {
            transition.timer.tick(time.delta());

            if transition.timer.is_finished() {
                transform.translation = transition.target;
                commands.entity(entity).remove::<NavigationTransition>();
                ended.write(TransitionEnded { entity });
            } else {
                let eased = transition.easing.sample(transition.timer.fraction());
                transform.translation = transition.start.lerp(transition.target, eased);
            }
        }
    }
}

/// Moves the menu anchor to a new translation and uniform scale.
#[derive(Component, Debug, Clone)]
#[component(on_insert = AnchorTransition::on_insert)]
pub struct AnchorTransition {
    start_translation: Vec3,
    start_scale: f32,
    pub translation: Vec3,
    pub scale: f32,
    easing: Easing,
    timer: Timer,
}

impl AnchorTransition {
    pub fn new(translation: Vec3, scale: f32, duration: Duration, easing: Easing) -> Self {
        Self {
            start_translation: translation,
            start_scale: scale,
            translation,
            scale,
            easing,
            timer: Timer::new(duration, TimerMode::Once),
        }
    }

    fn on_insert(mut world: DeferredWorld, HookContext { entity, .. }: HookContext) {
        let Some(transform) = world.entity(entity).get::<Transform>().copied() else {
            warn!("anchor transition inserted on {entity} without a Transform");
            return;
        };

        if let Some(mut transition) = world.get_mut::<AnchorTransition>(entity) {
            transition.start_translation = transform.translation;
            transition.start_scale = transform.scale.x;
        }
    }

    pub fn enact(
        time: Res<Time>,
        mut commands: Commands,
        mut query: Query<(Entity, &mut AnchorTransition, &mut Transform)>,
    ) {
        for (entity, mut transition, mut transform) in &mut query {
            transition.timer.tick(time.delta());

            let eased = if transition.timer.is_finished() {
                commands.entity(entity).remove::<AnchorTransition>();
                1.0
            } else {
                transition.easing.sample(transition.timer.fraction())
            };

            transform.translation = transition
                .start_translation
                .lerp(transition.translation, eased);
            let scale = transition.start_scale + (transition.scale - transition.start_scale) * eased;
            transform.scale = Vec3::new(scale, scale, 1.0);
        }
    }
}
