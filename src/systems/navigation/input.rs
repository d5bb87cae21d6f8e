//! Keyboard, touch and pointer input turned into navigation requests.
use std::collections::VecDeque;

use bevy::{input::touch::Touches, prelude::*, window::PrimaryWindow};

use super::{
    cursor::{Horizontal, NavigationCursor, Vertical},
    MenuItem, NavigationRequest, SubMenuItem,
};
use crate::startup::render::MainCamera;

/// Minimum finger travel, in logical pixels, for a swipe to count.
pub const SWIPE_THRESHOLD: f32 = 50.0;

pub fn key_to_request(key: KeyCode) -> Option<NavigationRequest> {
    match key {
        KeyCode::ArrowLeft => Some(NavigationRequest::Horizontal(Horizontal::Left)),
        KeyCode::ArrowRight => Some(NavigationRequest::Horizontal(Horizontal::Right)),
        KeyCode::ArrowUp => Some(NavigationRequest::Vertical(Vertical::Up)),
        KeyCode::ArrowDown => Some(NavigationRequest::Vertical(Vertical::Down)),
        KeyCode::Space | KeyCode::Enter | KeyCode::NumpadEnter => Some(NavigationRequest::Activate),
        _ => None,
    }
}

/// Classifies a finished touch in window coordinates (y down). The
/// dominant axis decides; the menu follows the content, so dragging left
/// moves the cursor right and dragging up moves it down.
pub fn classify_swipe(start: Vec2, end: Vec2) -> Option<NavigationRequest> {
    let travel = start - end;

    if travel.x.abs() > travel.y.abs() {
        if travel.x.abs() <= SWIPE_THRESHOLD {
            return None;
        }
        Some(NavigationRequest::Horizontal(if travel.x > 0.0 {
            Horizontal::Right
        } else {
            Horizontal::Left
        }))
    } else {
        if travel.y.abs() <= SWIPE_THRESHOLD {
            return None;
        }
        Some(NavigationRequest::Vertical(if travel.y > 0.0 {
            Vertical::Down
        } else {
            Vertical::Up
        }))
    }
}

/// Single steps waiting to be issued, one per settled transition.
#[derive(Resource, Debug, Default)]
pub struct PendingSteps(pub VecDeque<NavigationRequest>);

impl PendingSteps {
    pub fn replace(&mut self, steps: impl IntoIterator<Item = NavigationRequest>) {
        self.0.clear();
        self.0.extend(steps);
    }
}

/// Clickable area centred on the entity, in its local units.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct MenuHitbox {
    pub size: Vec2,
}

impl MenuHitbox {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
        }
    }

    pub fn contains(&self, transform: &GlobalTransform, world_point: Vec2) -> bool {
        let local = transform
            .affine()
            .inverse()
            .transform_point3(world_point.extend(transform.translation().z));
        local.x.abs() <= self.size.x / 2.0 && local.y.abs() <= self.size.y / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Item { index: usize },
    SubItem { menu_item_index: usize, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Steps(Vec<NavigationRequest>),
    Activate,
    Ignore,
}

/// Clicking an item walks the cursor there one step at a time; clicking
/// the active sub-item activates it. Sub-items of inactive items are inert.
pub fn plan_click(cursor: &NavigationCursor, target: PointerTarget) -> ClickOutcome {
    match target {
        PointerTarget::Item { index } => {
            let active = cursor.active_menu_item_index();
            if index == active || index >= cursor.len() {
                return ClickOutcome::Ignore;
            }
            let direction = if index > active {
                Horizontal::Right
            } else {
                Horizontal::Left
            };
            ClickOutcome::Steps(vec![
                NavigationRequest::Horizontal(direction);
                index.abs_diff(active)
            ])
        }
        PointerTarget::SubItem {
            menu_item_index,
            index,
        } => {
            if menu_item_index != cursor.active_menu_item_index() {
                return ClickOutcome::Ignore;
            }
            let Some(item) = cursor.active_item() else {
                return ClickOutcome::Ignore;
            };
            let current = item.active_sub_menu_item_index;
            if index == current {
                return ClickOutcome::Activate;
            }
            let direction = if index > current {
                Vertical::Down
            } else {
                Vertical::Up
            };
            ClickOutcome::Steps(vec![
                NavigationRequest::Vertical(direction);
                index.abs_diff(current)
            ])
        }
    }
}

pub fn keyboard_navigation(
    keys: Res<ButtonInput<KeyCode>>,
    mut requests: MessageWriter<NavigationRequest>,
) {
    let modified = keys.any_pressed([
        KeyCode::ControlLeft,
        KeyCode::ControlRight,
        KeyCode::SuperLeft,
        KeyCode::SuperRight,
    ]);

    for key in keys.get_just_pressed() {
        let Some(request) = key_to_request(*key) else {
            continue;
        };
        // Modified arrows belong to the control panel.
        if modified && request != NavigationRequest::Activate {
            continue;
        }
        requests.write(request);
    }
}

pub fn touch_navigation(touches: Res<Touches>, mut requests: MessageWriter<NavigationRequest>) {
    for touch in touches.iter_just_released() {
        if let Some(request) = classify_swipe(touch.start_position(), touch.position()) {
            requests.write(request);
        }
    }
}

/// Mouse position in world space, if the cursor is over the window.
pub fn pointer_world_position(
    window: &Query<&Window, With<PrimaryWindow>>,
    camera: &Query<(&Camera, &GlobalTransform), With<MainCamera>>,
) -> Option<Vec2> {
    let screen_position = window.single().ok()?.cursor_position()?;
    let (camera, camera_transform) = camera.single().ok()?;
    camera
        .viewport_to_world_2d(camera_transform, screen_position)
        .ok()
}

pub fn pointer_navigation(
    mouse: Res<ButtonInput<MouseButton>>,
    window: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    items: Query<(&MenuItem, &MenuHitbox, &GlobalTransform, &InheritedVisibility)>,
    sub_items: Query<(&SubMenuItem, &MenuHitbox, &GlobalTransform, &InheritedVisibility)>,
    cursor: Res<NavigationCursor>,
    mut pending: ResMut<PendingSteps>,
    mut requests: MessageWriter<NavigationRequest>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    let Some(world_position) = pointer_world_position(&window, &camera) else {
        return;
    };

    // Sub-items sit on top of their item's column, so they win ties.
    let sub_hit = sub_items
        .iter()
        .filter(|(_, hitbox, transform, visibility)| {
            visibility.get() && hitbox.contains(transform, world_position)
        })
        .map(|(sub_item, ..)| PointerTarget::SubItem {
            menu_item_index: sub_item.menu_item_index,
            index: sub_item.index,
        })
        .next();
    let target = sub_hit.or_else(|| {
        items
            .iter()
            .filter(|(_, hitbox, transform, visibility)| {
                visibility.get() && hitbox.contains(transform, world_position)
            })
            .map(|(item, ..)| PointerTarget::Item { index: item.index })
            .next()
    });
    let Some(target) = target else {
        return;
    };

    match plan_click(&cursor, target) {
        ClickOutcome::Steps(steps) => pending.replace(steps),
        ClickOutcome::Activate => {
            requests.write(NavigationRequest::Activate);
        }
        ClickOutcome::Ignore => {}
    }
}
