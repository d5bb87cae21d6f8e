pub mod cursor;
pub mod input;


use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    data::layout::MenuLayoutConfig,
    systems::{
        configure_menu_systems,
        motion::{Easing, MotionPlugin, NavigationTransition, TransitionEnded},
        positioning::{
            calculator::NavigationAmounts, environment::Device, manager::PositionManager,
        },
        MenuSystems,
    },
};
use cursor::{
    Horizontal, MarkerChange, MenuItemData, MovePlan, NavigationCursor, Rejection, Vertical,
};
use input::{keyboard_navigation, pointer_navigation, touch_navigation, PendingSteps};

pub struct NavigationPlugin;
impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        configure_menu_systems(app);
        if !app.is_plugin_added::<MotionPlugin>() {
            app.add_plugins(MotionPlugin);
        }

        if !app.world().contains_resource::<MenuLayoutConfig>() {
            app.insert_resource(MenuLayoutConfig::embedded());
        }
        let timeout = app
            .world()
            .resource::<MenuLayoutConfig>()
            .animation
            .timeout();

        app.add_message::<NavigationRequest>()
            .add_message::<CursorMoved>()
            .add_message::<MenuActionTriggered>()
            .add_message::<MenuRebuilt>()
            .insert_resource(NavigationCursor::new(timeout))
            .init_resource::<PendingSteps>()
            .add_systems(
                Update,
                (keyboard_navigation, touch_navigation, pointer_navigation)
                    .in_set(MenuSystems::Input),
            )
            .add_systems(
                Update,
                (rebuild_on_menu_rebuilt, drive_cursor)
                    .chain()
                    .in_set(MenuSystems::Apply),
            )
            .add_systems(Update, release_settled.in_set(MenuSystems::Release));
    }
}

/// A top-level column of the menu, ordered left to right by `index`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
#[require(Transform, Visibility)]
pub struct MenuItem {
    pub index: usize,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
#[require(Transform, Visibility)]
pub struct SubMenuContainer {
    pub menu_item_index: usize,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
#[require(Transform, Visibility)]
pub struct SubMenuItem {
    pub menu_item_index: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    #[default]
    ExternalLink,
    InternalLink,
    None,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::ExternalLink => "external_link",
            ActionType::InternalLink => "internal_link",
            ActionType::None => "none",
        }
    }
}

/// What activating a sub-item does.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct MenuAction {
    pub action_type: ActionType,
    pub target: String,
}

#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ActiveMenuItem;

#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ActiveSubMenuItem;

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationRequest {
    Horizontal(Horizontal),
    Vertical(Vertical),
    Activate,
}

/// The cursor accepted a step.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorMoved {
    pub request: NavigationRequest,
    pub menu_item_index: usize,
    pub sub_menu_item_index: usize,
}

#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct MenuActionTriggered {
    pub action_type: ActionType,
    pub target: String,
}

/// Written after the menu entities were (re)spawned.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct MenuRebuilt;

fn step_amounts(
    manager: Option<&PositionManager>,
    layout: &MenuLayoutConfig,
) -> (NavigationAmounts, f32) {
    match manager {
        Some(manager) => (manager.navigation_amounts(), manager.vertical_offset()),
        None => (
            NavigationAmounts::default(),
            layout.vertical_offsets.for_device(Device::Desktop),
        ),
    }
}

fn is_axis_free(cursor: &NavigationCursor, request: NavigationRequest) -> bool {
    match request {
        NavigationRequest::Horizontal(_) => !cursor.is_transitioning_horizontally(),
        NavigationRequest::Vertical(_) => !cursor.is_transitioning_vertically(),
        NavigationRequest::Activate => true,
    }
}

fn drive_cursor(
    mut commands: Commands,
    mut requests: MessageReader<NavigationRequest>,
    mut pending: ResMut<PendingSteps>,
    mut cursor: ResMut<NavigationCursor>,
    manager: Option<Res<PositionManager>>,
    layout: Res<MenuLayoutConfig>,
    actions: Query<&MenuAction>,
    mut moved: MessageWriter<CursorMoved>,
    mut triggered: MessageWriter<MenuActionTriggered>,
) {
    let (amounts, vertical_offset) = step_amounts(manager.as_deref(), &layout);
    let duration = layout.animation.navigation();
    let easing = layout.animation.navigation_easing;

    let mut handle = |cursor: &mut NavigationCursor,
                      request: NavigationRequest|
     -> Result<(), Rejection> {
        let plan = match request {
            NavigationRequest::Horizontal(direction) => {
                cursor.move_horizontal(direction, amounts)?
            }
            NavigationRequest::Vertical(direction) => {
                cursor.move_vertical(direction, amounts, vertical_offset)?
            }
            NavigationRequest::Activate => {
                activate(cursor, &actions, &mut triggered);
                return Ok(());
            }
        };

        apply_plan(&mut commands, &plan, request, duration, easing);
        moved.write(CursorMoved {
            request,
            menu_item_index: cursor.active_menu_item_index(),
            sub_menu_item_index: cursor
                .active_item()
                .map_or(0, |item| item.active_sub_menu_item_index),
        });
        Ok(())
    };

    for request in requests.read().copied() {
        // A direct move abandons any click walk in progress.
        if request != NavigationRequest::Activate {
            pending.0.clear();
        }
        if let Err(rejection) = handle(&mut *cursor, request) {
            trace!("{request:?} dropped: {rejection:?}");
        }
    }

    let Some(next) = pending.0.front().copied() else {
        return;
    };
    if !is_axis_free(&cursor, next) {
        return;
    }
    pending.0.pop_front();
    if handle(&mut *cursor, next).is_err() {
        pending.0.clear();
    }
}

fn activate(
    cursor: &NavigationCursor,
    actions: &Query<&MenuAction>,
    triggered: &mut MessageWriter<MenuActionTriggered>,
) {
    let Some(sub_item) = cursor.active_sub_item() else {
        debug!("activation ignored: no active sub-item");
        return;
    };
    let Ok(action) = actions.get(sub_item) else {
        debug!("activation ignored: sub-item {sub_item} has no action");
        return;
    };
    triggered.write(MenuActionTriggered {
        action_type: action.action_type,
        target: action.target.clone(),
    });
}

fn apply_plan(
    commands: &mut Commands,
    plan: &MovePlan,
    request: NavigationRequest,
    duration: Duration,
    easing: Easing,
) {
    for (entity, delta) in &plan.moves {
        commands
            .entity(*entity)
            .try_insert(NavigationTransition::new(*delta, duration, easing));
    }

    let MarkerChange { from, to } = plan.marker;
    match request {
        NavigationRequest::Horizontal(_) => move_marker::<ActiveMenuItem>(commands, from, to),
        NavigationRequest::Vertical(_) => move_marker::<ActiveSubMenuItem>(commands, from, to),
        NavigationRequest::Activate => {}
    }
}

fn move_marker<M: Component + Default>(
    commands: &mut Commands,
    from: Option<Entity>,
    to: Option<Entity>,
) {
    if let Some(from) = from {
        commands.entity(from).try_remove::<M>();
    }
    if let Some(to) = to {
        commands.entity(to).try_insert(M::default());
    }
}

fn release_settled(
    time: Res<Time>,
    mut ended: MessageReader<TransitionEnded>,
    mut cursor: ResMut<NavigationCursor>,
) {
    for TransitionEnded { entity } in ended.read().copied() {
        cursor.transition_finished(entity);
    }
    cursor.tick(time.delta());
}

/// Rereads the menu entities into the cursor table and resets the active
/// markers: the cursor's active item, and the first sub-item of every item.
fn rebuild_on_menu_rebuilt(
    mut commands: Commands,
    mut rebuilt: MessageReader<MenuRebuilt>,
    mut cursor: ResMut<NavigationCursor>,
    mut pending: ResMut<PendingSteps>,
    items: Query<(Entity, &MenuItem)>,
    containers: Query<(Entity, &SubMenuContainer)>,
    sub_items: Query<(Entity, &SubMenuItem)>,
    active_items: Query<Entity, With<ActiveMenuItem>>,
    active_sub_items: Query<Entity, With<ActiveSubMenuItem>>,
) {
    if rebuilt.read().count() == 0 {
        return;
    }

    let mut ordered: Vec<(Entity, &MenuItem)> = items.iter().collect();
    ordered.sort_by_key(|(_, item)| item.index);

    let table: Vec<MenuItemData> = ordered
        .into_iter()
        .map(|(entity, item)| {
            let data = MenuItemData::new(item.index, entity);
            let Some((container, _)) = containers
                .iter()
                .find(|(_, container)| container.menu_item_index == item.index)
            else {
                return data;
            };
            let mut subs: Vec<(Entity, usize)> = sub_items
                .iter()
                .filter(|(_, sub_item)| sub_item.menu_item_index == item.index)
                .map(|(entity, sub_item)| (entity, sub_item.index))
                .collect();
            subs.sort_by_key(|(_, index)| *index);
            data.with_sub_items(container, subs.into_iter().map(|(entity, _)| entity).collect())
        })
        .collect();

    cursor.rebuild(table);
    pending.0.clear();

    for entity in &active_items {
        commands.entity(entity).try_remove::<ActiveMenuItem>();
    }
    for entity in &active_sub_items {
        commands.entity(entity).try_remove::<ActiveSubMenuItem>();
    }
    if let Some(item) = cursor.active_item() {
        commands.entity(item.entity).try_insert(ActiveMenuItem);
    }
    for sub_item in cursor.items().iter().filter_map(|item| item.sub_items.first()) {
        commands.entity(*sub_item).try_insert(ActiveSubMenuItem);
    }

    info!("navigation rebuilt with {} menu items", cursor.len());
}
